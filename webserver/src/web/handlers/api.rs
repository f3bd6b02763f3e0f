//! REST API handlers
//!
//! Thin adapters over the engine services. Every mutating route takes the
//! caller from [`CallerIdentity`]; the engine decides what that agent may do.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use shared::{
    AgentBreakdown, BatchId, Channel, Client, ClientId, CredentialPairId, CredentialSlot, CutoffGroup,
    PairView, PayrollBatch,
};
use uuid::Uuid;

use crate::error::WebServerResult;
use crate::state::AppState;
use crate::traits::WebSocketManager;
use crate::types::{
    CaptureReferenceRequest, ClientListQuery, CreateClientRequest, HealthResponse, NoteRequest,
    RejectInstallationRequest, RevealResponse, SetStatusRequest,
};
use crate::web::identity::CallerIdentity;

pub async fn health<W>(State(state): State<AppState<W>>) -> Json<HealthResponse>
where
    W: WebSocketManager + 'static,
{
    Json(HealthResponse {
        status: "ok".to_string(),
        connected_sessions: state.websockets.client_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// Pipeline

pub async fn list_clients<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Query(query): Query<ClientListQuery>,
) -> WebServerResult<Json<Vec<Client>>>
where
    W: WebSocketManager + 'static,
{
    let pipeline = state.engine.pipeline();
    let mut clients = match query.status {
        Some(status) => pipeline.list_by_status(status).await?,
        None => pipeline.list_clients(None).await?,
    };
    if !query.all {
        clients.retain(|client| client.owner == agent);
    }
    Ok(Json(clients))
}

pub async fn create_client<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Json(draft): Json<CreateClientRequest>,
) -> WebServerResult<(StatusCode, Json<Client>)>
where
    W: WebSocketManager + 'static,
{
    let client = state.engine.pipeline().create_client(&agent, draft).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client<W>(
    State(state): State<AppState<W>>,
    _caller: CallerIdentity,
    Path(id): Path<ClientId>,
) -> WebServerResult<Json<Client>>
where
    W: WebSocketManager + 'static,
{
    Ok(Json(state.engine.pipeline().get_client(id).await?))
}

pub async fn delete_client<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path(id): Path<ClientId>,
) -> WebServerResult<StatusCode>
where
    W: WebSocketManager + 'static,
{
    state.engine.pipeline().delete_client(id, &agent).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_status<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path(id): Path<ClientId>,
    Json(request): Json<SetStatusRequest>,
) -> WebServerResult<Json<Client>>
where
    W: WebSocketManager + 'static,
{
    let client = state.engine.pipeline().set_status(id, request.status, &agent).await?;
    Ok(Json(client))
}

pub async fn capture_reference<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path(id): Path<ClientId>,
    Json(request): Json<CaptureReferenceRequest>,
) -> WebServerResult<Json<Client>>
where
    W: WebSocketManager + 'static,
{
    let client = state
        .engine
        .pipeline()
        .capture_reference(id, &request.reference, &agent)
        .await?;
    Ok(Json(client))
}

pub async fn confirm_installation<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path(id): Path<ClientId>,
) -> WebServerResult<Json<Client>>
where
    W: WebSocketManager + 'static,
{
    Ok(Json(state.engine.pipeline().confirm_installation(id, &agent).await?))
}

pub async fn reject_installation<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path(id): Path<ClientId>,
    Json(request): Json<RejectInstallationRequest>,
) -> WebServerResult<Json<Client>>
where
    W: WebSocketManager + 'static,
{
    let client = state
        .engine
        .pipeline()
        .reject_installation(id, &request.reason, &agent)
        .await?;
    Ok(Json(client))
}

pub async fn add_note<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path(id): Path<ClientId>,
    Json(request): Json<NoteRequest>,
) -> WebServerResult<Json<Client>>
where
    W: WebSocketManager + 'static,
{
    Ok(Json(state.engine.pipeline().add_note(id, &request.text, &agent).await?))
}

pub async fn remove_activity<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path((id, entry_id)): Path<(ClientId, Uuid)>,
) -> WebServerResult<Json<Client>>
where
    W: WebSocketManager + 'static,
{
    Ok(Json(state.engine.pipeline().remove_activity(id, entry_id, &agent).await?))
}

// Payroll

pub async fn pending_settlement<W>(
    State(state): State<AppState<W>>,
    _caller: CallerIdentity,
) -> WebServerResult<Json<Vec<CutoffGroup>>>
where
    W: WebSocketManager + 'static,
{
    Ok(Json(state.engine.payroll().query_pending().await?))
}

pub async fn generate_batch<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
) -> WebServerResult<(StatusCode, Json<PayrollBatch>)>
where
    W: WebSocketManager + 'static,
{
    let batch = state.engine.payroll().generate_payroll_batch(&agent).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

pub async fn list_batches<W>(
    State(state): State<AppState<W>>,
    _caller: CallerIdentity,
) -> WebServerResult<Json<Vec<PayrollBatch>>>
where
    W: WebSocketManager + 'static,
{
    Ok(Json(state.engine.payroll().list_batches().await?))
}

pub async fn get_batch<W>(
    State(state): State<AppState<W>>,
    _caller: CallerIdentity,
    Path(id): Path<BatchId>,
) -> WebServerResult<Json<PayrollBatch>>
where
    W: WebSocketManager + 'static,
{
    Ok(Json(state.engine.payroll().get_batch(id).await?))
}

pub async fn batch_members<W>(
    State(state): State<AppState<W>>,
    _caller: CallerIdentity,
    Path(id): Path<BatchId>,
) -> WebServerResult<Json<Vec<Client>>>
where
    W: WebSocketManager + 'static,
{
    Ok(Json(state.engine.payroll().batch_members(id).await?))
}

pub async fn batch_breakdown<W>(
    State(state): State<AppState<W>>,
    _caller: CallerIdentity,
    Path(id): Path<BatchId>,
) -> WebServerResult<Json<Vec<AgentBreakdown>>>
where
    W: WebSocketManager + 'static,
{
    Ok(Json(state.engine.payroll().batch_breakdown(id).await?))
}

pub async fn mark_batch_paid<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path(id): Path<BatchId>,
) -> WebServerResult<Json<PayrollBatch>>
where
    W: WebSocketManager + 'static,
{
    Ok(Json(state.engine.payroll().mark_batch_paid(id, &agent).await?))
}

// Credentials

pub async fn list_credentials<W>(
    State(state): State<AppState<W>>,
    _caller: CallerIdentity,
) -> WebServerResult<Json<Vec<PairView>>>
where
    W: WebSocketManager + 'static,
{
    Ok(Json(state.engine.credentials().pair_views().await?))
}

pub async fn claim_slot<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path((group, username, channel)): Path<(String, String, Channel)>,
) -> WebServerResult<Json<CredentialSlot>>
where
    W: WebSocketManager + 'static,
{
    let pair = CredentialPairId::new(group, username);
    Ok(Json(state.engine.credentials().claim(&pair, channel, &agent).await?))
}

pub async fn release_slot<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path((group, username, channel)): Path<(String, String, Channel)>,
) -> WebServerResult<Json<CredentialSlot>>
where
    W: WebSocketManager + 'static,
{
    let pair = CredentialPairId::new(group, username);
    Ok(Json(state.engine.credentials().release(&pair, channel, &agent).await?))
}

pub async fn renew_slot<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path((group, username, channel)): Path<(String, String, Channel)>,
) -> WebServerResult<Json<CredentialSlot>>
where
    W: WebSocketManager + 'static,
{
    let pair = CredentialPairId::new(group, username);
    Ok(Json(state.engine.credentials().renew(&pair, channel, &agent).await?))
}

pub async fn reveal_secret<W>(
    State(state): State<AppState<W>>,
    CallerIdentity(agent): CallerIdentity,
    Path((group, username)): Path<(String, String)>,
) -> WebServerResult<Json<RevealResponse>>
where
    W: WebSocketManager + 'static,
{
    let pair = CredentialPairId::new(group, username);
    let secret = state.engine.credentials().reveal(&pair, &agent).await?;
    Ok(Json(RevealResponse { secret }))
}
