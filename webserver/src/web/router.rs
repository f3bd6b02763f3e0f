//! Route table

use axum::routing::{delete, get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::traits::WebSocketManager;
use crate::web::handlers::{api, websocket};

pub fn build_router<W>(state: AppState<W>) -> Router
where
    W: WebSocketManager + 'static,
{
    let pipeline = Router::new()
        .route("/clients", get(api::list_clients::<W>).post(api::create_client::<W>))
        .route("/clients/:id", get(api::get_client::<W>).delete(api::delete_client::<W>))
        .route("/clients/:id/status", post(api::set_status::<W>))
        .route("/clients/:id/reference", post(api::capture_reference::<W>))
        .route("/clients/:id/installation/confirm", post(api::confirm_installation::<W>))
        .route("/clients/:id/installation/reject", post(api::reject_installation::<W>))
        .route("/clients/:id/notes", post(api::add_note::<W>))
        .route("/clients/:id/activity/:entry_id", delete(api::remove_activity::<W>));

    let payroll = Router::new()
        .route("/payroll/pending", get(api::pending_settlement::<W>))
        .route("/payroll/batches", get(api::list_batches::<W>).post(api::generate_batch::<W>))
        .route("/payroll/batches/:id", get(api::get_batch::<W>))
        .route("/payroll/batches/:id/members", get(api::batch_members::<W>))
        .route("/payroll/batches/:id/breakdown", get(api::batch_breakdown::<W>))
        .route("/payroll/batches/:id/paid", post(api::mark_batch_paid::<W>));

    let credentials = Router::new()
        .route("/credentials", get(api::list_credentials::<W>))
        .route("/credentials/:group/:username/reveal", post(api::reveal_secret::<W>))
        .route("/credentials/:group/:username/:channel/claim", post(api::claim_slot::<W>))
        .route("/credentials/:group/:username/:channel/release", post(api::release_slot::<W>))
        .route("/credentials/:group/:username/:channel/renew", post(api::renew_slot::<W>));

    Router::new()
        .route("/health", get(api::health::<W>))
        .route("/ws", get(websocket::websocket_handler::<W>))
        .nest("/api", pipeline.merge(payroll).merge(credentials))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
