//! Caller identity
//!
//! Authentication happens upstream; the proxy in front of the webserver puts
//! the signed-in agent's login in the `x-agent-id` header.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use shared::AgentId;

use crate::error::WebServerError;

pub const AGENT_HEADER: &str = "x-agent-id";

/// The agent making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub AgentId);

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = WebServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AGENT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|login| !login.is_empty())
            .map(|login| CallerIdentity(AgentId::new(login)))
            .ok_or(WebServerError::Unauthenticated { header: AGENT_HEADER })
    }
}
