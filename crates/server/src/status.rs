//! Admin status endpoint.
//!
//! `GET /-/status` is the operator's window into the store: lifecycle
//! state, the promoted generation, and a per-generation summary.

use axum::{Json, extract::State};
use serde::Serialize;

use larder_core::GenerationInfo;

use crate::error::GatewayError;
use crate::gateway::GatewayState;

/// Body of the status response.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    /// Lifecycle state of the manager.
    pub state: String,
    /// Version string this deployment wants current.
    pub version: String,
    /// Generation fetches are actually served from, once promoted.
    pub current: Option<String>,
    /// Every stored generation, oldest first.
    pub generations: Vec<GenerationInfo>,
}

pub async fn status(State(state): State<GatewayState>) -> Result<Json<StatusBody>, GatewayError> {
    let generations = state.store.list_generations().await?;

    Ok(Json(StatusBody {
        state: state.manager.state().await.as_str().to_string(),
        version: state.manager.version().to_string(),
        current: state.manager.current_generation().await,
        generations,
    }))
}
