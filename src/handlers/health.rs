//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{error::LedgerError, handlers::AppState};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Record store status
    pub store: String,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "store": "connected",
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// # Response (503 Service Unavailable)
///
/// If the store is unreachable, returns the standard error response.
pub async fn health_check(State(engine): State<AppState>) -> Result<Json<HealthResponse>, LedgerError> {
    engine.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        store: "connected".to_string(),
        timestamp: Utc::now(),
    }))
}
