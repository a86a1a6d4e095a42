// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub service: String,
    /// Whether the wallet engine answers.
    pub engine: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct LandingResponse {
    pub message: String,
}

pub fn routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/", get(landing))
        .route("/health", get(health))
        .route("/health/live", get(liveness))
}

pub async fn landing() -> Json<LandingResponse> {
    Json(LandingResponse {
        message: "Welcome to the SPV Wallet".to_string(),
    })
}

/// Returns 200 if the engine answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let engine_ok = match state.engine.admin_stats().await {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(error = %err, "engine health check failed");
            false
        }
    };

    let response = ReadyResponse {
        status: if engine_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            engine: if engine_ok { "ok" } else { "unavailable" }.to_string(),
        },
    };

    let status = if engine_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler. Always 200 while the process runs.
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::AppConfig;
    use crate::engine::InMemoryEngine;

    #[tokio::test]
    async fn health_reports_engine() {
        let state = AppState::new(
            AppConfig::with_admin_key("admin"),
            Arc::new(InMemoryEngine::new()),
        );
        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.engine, "ok");
    }

    #[tokio::test]
    async fn liveness_is_ok() {
        assert_eq!(liveness().await.0.status, "ok");
    }
}
