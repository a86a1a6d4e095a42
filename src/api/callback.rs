// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode};

use super::BindJson;
use crate::error::ApiError;
use crate::models::TransactionCallback;
use crate::state::AppState;

/// Broadcast status pushed by the transaction processor. Guarded by the
/// callback token, not by user auth.
pub async fn broadcast_callback(
    State(state): State<AppState>,
    BindJson(callback): BindJson<TransactionCallback>,
) -> Result<StatusCode, ApiError> {
    state.engine.handle_transaction_callback(callback).await?;
    Ok(StatusCode::OK)
}
