// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin endpoints. Every handler takes [`AsAdmin`].

use axum::{extract::State, routing::get, Json, Router};

use crate::auth::AsAdmin;
use crate::error::ApiError;
use crate::filter::{AdminAccessKeyFilter, AdminUtxoFilter};
use crate::models::{AccessKeyRecord, AdminStats, PageModel, UtxoRecord};
use crate::query::SearchQuery;
use crate::state::AppState;

pub fn routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/admin/status", get(status))
        .route("/admin/stats", get(stats))
        .route("/admin/users/keys", get(search_access_keys))
        .route("/admin/utxos", get(search_utxos))
}

/// `true` when the caller is a verified admin.
pub async fn status(_admin: AsAdmin) -> Json<bool> {
    Json(true)
}

pub async fn stats(_admin: AsAdmin, State(state): State<AppState>) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.engine.admin_stats().await?))
}

/// Access keys of all users; `xpubId` narrows to one.
pub async fn search_access_keys(
    _admin: AsAdmin,
    State(state): State<AppState>,
    SearchQuery(params): SearchQuery<AdminAccessKeyFilter>,
) -> Result<Json<PageModel<AccessKeyRecord>>, ApiError> {
    super::access_keys::search_page(&state, None, params)
        .await
        .map(Json)
}

pub async fn search_utxos(
    _admin: AsAdmin,
    State(state): State<AppState>,
    SearchQuery(params): SearchQuery<AdminUtxoFilter>,
) -> Result<Json<PageModel<UtxoRecord>>, ApiError> {
    super::utxos::search_page(&state, None, params).await.map(Json)
}
