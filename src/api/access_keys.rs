// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, routing::get, Json, Router};

use crate::auth::AsAdminOrUser;
use crate::engine::SearchRequest;
use crate::error::ApiError;
use crate::filter::{AccessKeyFilter, ToDbConditions};
use crate::models::{AccessKeyRecord, PageModel};
use crate::query::{SearchParams, SearchQuery};
use crate::state::AppState;

pub fn routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/access-keys", get(search_access_keys))
}

/// Search access keys, optionally scoped to one xPub, and count the total.
pub(crate) async fn search_page<F: ToDbConditions>(
    state: &AppState,
    xpub_id: Option<&str>,
    params: SearchParams<F>,
) -> Result<PageModel<AccessKeyRecord>, ApiError> {
    let conditions = params.conditions.to_db_conditions()?;
    let request = SearchRequest {
        xpub_id,
        metadata: &params.metadata,
        conditions: &conditions,
        page: &params.page,
    };

    let content = state.engine.search_access_keys(request).await?;
    let total = state.engine.count_access_keys(request).await?;
    Ok(PageModel::new(content, &params.page, total))
}

/// Admins see every key, users only their own.
pub async fn search_access_keys(
    AsAdminOrUser(context): AsAdminOrUser,
    State(state): State<AppState>,
    SearchQuery(params): SearchQuery<AccessKeyFilter>,
) -> Result<Json<PageModel<AccessKeyRecord>>, ApiError> {
    search_page(&state, context.xpub_id(), params).await.map(Json)
}
