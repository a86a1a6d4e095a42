// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, routing::get, Json, Router};

use crate::auth::AsUser;
use crate::engine::SearchRequest;
use crate::error::ApiError;
use crate::filter::{ToDbConditions, UtxoFilter};
use crate::models::{PageModel, UtxoRecord};
use crate::query::{SearchParams, SearchQuery};
use crate::state::AppState;

pub fn routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/utxos", get(search_utxos))
}

pub(crate) async fn search_page<F: ToDbConditions>(
    state: &AppState,
    xpub_id: Option<&str>,
    params: SearchParams<F>,
) -> Result<PageModel<UtxoRecord>, ApiError> {
    let conditions = params.conditions.to_db_conditions()?;
    let request = SearchRequest {
        xpub_id,
        metadata: &params.metadata,
        conditions: &conditions,
        page: &params.page,
    };

    let content = state.engine.search_utxos(request).await?;
    let total = state.engine.count_utxos(request).await?;
    Ok(PageModel::new(content, &params.page, total))
}

/// UTXOs owned by the caller.
pub async fn search_utxos(
    AsUser(user): AsUser,
    State(state): State<AppState>,
    SearchQuery(params): SearchQuery<UtxoFilter>,
) -> Result<Json<PageModel<UtxoRecord>>, ApiError> {
    search_page(&state, Some(&user.xpub_id), params).await.map(Json)
}
