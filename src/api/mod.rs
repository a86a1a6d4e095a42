// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};

use crate::config::V2_API_VERSION;
use crate::routes::{RouteGroupType, RouteManager};
use crate::state::AppState;

pub mod access_keys;
pub mod admin;
pub mod callback;
pub mod extract;
pub mod health;
pub mod users;
pub mod utxos;
pub mod v2;

pub use extract::BindJson;

/// Register every endpoint into its route group and build the router.
pub fn router(state: AppState) -> Router {
    let new_transaction_flow = state.config.new_transaction_flow_enabled;
    let api_overlaps_v2 = state.config.api_version == V2_API_VERSION;
    let callback_path = state.config.callback_path.clone();

    let mut manager = RouteManager::new(state);
    manager
        .register(RouteGroupType::Root, health::routes)
        .register(RouteGroupType::OldApi, |r| {
            r.route("/xpub", get(users::get_current_user))
                .route("/admin/status", get(admin::status))
        })
        .register(RouteGroupType::Api, users::routes)
        .register(RouteGroupType::Api, access_keys::routes)
        .register(RouteGroupType::Api, utxos::routes)
        .register(RouteGroupType::Api, admin::routes)
        .register(RouteGroupType::TransactionCallback, |r| {
            r.route(&callback_path, post(callback::broadcast_callback))
        });

    if new_transaction_flow && api_overlaps_v2 {
        // `AppConfig::from_kv` rejects this; configs built in code may not.
        tracing::warn!(
            api_version = V2_API_VERSION,
            "versioned API already mounted at /api/v2, skipping new-flow routes"
        );
    } else if new_transaction_flow {
        manager.register(RouteGroupType::ApiV2, v2::routes);
    }

    manager.build()
}
