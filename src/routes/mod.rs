// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Route Groups
//!
//! Every handler is registered into a [`RouteGroupType`]. The group decides
//! the URL prefix and the middleware chain, so a route's authorization class
//! follows from where it is registered.
//!
//! | Group | Prefix | Middleware |
//! |---|---|---|
//! | `Root` | none | none |
//! | `OldApi` | `/<old-version>` | auth, signature |
//! | `Api` | `/api/<version>` | auth, signature |
//! | `ApiV2` | `/api/v2` | auth, signature |
//! | `TransactionCallback` | none | bearer callback token |
//!
//! Around all groups: CORS, tracing, request id and the app-context span.

use std::collections::BTreeMap;

use axum::{middleware::from_fn_with_state, Router};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::auth::{callback::callback_token_middleware, resolver::auth_middleware, signature::signature_middleware};
use crate::error::ApiError;
use crate::state::AppState;

pub mod middleware;

pub use middleware::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RouteGroupType {
    Root,
    OldApi,
    Api,
    ApiV2,
    TransactionCallback,
}

impl RouteGroupType {
    pub const ALL: [RouteGroupType; 5] = [
        RouteGroupType::Root,
        RouteGroupType::OldApi,
        RouteGroupType::Api,
        RouteGroupType::ApiV2,
        RouteGroupType::TransactionCallback,
    ];

    /// Whether the group runs the auth and signature middleware.
    pub fn is_authenticated(self) -> bool {
        matches!(
            self,
            RouteGroupType::OldApi | RouteGroupType::Api | RouteGroupType::ApiV2
        )
    }
}

/// A group of routes sharing a prefix and a middleware chain.
pub struct RouteGroup {
    pub kind: RouteGroupType,
    pub prefix: String,
    router: Router<AppState>,
    routes: usize,
}

impl RouteGroup {
    fn new(kind: RouteGroupType, prefix: String) -> Self {
        Self {
            kind,
            prefix,
            router: Router::new(),
            routes: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routes == 0
    }

    fn into_layered(self, state: &AppState) -> Router<AppState> {
        match self.kind {
            RouteGroupType::Root => self.router,
            RouteGroupType::OldApi | RouteGroupType::Api | RouteGroupType::ApiV2 => self
                .router
                .layer(from_fn_with_state(state.clone(), signature_middleware))
                .layer(from_fn_with_state(state.clone(), auth_middleware)),
            RouteGroupType::TransactionCallback => self
                .router
                .layer(from_fn_with_state(state.clone(), callback_token_middleware)),
        }
    }
}

/// Group prefix for the configured API versions.
pub fn group_prefix(kind: RouteGroupType, state: &AppState) -> String {
    match kind {
        RouteGroupType::Root | RouteGroupType::TransactionCallback => String::new(),
        RouteGroupType::OldApi => format!("/{}", state.config.old_api_version),
        RouteGroupType::Api => format!("/api/{}", state.config.api_version),
        RouteGroupType::ApiV2 => "/api/v2".to_string(),
    }
}

/// Collects route registrations and builds the final router once.
pub struct RouteManager {
    state: AppState,
    groups: Vec<RouteGroup>,
}

impl RouteManager {
    pub fn new(state: AppState) -> Self {
        let groups = RouteGroupType::ALL
            .into_iter()
            .map(|kind| RouteGroup::new(kind, group_prefix(kind, &state)))
            .collect();
        Self { state, groups }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn group(&self, kind: RouteGroupType) -> Option<&RouteGroup> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    /// Add routes to a group. Paths are relative to the group prefix.
    pub fn register(
        &mut self,
        kind: RouteGroupType,
        routes: impl FnOnce(Router<AppState>) -> Router<AppState>,
    ) -> &mut Self {
        if let Some(group) = self.groups.iter_mut().find(|g| g.kind == kind) {
            group.router = routes(std::mem::take(&mut group.router));
            group.routes += 1;
        }
        self
    }

    /// Apply each group's middleware, mount it under its prefix, then add
    /// the fallbacks and outer layers.
    pub fn build(self) -> Router {
        let state = self.state;

        // Groups sharing a prefix are merged before nesting.
        let mut by_prefix: BTreeMap<String, Router<AppState>> = BTreeMap::new();
        for group in self.groups.into_iter().filter(|g| !g.is_empty()) {
            let prefix = group.prefix.clone();
            let layered = group.into_layered(&state);
            let merged = match by_prefix.remove(&prefix) {
                Some(existing) => existing.merge(layered),
                None => layered,
            };
            by_prefix.insert(prefix, merged);
        }

        let mut router = Router::new();
        for (prefix, group_router) in by_prefix {
            router = if prefix.is_empty() {
                router.merge(group_router)
            } else {
                router.nest(&prefix, group_router)
            };
        }

        router
            .fallback(|| async { ApiError::RouteNotFound })
            .method_not_allowed_fallback(|| async { ApiError::MethodNotAllowed })
            .layer(axum::middleware::from_fn(middleware::app_context_middleware))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{body::Body, http::Request, http::StatusCode, routing::get};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::engine::InMemoryEngine;

    fn state() -> AppState {
        let mut config = AppConfig::with_admin_key("admin");
        config.old_api_version = "v0".to_string();
        config.api_version = "v1".to_string();
        AppState::new(config, Arc::new(InMemoryEngine::new()))
    }

    #[test]
    fn prefixes_follow_configuration() {
        let manager = RouteManager::new(state());
        let prefix = |kind| manager.group(kind).map(|g| g.prefix.clone());
        assert_eq!(prefix(RouteGroupType::Root).as_deref(), Some(""));
        assert_eq!(prefix(RouteGroupType::OldApi).as_deref(), Some("/v0"));
        assert_eq!(prefix(RouteGroupType::Api).as_deref(), Some("/api/v1"));
        assert_eq!(prefix(RouteGroupType::ApiV2).as_deref(), Some("/api/v2"));
        assert_eq!(prefix(RouteGroupType::TransactionCallback).as_deref(), Some(""));
    }

    #[test]
    fn only_api_groups_authenticate() {
        assert!(!RouteGroupType::Root.is_authenticated());
        assert!(!RouteGroupType::TransactionCallback.is_authenticated());
        assert!(RouteGroupType::OldApi.is_authenticated());
        assert!(RouteGroupType::Api.is_authenticated());
        assert!(RouteGroupType::ApiV2.is_authenticated());
    }

    async fn status_of(app: Router, method: &str, uri: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn group_middleware_guards_only_its_routes() {
        let mut manager = RouteManager::new(state());
        manager
            .register(RouteGroupType::Root, |r| r.route("/ping", get(|| async { "pong" })))
            .register(RouteGroupType::Api, |r| r.route("/secret", get(|| async { "secret" })));
        let app = manager.build();

        assert_eq!(status_of(app.clone(), "GET", "/ping").await, StatusCode::OK);
        assert_eq!(
            status_of(app.clone(), "GET", "/api/v1/secret").await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(app.clone(), "GET", "/nope").await, StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(app, "POST", "/ping").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[tokio::test]
    async fn every_response_carries_a_request_id() {
        let mut manager = RouteManager::new(state());
        manager.register(RouteGroupType::Root, |r| r.route("/ping", get(|| async { "pong" })));
        let response = manager
            .build()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
