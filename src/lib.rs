// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SPV Wallet Server - HTTP surface of a Bitcoin SPV wallet service
//!
//! This crate authenticates callers (admin key, xPub, access key), verifies
//! signed requests, binds nested search queries into typed filters, and
//! mounts handlers into route groups that carry their middleware chain.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers and route registration (Axum)
//! - `auth` - auth resolver, signature verification, audience extractors
//! - `query` - bracket-notation query decoding and search-parameter binding
//! - `filter` - typed filters compiled into engine conditions
//! - `routes` - route groups and the request-context middleware
//! - `engine` - wallet engine contract and the in-memory engine

pub mod api;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod models;
pub mod query;
pub mod routes;
pub mod state;
