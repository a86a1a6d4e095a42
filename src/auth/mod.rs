// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Request-scoped authentication for the wallet API.
//!
//! ## Auth Flow
//!
//! 1. The client sends `x-auth-xpub` (an xPub or the admin key) or
//!    `x-auth-key` (an access key), plus the signature envelope
//!    (`x-auth-hash`, `x-auth-nonce`, `x-auth-time`, `x-auth-signature`).
//! 2. [`resolver::auth_middleware`] classifies the caller and stores a
//!    [`UserContext`] in the request extensions.
//! 3. [`signature::signature_middleware`] buffers the body, checks the
//!    envelope and records a [`SignatureStatus`]. Access-key callers and
//!    `requireSigning` deployments are rejected on failure.
//! 4. Handlers declare their audience with the [`AsUser`], [`AsAdmin`] or
//!    [`AsAdminOrUser`] extractors.
//!
//! The transaction callback route uses [`callback::callback_token_middleware`]
//! instead: a bearer token compared against the configured one.
//!
//! ## Security
//!
//! - Unknown xPubs, unknown or revoked access keys and malformed keys all
//!   yield the same opaque `error-unauthorized`
//! - Key material is never logged

pub mod callback;
pub mod context;
pub mod keys;
pub mod resolver;
pub mod scope;
pub mod signature;
pub mod signer;

pub use context::{AuthType, UserContext};
pub use scope::{AsAdmin, AsAdminOrUser, AsUser};
pub use signature::SignatureStatus;

/// Extended public key, or the admin key.
pub const HEADER_XPUB: &str = "x-auth-xpub";
/// Access key (compressed public key hex).
pub const HEADER_ACCESS_KEY: &str = "x-auth-key";
/// Hex SHA-256 of the request body.
pub const HEADER_AUTH_HASH: &str = "x-auth-hash";
pub const HEADER_AUTH_NONCE: &str = "x-auth-nonce";
/// Milliseconds since the Unix epoch.
pub const HEADER_AUTH_TIME: &str = "x-auth-time";
pub const HEADER_AUTH_SIGNATURE: &str = "x-auth-signature";
