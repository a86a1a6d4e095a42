// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-side request signing.
//!
//! Produces the `x-auth-*` headers a client sends. Used by the integration
//! tests and by tooling that drives the API.

use bitcoin::bip32::{Xpriv, Xpub};
use bitcoin::secp256k1::SecretKey;
use chrono::Utc;
use uuid::Uuid;

use super::keys::{self, KeyError};
use super::{
    HEADER_ACCESS_KEY, HEADER_AUTH_HASH, HEADER_AUTH_NONCE, HEADER_AUTH_SIGNATURE,
    HEADER_AUTH_TIME, HEADER_XPUB,
};

/// A signed envelope ready to be sent as headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    /// `x-auth-xpub` or `x-auth-key`.
    pub key_header: &'static str,
    pub key: String,
    pub auth_hash: String,
    pub auth_nonce: String,
    pub auth_time: i64,
    pub signature: String,
}

impl AuthHeaders {
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (self.key_header, self.key.clone()),
            (HEADER_AUTH_HASH, self.auth_hash.clone()),
            (HEADER_AUTH_NONCE, self.auth_nonce.clone()),
            (HEADER_AUTH_TIME, self.auth_time.to_string()),
            (HEADER_AUTH_SIGNATURE, self.signature.clone()),
        ]
    }
}

/// 64 random hex characters.
pub fn random_nonce() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn message(key: &str, auth_hash: &str, nonce: &str, time: i64) -> String {
    format!("{key}{auth_hash}{nonce}{time}")
}

/// Sign `body` with an extended private key, now, with a random nonce.
pub fn sign_with_xpriv(xpriv: &Xpriv, body: &str) -> Result<AuthHeaders, KeyError> {
    sign_with_xpriv_at(xpriv, body, &random_nonce(), Utc::now().timestamp_millis())
}

/// Sign with the child key selected by `nonce`. The identity sent is the
/// neutered root key.
pub fn sign_with_xpriv_at(
    xpriv: &Xpriv,
    body: &str,
    nonce: &str,
    auth_time: i64,
) -> Result<AuthHeaders, KeyError> {
    let path = keys::child_numbers_from_nonce(nonce)?;
    let child = xpriv
        .derive_priv(keys::secp(), &path)
        .map_err(|e| KeyError::Derivation(e.to_string()))?;
    let key = Xpub::from_priv(keys::secp(), xpriv).to_string();
    let auth_hash = keys::body_hash(body);
    let signature = keys::sign_message(
        &child.private_key,
        &message(&key, &auth_hash, nonce, auth_time),
    );

    Ok(AuthHeaders {
        key_header: HEADER_XPUB,
        key,
        auth_hash,
        auth_nonce: nonce.to_string(),
        auth_time,
        signature,
    })
}

pub fn sign_with_access_key(secret_key: &SecretKey, body: &str) -> AuthHeaders {
    sign_with_access_key_at(secret_key, body, &random_nonce(), Utc::now().timestamp_millis())
}

/// Sign with an access key. The identity sent is its compressed public key.
pub fn sign_with_access_key_at(
    secret_key: &SecretKey,
    body: &str,
    nonce: &str,
    auth_time: i64,
) -> AuthHeaders {
    let key = hex::encode(secret_key.public_key(keys::secp()).serialize());
    let auth_hash = keys::body_hash(body);
    let signature = keys::sign_message(secret_key, &message(&key, &auth_hash, nonce, auth_time));

    AuthHeaders {
        key_header: HEADER_ACCESS_KEY,
        key,
        auth_hash,
        auth_nonce: nonce.to_string(),
        auth_time,
        signature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::NetworkKind;

    fn xpriv(seed: u8) -> Xpriv {
        Xpriv::new_master(NetworkKind::Main, &[seed; 32]).unwrap()
    }

    #[test]
    fn random_nonce_is_hex() {
        let nonce = random_nonce();
        assert_eq!(nonce.len(), 64);
        assert!(nonce.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(nonce, random_nonce());
    }

    #[test]
    fn xpriv_headers_carry_root_xpub() {
        let xpriv = xpriv(1);
        let auth = sign_with_xpriv(&xpriv, "{}").unwrap();
        assert_eq!(auth.key_header, HEADER_XPUB);
        assert_eq!(auth.key, Xpub::from_priv(keys::secp(), &xpriv).to_string());
        assert_eq!(auth.auth_hash, keys::body_hash("{}"));
        assert_eq!(auth.pairs().len(), 5);
    }

    #[test]
    fn access_key_is_compressed_hex() {
        let auth = sign_with_access_key(&xpriv(2).private_key, "");
        assert_eq!(auth.key_header, HEADER_ACCESS_KEY);
        assert_eq!(auth.key.len(), 66);
        assert!(auth.key.starts_with("02") || auth.key.starts_with("03"));
    }
}
