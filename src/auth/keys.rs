// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key material used by request authentication.
//!
//! BIP32 keys, P2PKH addresses and Bitcoin Signed Message signatures come
//! from the `bitcoin` crate. This module adds what is specific to the
//! service: strict xPub validation, nonce-driven derivation paths and the
//! hex SHA-256 used for xPub ids, access-key ids and body hashes.

use std::str::FromStr;
use std::sync::OnceLock;

use bitcoin::bip32::{ChildNumber, Xpub};
use bitcoin::hashes::Hash as _;
use bitcoin::secp256k1::{self, All, Secp256k1, SecretKey};
use bitcoin::sign_message::{signed_msg_hash, MessageSignature};
use bitcoin::{Address, CompressedPublicKey, NetworkKind, PubkeyHash};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of a base58check encoded extended key.
pub const XPUB_KEY_LENGTH: usize = 111;

const MAX_INT32: i64 = i32::MAX as i64;
const NONCE_CHUNK: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("extended key must be {XPUB_KEY_LENGTH} characters, got {0}")]
    InvalidLength(usize),
    #[error("invalid extended public key: {0}")]
    InvalidXpub(String),
    #[error("extended key does not re-encode to the same string")]
    NonCanonical,
    #[error("cannot derive child key: {0}")]
    Derivation(String),
    #[error("invalid nonce: {0}")]
    InvalidNonce(String),
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid signature encoding")]
    InvalidSignatureEncoding,
    #[error("cannot recover public key from signature")]
    RecoveryFailed,
    #[error("signature does not match address")]
    AddressMismatch,
}

/// Shared secp256k1 context.
pub fn secp() -> &'static Secp256k1<All> {
    static SECP: OnceLock<Secp256k1<All>> = OnceLock::new();
    SECP.get_or_init(Secp256k1::new)
}

/// Lowercase hex SHA-256 of a string.
pub fn hash_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// Hash of a request body, ignoring one trailing newline.
pub fn body_hash(body: &str) -> String {
    hash_hex(body.strip_suffix('\n').unwrap_or(body))
}

/// Decode a base58check extended public key.
pub fn decode_xpub(encoded: &str) -> Result<Xpub, KeyError> {
    Xpub::from_str(encoded).map_err(|e| KeyError::InvalidXpub(e.to_string()))
}

/// Strict validation used for authentication: exact length, valid
/// encoding, and a canonical round-trip.
pub fn parse_xpub(encoded: &str) -> Result<Xpub, KeyError> {
    if encoded.len() != XPUB_KEY_LENGTH {
        return Err(KeyError::InvalidLength(encoded.len()));
    }
    let xpub = decode_xpub(encoded)?;
    if xpub.to_string() != encoded {
        return Err(KeyError::NonCanonical);
    }
    Ok(xpub)
}

/// Child numbers encoded by a hex nonce.
///
/// The nonce is cut into 8-character chunks, each read as base-16. Values
/// above `i32::MAX` are reduced by `i32::MAX`; what is still at or above
/// 2^31 becomes a hardened index. An empty nonce yields no derivation.
pub fn child_numbers_from_nonce(nonce: &str) -> Result<Vec<ChildNumber>, KeyError> {
    nonce
        .as_bytes()
        .chunks(NONCE_CHUNK)
        .map(|chunk| {
            let part = std::str::from_utf8(chunk)
                .map_err(|_| KeyError::InvalidNonce("not ascii hex".to_string()))?;
            if !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(KeyError::InvalidNonce(format!("'{part}' is not hex")));
            }
            let mut num =
                i64::from_str_radix(part, 16).map_err(|e| KeyError::InvalidNonce(e.to_string()))?;
            if num > MAX_INT32 {
                num -= MAX_INT32;
            }
            u32::try_from(num)
                .map(ChildNumber::from)
                .map_err(|e| KeyError::InvalidNonce(e.to_string()))
        })
        .collect()
}

/// Public child selected by `nonce`. Hardened indices cannot be derived.
pub fn derive_from_nonce(xpub: &Xpub, nonce: &str) -> Result<Xpub, KeyError> {
    let path = child_numbers_from_nonce(nonce)?;
    xpub.derive_pub(secp(), &path)
        .map_err(|e| KeyError::Derivation(e.to_string()))
}

/// Compressed SEC1 public key of an xPub, hex encoded.
pub fn public_key_hex(xpub: &Xpub) -> String {
    hex::encode(xpub.public_key.serialize())
}

fn p2pkh(pubkey_hash: PubkeyHash) -> String {
    Address::p2pkh(pubkey_hash, NetworkKind::Main).to_string()
}

/// Mainnet P2PKH address of the xPub's own key.
pub fn xpub_address(xpub: &Xpub) -> String {
    p2pkh(xpub.to_pub().pubkey_hash())
}

/// Address of a hex-encoded public key, serialised compressed.
pub fn address_from_public_key_hex(public_key_hex: &str) -> Result<String, KeyError> {
    let bytes = hex::decode(public_key_hex).map_err(|_| KeyError::InvalidPublicKey)?;
    let key = secp256k1::PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
    Ok(p2pkh(CompressedPublicKey(key).pubkey_hash()))
}

/// Verify a base64 Bitcoin Signed Message signature over `message` against
/// `address`.
pub fn verify_message(address: &str, signature: &str, message: &str) -> Result<(), KeyError> {
    let signature = MessageSignature::from_base64(signature.trim())
        .map_err(|_| KeyError::InvalidSignatureEncoding)?;
    let recovered = signature
        .recover_pubkey(secp(), signed_msg_hash(message))
        .map_err(|_| KeyError::RecoveryFailed)?;

    if p2pkh(recovered.pubkey_hash()) == address {
        Ok(())
    } else {
        Err(KeyError::AddressMismatch)
    }
}

/// Sign `message` and return the base64 signature for the compressed key.
pub fn sign_message(secret_key: &SecretKey, message: &str) -> String {
    let digest = secp256k1::Message::from_digest(signed_msg_hash(message).to_byte_array());
    let signature = secp().sign_ecdsa_recoverable(&digest, secret_key);
    MessageSignature::new(signature, true).to_base64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::bip32::Xpriv;

    const TEST_XPUB: &str = "xpub661MyMwAqRbcH3WGvLjupmr43L1GVH3MP2WQWvdreDraBeFJy64Xxv4LLX9ZVWWz3ZjZkMuZtSsc9qH9JZR74bR4PWkmtEvP423r6DJR8kA";
    const TEST_XPUB_ID: &str = "d8c2bed524071d72d859caf90da5f448b5861cd4d4fd47697f94166c13c5a987";

    fn master() -> Xpriv {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        Xpriv::new_master(NetworkKind::Main, &seed).unwrap()
    }

    #[test]
    fn xpub_id_is_hex_sha256() {
        assert_eq!(hash_hex(TEST_XPUB), TEST_XPUB_ID);
    }

    #[test]
    fn body_hash_strips_one_trailing_newline() {
        let body = r#"{"test_field":"test_value"}"#;
        assert_eq!(
            body_hash(body),
            "5858adf09a0cc01f6d3a4d377f010408313031bb96b40d98e6edccf18c26464e"
        );
        assert_eq!(body_hash(&format!("{body}\n")), body_hash(body));
        assert_ne!(body_hash(&format!("{body}\n\n")), body_hash(body));
    }

    #[test]
    fn strict_validation() {
        let key = parse_xpub(TEST_XPUB).unwrap();
        assert_eq!(key.to_string(), TEST_XPUB);

        assert_eq!(parse_xpub("invalid-key"), Err(KeyError::InvalidLength(11)));

        let mut tampered = TEST_XPUB.to_string();
        tampered.replace_range(110..111, if TEST_XPUB.ends_with('A') { "B" } else { "A" });
        assert!(matches!(parse_xpub(&tampered), Err(KeyError::InvalidXpub(_))));
    }

    #[test]
    fn private_keys_are_not_public_keys() {
        let xprv = master().to_string();
        assert_eq!(xprv.len(), XPUB_KEY_LENGTH);
        assert!(matches!(parse_xpub(&xprv), Err(KeyError::InvalidXpub(_))));
    }

    #[test]
    fn nonce_chunks_become_child_numbers() {
        assert_eq!(child_numbers_from_nonce("").unwrap(), Vec::<ChildNumber>::new());
        assert_eq!(
            child_numbers_from_nonce("0000000a").unwrap(),
            vec![ChildNumber::from(10)]
        );
        assert_eq!(
            child_numbers_from_nonce("7fffffff80000000abc").unwrap(),
            vec![
                ChildNumber::from(0x7fff_ffff),
                ChildNumber::from(1),
                ChildNumber::from(0xabc),
            ]
        );
        assert!(child_numbers_from_nonce("zz").is_err());
        assert!(child_numbers_from_nonce("-0000001").is_err());
    }

    #[test]
    fn nonce_derivation_matches_private_derivation() {
        let master = master();
        let xpub = Xpub::from_priv(secp(), &master);
        let path = child_numbers_from_nonce("0000000a0000000b").unwrap();
        let expected = Xpub::from_priv(secp(), &master.derive_priv(secp(), &path).unwrap());

        assert_eq!(derive_from_nonce(&xpub, "0000000a0000000b").unwrap(), expected);
        assert_eq!(derive_from_nonce(&xpub, "").unwrap(), xpub);
    }

    #[test]
    fn hardened_nonce_cannot_be_derived_publicly() {
        let xpub = Xpub::from_priv(secp(), &master());
        assert!(matches!(
            derive_from_nonce(&xpub, "ffffffff"),
            Err(KeyError::Derivation(_))
        ));
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let child = master().derive_priv(secp(), &[ChildNumber::from(7)]).unwrap();
        let address = xpub_address(&Xpub::from_priv(secp(), &child));

        let signature = sign_message(&child.private_key, "hello");
        assert_eq!(verify_message(&address, &signature, "hello"), Ok(()));
        assert_eq!(
            verify_message(&address, &signature, "hello!"),
            Err(KeyError::AddressMismatch)
        );
        assert_eq!(
            verify_message(&address, "not base64", "hello"),
            Err(KeyError::InvalidSignatureEncoding)
        );
    }

    #[test]
    fn access_key_address_uses_compressed_key() {
        let xpub = Xpub::from_priv(secp(), &master());
        let public_hex = public_key_hex(&xpub);
        assert_eq!(public_hex.len(), 66);
        assert_eq!(
            address_from_public_key_hex(&public_hex).unwrap(),
            xpub_address(&xpub)
        );
        assert!(address_from_public_key_hex("zz").is_err());
    }
}
