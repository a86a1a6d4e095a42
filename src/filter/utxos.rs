// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Condition, ConditionValue, Conditions, ModelFilter, TimeRange, ToDbConditions};
use crate::error::ApiError;
use crate::query::textual;

/// Locking script classification of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtxoType {
    Nonstandard,
    Pubkey,
    Pubkeyhash,
    Scripthash,
    Multisig,
    Nulldata,
    Metanet,
    TokenStas,
    TokenSensible,
}

impl UtxoType {
    pub const ALL: [UtxoType; 9] = [
        UtxoType::Nonstandard,
        UtxoType::Pubkey,
        UtxoType::Pubkeyhash,
        UtxoType::Scripthash,
        UtxoType::Multisig,
        UtxoType::Nulldata,
        UtxoType::Metanet,
        UtxoType::TokenStas,
        UtxoType::TokenSensible,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UtxoType::Nonstandard => "nonstandard",
            UtxoType::Pubkey => "pubkey",
            UtxoType::Pubkeyhash => "pubkeyhash",
            UtxoType::Scripthash => "scripthash",
            UtxoType::Multisig => "multisig",
            UtxoType::Nulldata => "nulldata",
            UtxoType::Metanet => "metanet",
            UtxoType::TokenStas => "token_stas",
            UtxoType::TokenSensible => "token_sensible",
        }
    }
}

impl fmt::Display for UtxoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UtxoType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        UtxoType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ApiError::InvalidFilterOption(format!("type={s}")))
    }
}

/// UTXO search filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoFilter {
    #[serde(flatten)]
    pub model: ModelFilter,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "textual::from_str_opt")]
    pub output_index: Option<u32>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "textual::from_str_opt")]
    pub satoshis: Option<u64>,
    #[serde(default)]
    pub script_pub_key: Option<String>,
    /// Validated against [`UtxoType`] when compiled.
    #[serde(default, rename = "type")]
    pub utxo_type: Option<String>,
    #[serde(default)]
    pub draft_id: Option<String>,
    #[serde(default)]
    pub reserved_range: Option<TimeRange>,
    #[serde(default)]
    pub spending_tx_id: Option<String>,
}

impl ToDbConditions for UtxoFilter {
    fn to_db_conditions(&self) -> Result<Conditions, ApiError> {
        let mut conditions = self.model.to_db_conditions()?;

        conditions.apply_if_some("transaction_id", self.transaction_id.as_ref());
        conditions.apply_if_some("output_index", self.output_index.as_ref());
        conditions.apply_if_some("id", self.id.as_ref());
        conditions.apply_if_some("satoshis", self.satoshis.as_ref());
        conditions.apply_if_some("script_pub_key", self.script_pub_key.as_ref());
        if let Some(raw) = &self.utxo_type {
            let utxo_type: UtxoType = raw.parse()?;
            conditions.insert(
                "type",
                Condition::Equals(ConditionValue::Text(utxo_type.as_str().to_string())),
            );
        }
        conditions.apply_if_some("draft_id", self.draft_id.as_ref());
        conditions.apply_range("reserved_at", self.reserved_range.as_ref());
        conditions.apply_if_some("spending_tx_id", self.spending_tx_id.as_ref());

        Ok(conditions)
    }
}

/// UTXO filter for admins, optionally scoped to one xPub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUtxoFilter {
    #[serde(flatten)]
    pub utxo: UtxoFilter,
    #[serde(default)]
    pub xpub_id: Option<String>,
}

impl ToDbConditions for AdminUtxoFilter {
    fn to_db_conditions(&self) -> Result<Conditions, ApiError> {
        let mut conditions = self.utxo.to_db_conditions()?;
        conditions.apply_if_some("xpub_id", self.xpub_id.as_ref());
        Ok(conditions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_search_params;

    #[test]
    fn type_is_validated_case_insensitively() {
        assert_eq!("PubKeyHash".parse::<UtxoType>().unwrap(), UtxoType::Pubkeyhash);
        assert_eq!("token_STAS".parse::<UtxoType>().unwrap(), UtxoType::TokenStas);
        assert!(matches!(
            "p2wpkh".parse::<UtxoType>(),
            Err(ApiError::InvalidFilterOption(_))
        ));
    }

    #[test]
    fn fields_translate_to_columns() {
        let params = parse_search_params::<UtxoFilter>(
            "transactionId=tx1&outputIndex=2&satoshis=1000&type=PUBKEYHASH&reservedRange[from]=2024-01-01T00:00:00Z&spendingTxId=tx2",
        )
        .unwrap();
        let conditions = params.conditions.to_db_conditions().unwrap();
        assert_eq!(
            serde_json::to_value(&conditions).unwrap(),
            serde_json::json!({
                "deleted_at": null,
                "transaction_id": "tx1",
                "output_index": 2,
                "satoshis": 1000,
                "type": "pubkeyhash",
                "reserved_at": { "$gte": "2024-01-01T00:00:00Z" },
                "spending_tx_id": "tx2"
            })
        );
    }

    #[test]
    fn unknown_type_fails_compilation() {
        let params = parse_search_params::<UtxoFilter>("type=bogus").unwrap();
        assert!(matches!(
            params.conditions.to_db_conditions(),
            Err(ApiError::InvalidFilterOption(_))
        ));
    }

    #[test]
    fn admin_filter_wraps_user_filter() {
        let params =
            parse_search_params::<AdminUtxoFilter>("xpubId=x1&draftId=d1&includeDeleted=true")
                .unwrap();
        let conditions = params.conditions.to_db_conditions().unwrap();
        assert_eq!(
            serde_json::to_value(&conditions).unwrap(),
            serde_json::json!({ "draft_id": "d1", "xpub_id": "x1" })
        );
    }

    #[test]
    fn non_numeric_output_index_fails_bind() {
        assert!(parse_search_params::<UtxoFilter>("outputIndex=first").is_err());
    }
}
