// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory wallet engine.
//!
//! Holds users, access keys and UTXOs in hash maps behind a single
//! `tokio::sync::RwLock`. Searches evaluate [`Conditions`](crate::filter::Conditions) column by column,
//! apply metadata containment, sort by the page's `sort_by` column and slice
//! the requested page. Used for local runs and tests.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{EngineError, SearchRequest, WalletEngine};
use crate::auth::keys::{self, hash_hex};
use crate::filter::{Condition, ConditionValue};
use crate::models::{AccessKeyRecord, AdminStats, TransactionCallback, UserRecord, UtxoRecord};
use crate::query::{Metadata, SortDirection};

/// A column value as seen by condition evaluation.
#[derive(Debug, Clone, PartialEq)]
enum Column {
    Null,
    UInt(u64),
    Text(String),
    Time(DateTime<Utc>),
}

impl Column {
    fn text(value: &str) -> Self {
        Column::Text(value.to_string())
    }

    fn opt_text(value: Option<&String>) -> Self {
        value.map_or(Column::Null, |v| Column::text(v))
    }

    fn opt_time(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Column::Null, Column::Time)
    }

    fn equals(&self, value: &ConditionValue) -> bool {
        match (self, value) {
            (Column::UInt(a), ConditionValue::UInt(b)) => a == b,
            (Column::UInt(a), ConditionValue::Int(b)) => i64::try_from(*a).is_ok_and(|a| a == *b),
            (Column::Text(a), ConditionValue::Text(b)) => a == b,
            (Column::Time(a), ConditionValue::Time(b)) => a == b,
            _ => false,
        }
    }

    fn order(&self, other: &Column) -> Ordering {
        match (self, other) {
            (Column::Null, Column::Null) => Ordering::Equal,
            (Column::Null, _) => Ordering::Less,
            (_, Column::Null) => Ordering::Greater,
            (Column::UInt(a), Column::UInt(b)) => a.cmp(b),
            (Column::Text(a), Column::Text(b)) => a.cmp(b),
            (Column::Time(a), Column::Time(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Record types searchable by the in-memory engine.
trait Searchable: Clone {
    fn column(&self, name: &str) -> Column;
    fn metadata(&self) -> &Metadata;
    fn owner(&self) -> &str;
}

impl Searchable for AccessKeyRecord {
    fn column(&self, name: &str) -> Column {
        match name {
            "id" => Column::text(&self.id),
            "xpub_id" => Column::text(&self.xpub_id),
            "key" => Column::opt_text(self.key.as_ref()),
            "created_at" => Column::Time(self.created_at),
            "updated_at" => Column::Time(self.updated_at),
            "deleted_at" => Column::opt_time(self.deleted_at),
            "revoked_at" => Column::opt_time(self.revoked_at),
            _ => Column::Null,
        }
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn owner(&self) -> &str {
        &self.xpub_id
    }
}

impl Searchable for UtxoRecord {
    fn column(&self, name: &str) -> Column {
        match name {
            "id" => Column::text(&self.id),
            "xpub_id" => Column::text(&self.xpub_id),
            "transaction_id" => Column::text(&self.transaction_id),
            "output_index" => Column::UInt(u64::from(self.output_index)),
            "satoshis" => Column::UInt(self.satoshis),
            "script_pub_key" => Column::text(&self.script_pub_key),
            "type" => Column::text(self.utxo_type.as_str()),
            "draft_id" => Column::opt_text(self.draft_id.as_ref()),
            "reserved_at" => Column::opt_time(self.reserved_at),
            "spending_tx_id" => Column::opt_text(self.spending_tx_id.as_ref()),
            "created_at" => Column::Time(self.created_at),
            "updated_at" => Column::Time(self.updated_at),
            "deleted_at" => Column::opt_time(self.deleted_at),
            _ => Column::Null,
        }
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn owner(&self) -> &str {
        &self.xpub_id
    }
}

fn matches_condition(column: &Column, condition: &Condition) -> bool {
    match condition {
        Condition::IsNull => *column == Column::Null,
        Condition::Equals(value) => column.equals(value),
        Condition::Range { gte, lte } => match column {
            Column::Time(t) => gte.is_none_or(|from| *t >= from) && lte.is_none_or(|to| *t <= to),
            _ => false,
        },
    }
}

/// `filter` is contained in `record`: objects key by key, arrays item by
/// item, scalars by value or by their textual form.
fn json_contains(record: &Value, filter: &Value) -> bool {
    match (record, filter) {
        (Value::Object(record), Value::Object(filter)) => filter
            .iter()
            .all(|(k, v)| record.get(k).is_some_and(|r| json_contains(r, v))),
        (Value::Array(record), Value::Array(filter)) => filter
            .iter()
            .all(|f| record.iter().any(|r| json_contains(r, f))),
        (Value::String(r), Value::String(f)) => r == f,
        (Value::Number(r), Value::String(f)) => r.to_string() == *f,
        (Value::Bool(r), Value::String(f)) => r.to_string() == *f,
        (r, f) => r == f,
    }
}

fn metadata_matches(record: &Metadata, filter: &Metadata) -> bool {
    filter
        .iter()
        .all(|(k, v)| record.get(k).is_some_and(|r| json_contains(r, v)))
}

fn filtered<T: Searchable>(records: &[T], request: &SearchRequest<'_>) -> Vec<T> {
    records
        .iter()
        .filter(|r| request.xpub_id.is_none_or(|owner| r.owner() == owner))
        .filter(|r| {
            request
                .conditions
                .iter()
                .all(|(name, condition)| matches_condition(&r.column(name), condition))
        })
        .filter(|r| metadata_matches(r.metadata(), request.metadata))
        .cloned()
        .collect()
}

fn search<T: Searchable>(records: &[T], request: &SearchRequest<'_>) -> Vec<T> {
    let mut found = filtered(records, request);
    let page = request.page;
    found.sort_by(|a, b| {
        let ord = a.column(&page.sort_by).order(&b.column(&page.sort_by));
        match page.sort {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    found
        .into_iter()
        .skip(page.offset())
        .take(page.size as usize)
        .collect()
}

#[derive(Default)]
struct Tables {
    users: HashMap<String, UserRecord>,
    /// Compressed public key hex -> xPub id.
    pub_keys: HashMap<String, String>,
    access_keys: Vec<AccessKeyRecord>,
    utxos: Vec<UtxoRecord>,
    /// Most recent callbacks, oldest first.
    callbacks: VecDeque<TransactionCallback>,
}

/// Number of transaction callbacks kept in memory.
pub const CALLBACK_LOG_CAPACITY: usize = 1024;

#[derive(Default)]
pub struct InMemoryEngine {
    tables: RwLock<Tables>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user by xPub. The id is the hash of the xPub string.
    pub async fn insert_user(&self, xpub: &str, metadata: Metadata) -> UserRecord {
        let now = Utc::now();
        let public_key = keys::decode_xpub(xpub)
            .ok()
            .map(|key| keys::public_key_hex(&key));
        let record = UserRecord {
            id: hash_hex(xpub),
            public_key: public_key.clone(),
            current_balance: 0,
            next_internal_num: 0,
            next_external_num: 0,
            metadata,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let mut tables = self.tables.write().await;
        if let Some(pk) = public_key {
            tables.pub_keys.insert(pk, record.id.clone());
        }
        tables.users.insert(record.id.clone(), record.clone());
        record
    }

    /// Register an access key (compressed public key hex) for a user.
    pub async fn insert_access_key(&self, xpub_id: &str, key: &str) -> AccessKeyRecord {
        let now = Utc::now();
        let record = AccessKeyRecord {
            id: hash_hex(key),
            xpub_id: xpub_id.to_string(),
            key: Some(key.to_string()),
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            revoked_at: None,
        };
        self.tables.write().await.access_keys.push(record.clone());
        record
    }

    pub async fn revoke_access_key(&self, id: &str) -> Result<(), EngineError> {
        let mut tables = self.tables.write().await;
        let record = tables
            .access_keys
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("access key {id}")))?;
        let now = Utc::now();
        record.revoked_at = Some(now);
        record.updated_at = now;
        Ok(())
    }

    /// Add a UTXO and credit its owner's balance.
    pub async fn insert_utxo(&self, utxo: UtxoRecord) {
        let mut tables = self.tables.write().await;
        if utxo.spending_tx_id.is_none() && utxo.deleted_at.is_none() {
            if let Some(user) = tables.users.get_mut(&utxo.xpub_id) {
                user.current_balance = user.current_balance.saturating_add(utxo.satoshis);
            }
        }
        tables.utxos.push(utxo);
    }

    pub async fn callbacks(&self) -> Vec<TransactionCallback> {
        self.tables.read().await.callbacks.iter().cloned().collect()
    }
}

#[async_trait]
impl WalletEngine for InMemoryEngine {
    async fn authenticate_access_key(
        &self,
        hashed_key: &str,
    ) -> Result<Option<AccessKeyRecord>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables
            .access_keys
            .iter()
            .find(|k| k.id == hashed_key && k.deleted_at.is_none())
            .cloned())
    }

    async fn get_user_by_xpub_id(&self, xpub_id: &str) -> Result<Option<UserRecord>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .get(xpub_id)
            .filter(|u| u.deleted_at.is_none())
            .cloned())
    }

    async fn get_user_by_pub_key(&self, pub_key: &str) -> Result<Option<UserRecord>, EngineError> {
        let tables = self.tables.read().await;
        Ok(tables
            .pub_keys
            .get(pub_key)
            .and_then(|id| tables.users.get(id))
            .filter(|u| u.deleted_at.is_none())
            .cloned())
    }

    async fn search_access_keys(
        &self,
        request: SearchRequest<'_>,
    ) -> Result<Vec<AccessKeyRecord>, EngineError> {
        let tables = self.tables.read().await;
        Ok(search(&tables.access_keys, &request))
    }

    async fn count_access_keys(&self, request: SearchRequest<'_>) -> Result<u64, EngineError> {
        let tables = self.tables.read().await;
        Ok(filtered(&tables.access_keys, &request).len() as u64)
    }

    async fn search_utxos(&self, request: SearchRequest<'_>) -> Result<Vec<UtxoRecord>, EngineError> {
        let tables = self.tables.read().await;
        Ok(search(&tables.utxos, &request))
    }

    async fn count_utxos(&self, request: SearchRequest<'_>) -> Result<u64, EngineError> {
        let tables = self.tables.read().await;
        Ok(filtered(&tables.utxos, &request).len() as u64)
    }

    async fn update_user_metadata(
        &self,
        xpub_id: &str,
        metadata: Metadata,
    ) -> Result<UserRecord, EngineError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(xpub_id)
            .ok_or_else(|| EngineError::NotFound(format!("user {xpub_id}")))?;
        for (key, value) in metadata {
            if value.is_null() {
                user.metadata.remove(&key);
            } else {
                user.metadata.insert(key, value);
            }
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn admin_stats(&self) -> Result<AdminStats, EngineError> {
        let tables = self.tables.read().await;
        Ok(AdminStats {
            users: tables.users.len() as u64,
            access_keys: tables.access_keys.len() as u64,
            utxos: tables.utxos.len() as u64,
            balance: tables
                .users
                .values()
                .map(|u| u.current_balance)
                .fold(0u64, u64::saturating_add),
        })
    }

    async fn handle_transaction_callback(
        &self,
        callback: TransactionCallback,
    ) -> Result<(), EngineError> {
        tracing::info!(txid = %callback.txid, status = %callback.tx_status, "transaction callback received");
        let mut tables = self.tables.write().await;
        if tables.callbacks.len() == CALLBACK_LOG_CAPACITY {
            tables.callbacks.pop_front();
        }
        tables.callbacks.push_back(callback);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AccessKeyFilter, Conditions, ToDbConditions, UtxoType};
    use crate::query::{parse_search_params, Page};

    fn utxo(xpub_id: &str, vout: u32, satoshis: u64) -> UtxoRecord {
        let now = Utc::now();
        UtxoRecord {
            id: hash_hex(&format!("tx|{vout}")),
            xpub_id: xpub_id.to_string(),
            transaction_id: "tx".into(),
            output_index: vout,
            satoshis,
            script_pub_key: "76a914".into(),
            utxo_type: UtxoType::Pubkeyhash,
            draft_id: None,
            reserved_at: None,
            spending_tx_id: None,
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn access_keys_are_scoped_and_filtered() {
        let engine = InMemoryEngine::new();
        let a = engine.insert_access_key("owner-a", "key-1").await;
        engine.insert_access_key("owner-a", "key-2").await;
        engine.insert_access_key("owner-b", "key-3").await;
        engine.revoke_access_key(&a.id).await.unwrap();

        let params = parse_search_params::<AccessKeyFilter>("").unwrap();
        let conditions = params.conditions.to_db_conditions().unwrap();
        let request = SearchRequest {
            xpub_id: Some("owner-a"),
            metadata: &params.metadata,
            conditions: &conditions,
            page: &params.page,
        };
        assert_eq!(engine.count_access_keys(request).await.unwrap(), 2);

        let mut revoked = Conditions::new();
        revoked.insert("revoked_at", Condition::IsNull);
        let request = SearchRequest {
            conditions: &revoked,
            ..request
        };
        let found = engine.search_access_keys(request).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key.as_deref(), Some("key-2"));
    }

    #[tokio::test]
    async fn utxos_sort_and_page() {
        let engine = InMemoryEngine::new();
        for vout in 0..5 {
            engine.insert_utxo(utxo("owner", vout, 100 * u64::from(vout + 1))).await;
        }
        let conditions = Conditions::new();
        let metadata = Metadata::new();
        let page = Page {
            number: 2,
            size: 2,
            sort: SortDirection::Asc,
            sort_by: "satoshis".into(),
        };
        let request = SearchRequest {
            xpub_id: None,
            metadata: &metadata,
            conditions: &conditions,
            page: &page,
        };
        let found = engine.search_utxos(request).await.unwrap();
        let sats: Vec<u64> = found.iter().map(|u| u.satoshis).collect();
        assert_eq!(sats, vec![300, 400]);
        assert_eq!(engine.count_utxos(request).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn metadata_containment_matches_textual_values() {
        let engine = InMemoryEngine::new();
        let mut tagged = utxo("owner", 0, 1);
        tagged.metadata.insert("count".into(), serde_json::json!(3));
        engine.insert_utxo(tagged).await;
        engine.insert_utxo(utxo("owner", 1, 1)).await;

        let params = parse_search_params::<AccessKeyFilter>("metadata[count]=3").unwrap();
        let conditions = Conditions::new();
        let request = SearchRequest {
            xpub_id: None,
            metadata: &params.metadata,
            conditions: &conditions,
            page: &params.page,
        };
        assert_eq!(engine.count_utxos(request).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn metadata_update_merges_and_removes() {
        let engine = InMemoryEngine::new();
        let user = engine.insert_user("not-an-xpub", Metadata::new()).await;
        assert_eq!(user.public_key, None);

        let mut patch = Metadata::new();
        patch.insert("a".into(), serde_json::json!("1"));
        patch.insert("b".into(), serde_json::json!("2"));
        engine.update_user_metadata(&user.id, patch).await.unwrap();

        let mut patch = Metadata::new();
        patch.insert("a".into(), Value::Null);
        let updated = engine.update_user_metadata(&user.id, patch).await.unwrap();
        assert_eq!(updated.metadata.len(), 1);
        assert_eq!(updated.metadata["b"], "2");

        assert!(matches!(
            engine.update_user_metadata("missing", Metadata::new()).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn balance_follows_unspent_outputs() {
        let engine = InMemoryEngine::new();
        let user = engine.insert_user("owner-xpub", Metadata::new()).await;
        engine.insert_utxo(utxo(&user.id, 0, 700)).await;
        let mut spent = utxo(&user.id, 1, 300);
        spent.spending_tx_id = Some("later".into());
        engine.insert_utxo(spent).await;

        let stats = engine.admin_stats().await.unwrap();
        assert_eq!(stats.users, 1);
        assert_eq!(stats.utxos, 2);
        assert_eq!(stats.balance, 700);
    }

    #[tokio::test]
    async fn callback_log_keeps_only_the_newest_entries() {
        let engine = InMemoryEngine::new();
        for n in 0..CALLBACK_LOG_CAPACITY + 5 {
            let raw = serde_json::json!({ "txid": n.to_string(), "txStatus": "MINED" });
            let callback: TransactionCallback = serde_json::from_value(raw).unwrap();
            engine.handle_transaction_callback(callback).await.unwrap();
        }

        let callbacks = engine.callbacks().await;
        assert_eq!(callbacks.len(), CALLBACK_LOG_CAPACITY);
        assert_eq!(callbacks[0].txid, "5");
        assert_eq!(
            callbacks[CALLBACK_LOG_CAPACITY - 1].txid,
            (CALLBACK_LOG_CAPACITY + 4).to_string()
        );
    }
}
