// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use serde::Deserialize;

use super::{Conditions, ModelFilter, TimeRange, ToDbConditions};
use crate::error::ApiError;

/// Access-key search filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyFilter {
    #[serde(flatten)]
    pub model: ModelFilter,
    #[serde(default)]
    pub revoked_range: Option<TimeRange>,
}

impl ToDbConditions for AccessKeyFilter {
    fn to_db_conditions(&self) -> Result<Conditions, ApiError> {
        let mut conditions = self.model.to_db_conditions()?;
        conditions.apply_range("revoked_at", self.revoked_range.as_ref());
        Ok(conditions)
    }
}

/// Access-key filter for admins, optionally scoped to one xPub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccessKeyFilter {
    #[serde(flatten)]
    pub access_key: AccessKeyFilter,
    #[serde(default)]
    pub xpub_id: Option<String>,
}

impl ToDbConditions for AdminAccessKeyFilter {
    fn to_db_conditions(&self) -> Result<Conditions, ApiError> {
        let mut conditions = self.access_key.to_db_conditions()?;
        conditions.apply_if_some("xpub_id", self.xpub_id.as_ref());
        Ok(conditions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Condition;
    use crate::query::parse_search_params;

    #[test]
    fn created_range_from_query() {
        let params = parse_search_params::<AccessKeyFilter>(
            "createdRange[from]=2024-02-26T11:01:28Z&createdRange[to]=2024-02-27T11:01:28Z&size=5",
        )
        .unwrap();
        assert_eq!(params.page.size, 5);

        let conditions = params.conditions.to_db_conditions().unwrap();
        assert_eq!(conditions.len(), 2);
        assert_eq!(
            serde_json::to_value(&conditions).unwrap(),
            serde_json::json!({
                "deleted_at": null,
                "created_at": {
                    "$gte": "2024-02-26T11:01:28Z",
                    "$lte": "2024-02-27T11:01:28Z"
                }
            })
        );
    }

    #[test]
    fn revoked_range_maps_to_revoked_at() {
        let params = parse_search_params::<AccessKeyFilter>(
            "revokedRange[to]=2024-02-27T11:01:28Z&includeDeleted=true",
        )
        .unwrap();
        let conditions = params.conditions.to_db_conditions().unwrap();
        assert!(!conditions.contains("deleted_at"));
        assert!(matches!(
            conditions.get("revoked_at"),
            Some(Condition::Range { gte: None, lte: Some(_) })
        ));
    }

    #[test]
    fn admin_filter_adds_xpub_scope() {
        let params = parse_search_params::<AdminAccessKeyFilter>(
            "xpubId=abc&includeDeleted=false",
        )
        .unwrap();
        assert_eq!(params.conditions.access_key.model.include_deleted, Some(false));

        let conditions = params.conditions.to_db_conditions().unwrap();
        assert_eq!(
            serde_json::to_value(&conditions).unwrap(),
            serde_json::json!({ "deleted_at": null, "xpub_id": "abc" })
        );
    }
}
