//! Asset check definitions and results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::asset::{AssetKey, SqlBody};

/// Identifies a check: the asset it guards plus the check name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetCheckKey {
    pub asset: AssetKey,
    pub name: String,
}

impl AssetCheckKey {
    pub fn new(asset: impl Into<AssetKey>, name: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for AssetCheckKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.asset, self.name)
    }
}

/// A named assertion evaluated after its asset materializes.
///
/// The SQL body must return one integer: the number of failing rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCheckDefinition {
    pub name: String,
    pub asset: AssetKey,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// A failing blocking check stops downstream materializations.
    #[serde(default)]
    pub blocking: bool,

    #[serde(default)]
    pub required_resources: BTreeSet<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<SqlBody>,
}

impl AssetCheckDefinition {
    pub fn new(name: impl Into<String>, asset: impl Into<AssetKey>) -> Self {
        Self {
            name: name.into(),
            asset: asset.into(),
            description: None,
            blocking: false,
            required_resources: BTreeSet::new(),
            sql: None,
        }
    }

    pub fn key(&self) -> AssetCheckKey {
        AssetCheckKey::new(self.asset.clone(), self.name.clone())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn requires_resource(mut self, key: impl Into<String>) -> Self {
        self.required_resources.insert(key.into());
        self
    }

    pub fn with_sql(mut self, sql: SqlBody) -> Self {
        self.sql = Some(sql);
        self
    }
}

/// Outcome of running one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: AssetCheckKey,
    pub passed: bool,
    pub failing_rows: i64,
    pub blocking: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key_display() {
        let check = AssetCheckDefinition::new("missing_dimension_check", "joined_data");
        assert_eq!(check.key().to_string(), "joined_data:missing_dimension_check");
    }

    #[test]
    fn test_check_keys_order_by_asset_then_name() {
        let a = AssetCheckKey::new("a", "z");
        let b = AssetCheckKey::new("b", "a");
        assert!(a < b);
    }
}
