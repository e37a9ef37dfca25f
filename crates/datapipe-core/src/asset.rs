//! Asset definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique key of an asset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for AssetKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// SQL run against the asset's DuckDB resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlBody {
    /// SQL text. May hold several statements when `params` is empty.
    pub statement: String,

    /// Run-config fields bound, in order, to the `?` placeholders.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

impl SqlBody {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }
}

/// A named computation producing one persisted output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDefinition {
    pub key: AssetKey,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,

    /// Compute kinds shown to operators (e.g. "duckdb").
    #[serde(default)]
    pub kinds: BTreeSet<String>,

    /// Upstream assets.
    #[serde(default)]
    pub deps: Vec<AssetKey>,

    /// Resource keys the asset needs at execution time.
    #[serde(default)]
    pub required_resources: BTreeSet<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<SqlBody>,
}

impl AssetDefinition {
    pub fn new(key: impl Into<AssetKey>) -> Self {
        Self {
            key: key.into(),
            description: None,
            group_name: None,
            kinds: BTreeSet::new(),
            deps: Vec::new(),
            required_resources: BTreeSet::new(),
            sql: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kinds.insert(kind.into());
        self
    }

    pub fn with_deps<I, K>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<AssetKey>,
    {
        self.deps.extend(deps.into_iter().map(Into::into));
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
