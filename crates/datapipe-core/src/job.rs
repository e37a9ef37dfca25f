//! Asset jobs and selections.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::asset::{AssetDefinition, AssetKey};
use crate::error::DefinitionsError;

/// Which assets a job materializes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AssetSelection {
    /// Every registered asset.
    All,
    /// Explicit asset keys.
    Keys(Vec<AssetKey>),
    /// Every asset in any of the named groups.
    Groups(Vec<String>),
}

impl AssetSelection {
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<AssetKey>,
    {
        AssetSelection::Keys(keys.into_iter().map(Into::into).collect())
    }

    pub fn groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AssetSelection::Groups(groups.into_iter().map(Into::into).collect())
    }

    /// Resolve the selection against registered assets.
    ///
    /// Explicit keys must all be registered. Group selections may resolve to
    /// nothing.
    pub fn resolve(
        &self,
        job: &str,
        assets: &BTreeMap<AssetKey, AssetDefinition>,
    ) -> Result<Vec<AssetKey>, DefinitionsError> {
        match self {
            AssetSelection::All => Ok(assets.keys().cloned().collect()),
            AssetSelection::Keys(keys) => keys
                .iter()
                .map(|key| {
                    if assets.contains_key(key) {
                        Ok(key.clone())
                    } else {
                        Err(DefinitionsError::UnresolvedSelection {
                            job: job.to_string(),
                            asset: key.to_string(),
                        })
                    }
                })
                .collect(),
            AssetSelection::Groups(groups) => Ok(assets
                .values()
                .filter(|asset| {
                    asset
                        .group_name
                        .as_ref()
                        .is_some_and(|g| groups.iter().any(|wanted| wanted == g))
                })
                .map(|asset| asset.key.clone())
                .collect()),
        }
    }
}

/// A named selection of assets run together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub selection: AssetSelection,
}

impl JobDefinition {
    pub fn new(name: impl Into<String>, selection: AssetSelection) -> Self {
        Self {
            name: name.into(),
            description: None,
            selection,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets() -> BTreeMap<AssetKey, AssetDefinition> {
        [
            AssetDefinition::new("products").with_group("ingestion"),
            AssetDefinition::new("sales_data").with_group("ingestion"),
            AssetDefinition::new("joined_data").with_group("joins"),
        ]
        .into_iter()
        .map(|a| (a.key.clone(), a))
        .collect()
    }

    #[test]
    fn test_resolve_all() {
        let keys = AssetSelection::All.resolve("job", &assets()).unwrap();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_resolve_keys() {
        let keys = AssetSelection::keys(["joined_data"])
            .resolve("job", &assets())
            .unwrap();
        assert_eq!(keys, vec![AssetKey::new("joined_data")]);
    }

    #[test]
    fn test_resolve_unknown_key() {
        let err = AssetSelection::keys(["missing"])
            .resolve("analysis_job", &assets())
            .unwrap_err();
        assert_eq!(
            err,
            DefinitionsError::UnresolvedSelection {
                job: "analysis_job".to_string(),
                asset: "missing".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_groups() {
        let keys = AssetSelection::groups(["ingestion"])
            .resolve("job", &assets())
            .unwrap();
        assert_eq!(keys, vec![AssetKey::new("products"), AssetKey::new("sales_data")]);
    }

    #[test]
    fn test_selection_serialization() {
        let json = serde_json::to_value(AssetSelection::keys(["a"])).unwrap();
        assert_eq!(json, serde_json::json!({"type": "keys", "value": ["a"]}));
    }
}
