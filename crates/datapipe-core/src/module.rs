//! Explicit component modules and the loaders that collect them.
//!
//! A module lists the assets and checks it defines. Loading several modules
//! merges their lists into keyed maps and rejects duplicate names.

use std::collections::BTreeMap;

use crate::asset::{AssetDefinition, AssetKey};
use crate::check::{AssetCheckDefinition, AssetCheckKey};
use crate::error::{ComponentKind, DefinitionsError};

/// A set of assets and checks registered together.
pub trait DefinitionsModule {
    /// Module name, used in logs.
    fn name(&self) -> &str;

    fn assets(&self) -> Vec<AssetDefinition>;

    fn asset_checks(&self) -> Vec<AssetCheckDefinition> {
        Vec::new()
    }
}

/// Collect every asset of `modules`, keyed by asset key.
pub fn load_assets_from_modules(
    modules: &[&dyn DefinitionsModule],
) -> Result<BTreeMap<AssetKey, AssetDefinition>, DefinitionsError> {
    let mut assets = BTreeMap::new();
    for module in modules {
        let defined = module.assets();
        tracing::debug!(module = module.name(), count = defined.len(), "Loading assets");
        for asset in defined {
            if assets.contains_key(&asset.key) {
                return Err(DefinitionsError::DuplicateName {
                    kind: ComponentKind::Asset,
                    name: asset.key.to_string(),
                });
            }
            assets.insert(asset.key.clone(), asset);
        }
    }
    Ok(assets)
}

/// Collect every asset check of `modules`, keyed by check key.
pub fn load_asset_checks_from_modules(
    modules: &[&dyn DefinitionsModule],
) -> Result<BTreeMap<AssetCheckKey, AssetCheckDefinition>, DefinitionsError> {
    let mut checks = BTreeMap::new();
    for module in modules {
        let defined = module.asset_checks();
        tracing::debug!(module = module.name(), count = defined.len(), "Loading asset checks");
        for check in defined {
            let key = check.key();
            if checks.contains_key(&key) {
                return Err(DefinitionsError::DuplicateName {
                    kind: ComponentKind::AssetCheck,
                    name: key.to_string(),
                });
            }
            checks.insert(key, check);
        }
    }
    Ok(checks)
}
