//! Datapipe Core
//!
//! Component model for data pipeline projects.
//!
//! This crate provides:
//! - Asset, asset check, job, schedule and sensor definitions
//! - Explicit module loading with duplicate detection
//! - The immutable [`Definitions`] registry and its validation
//! - The DuckDB resource with lazy, retried connection opening
//! - Single-unit execution helpers: materialize one asset, run one check,
//!   evaluate one sensor tick

pub mod asset;
pub mod check;
pub mod definitions;
pub mod error;
pub mod job;
pub mod module;
pub mod naming;
pub mod resource;
pub mod schedule;
pub mod sensor;
pub mod sql;

pub use asset::{AssetDefinition, AssetKey, SqlBody};
pub use check::{AssetCheckDefinition, AssetCheckKey, CheckResult};
pub use definitions::{Definitions, DefinitionsBuilder, DefinitionsSummary, MaterializeResult};
pub use error::{ComponentKind, DefinitionsError, ExecutionError, ResourceError};
pub use job::{AssetSelection, JobDefinition};
pub use module::{load_asset_checks_from_modules, load_assets_from_modules, DefinitionsModule};
pub use resource::{DuckDbResource, ResourceDefinition, RetryConfig};
pub use schedule::{DefaultStatus, ScheduleDefinition};
pub use sensor::{RunRequest, SensorContext, SensorDefinition, SensorEvaluator, SensorResult};
