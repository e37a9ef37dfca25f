//! Composition root of the quickstart project.
//!
//! The host calls [`defs`] once at startup and keeps the returned
//! [`Definitions`] for the life of the process.

use datapipe_core::{
    load_asset_checks_from_modules, load_assets_from_modules, Definitions, DefinitionsError,
    DefinitionsModule, DuckDbResource,
};

use crate::assets::{AssetsModule, DUCKDB_RESOURCE};
use crate::schedules::weekly_update_schedule;
use crate::sensors::{adhoc_request_job, adhoc_request_sensor};

/// Database file backing the `duckdb` resource.
pub const DUCKDB_DATABASE: &str = "data/mydb.duckdb";

/// Build the project's definitions from its asset module.
pub fn defs() -> Result<Definitions, DefinitionsError> {
    build_definitions(&[&AssetsModule::default()])
}

/// Build definitions from an explicit module set, with the project's fixed
/// schedules, jobs, sensors and resources.
pub fn build_definitions(
    modules: &[&dyn DefinitionsModule],
) -> Result<Definitions, DefinitionsError> {
    build_definitions_with_database(modules, DUCKDB_DATABASE)
}

/// [`build_definitions`] with the `duckdb` resource pointed at `database`.
pub fn build_definitions_with_database(
    modules: &[&dyn DefinitionsModule],
    database: &str,
) -> Result<Definitions, DefinitionsError> {
    let assets = load_assets_from_modules(modules)?;
    let asset_checks = load_asset_checks_from_modules(modules)?;

    Definitions::builder()
        .assets(assets.into_values())
        .asset_checks(asset_checks.into_values())
        .schedules([weekly_update_schedule()])
        .jobs([adhoc_request_job()])
        .sensors([adhoc_request_sensor()])
        .resource(DUCKDB_RESOURCE, DuckDbResource::new(database))
        .build()
}
