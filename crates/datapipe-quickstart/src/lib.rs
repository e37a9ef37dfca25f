//! Datapipe ETL quickstart
//!
//! Sales data pipeline on DuckDB:
//! - [`assets`]: CSV imports, joined view, reports, ad-hoc request query and
//!   the missing-dimension check
//! - [`schedules`]: weekly refresh of the analysis assets
//! - [`sensors`]: ad-hoc request files picked up from `data/requests`
//! - [`definitions`]: the composition root, [`defs`]

pub mod assets;
pub mod config;
pub mod definitions;
pub mod schedules;
pub mod sensors;

pub use config::CliConfig;
pub use definitions::{build_definitions, build_definitions_with_database, defs, DUCKDB_DATABASE};
