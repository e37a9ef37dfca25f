//! Sales pipeline assets.
//!
//! Three CSV imports feed a joined view, which feeds the monthly and product
//! reports and the ad-hoc request query.

use datapipe_core::{AssetCheckDefinition, AssetDefinition, DefinitionsModule, SqlBody};
use std::path::{Path, PathBuf};

/// Resource key every asset in this module runs against.
pub const DUCKDB_RESOURCE: &str = "duckdb";

/// Directory holding the source CSVs, relative to the working directory.
pub const DATA_DIR: &str = "data";

/// The quickstart's asset module.
#[derive(Debug, Clone)]
pub struct AssetsModule {
    data_dir: PathBuf,
}

impl AssetsModule {
    /// Read the source CSVs from `data_dir` instead of [`DATA_DIR`].
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl Default for AssetsModule {
    fn default() -> Self {
        Self::with_data_dir(DATA_DIR)
    }
}

impl DefinitionsModule for AssetsModule {
    fn name(&self) -> &str {
        "assets"
    }

    fn assets(&self) -> Vec<AssetDefinition> {
        vec![
            products(&self.data_dir),
            sales_reps(&self.data_dir),
            sales_data(&self.data_dir),
            joined_data(),
            monthly_sales_performance(),
            product_performance(),
            adhoc_request(),
        ]
    }

    fn asset_checks(&self) -> Vec<AssetCheckDefinition> {
        vec![missing_dimension_check()]
    }
}

fn duckdb_asset(name: &str, group: &str) -> AssetDefinition {
    AssetDefinition::new(name)
        .with_group(group)
        .with_kind("duckdb")
        .requires_resource(DUCKDB_RESOURCE)
}

/// Load `<data_dir>/<table>.csv` into `table`, replacing it.
fn csv_import(data_dir: &Path, table: &str) -> SqlBody {
    let path = data_dir.join(format!("{table}.csv"));
    let path = path.to_string_lossy().replace('\'', "''");
    SqlBody::new(format!(
        "create or replace table {table} as (select * from read_csv_auto('{path}'))"
    ))
}

pub fn products(data_dir: &Path) -> AssetDefinition {
    duckdb_asset("products", "ingestion")
        .with_description("Product catalog imported from products.csv")
        .with_sql(csv_import(data_dir, "products"))
}

pub fn sales_reps(data_dir: &Path) -> AssetDefinition {
    duckdb_asset("sales_reps", "ingestion")
        .with_description("Sales representatives imported from sales_reps.csv")
        .with_sql(csv_import(data_dir, "sales_reps"))
}

pub fn sales_data(data_dir: &Path) -> AssetDefinition {
    duckdb_asset("sales_data", "ingestion")
        .with_description("Sales transactions imported from sales_data.csv")
        .with_sql(csv_import(data_dir, "sales_data"))
}

pub fn joined_data() -> AssetDefinition {
    duckdb_asset("joined_data", "joins")
        .with_description("Sales joined with their rep and product")
        .with_deps(["sales_data", "sales_reps", "products"])
        .with_sql(SqlBody::new(
            "create or replace view joined_data as (
                select
                    date,
                    dollar_amount,
                    customer_name,
                    quantity,
                    rep_name,
                    department,
                    hire_date,
                    product_name,
                    category,
                    price
                from sales_data
                left join sales_reps
                    on sales_reps.rep_id = sales_data.rep_id
                left join products
                    on products.product_id = sales_data.product_id
            )",
        ))
}

pub fn monthly_sales_performance() -> AssetDefinition {
    duckdb_asset("monthly_sales_performance", "analysis")
        .with_description("Sales totals per month, rep and product")
        .with_deps(["joined_data"])
        .with_sql(SqlBody::new(
            "create or replace table monthly_sales_performance as (
                select
                    strftime(date::date, '%Y-%m') as month,
                    rep_name,
                    product_name,
                    sum(dollar_amount) as total_dollar_amount
                from joined_data
                group by all
            )",
        ))
}

pub fn product_performance() -> AssetDefinition {
    duckdb_asset("product_performance", "analysis")
        .with_description("Sales and units sold per category and product")
        .with_deps(["joined_data"])
        .with_sql(SqlBody::new(
            "create or replace table product_performance as (
                select
                    category,
                    product_name,
                    sum(dollar_amount) as dollar_amount,
                    sum(quantity) as units_sold
                from joined_data
                group by all
            )",
        ))
}

/// Fields of an ad-hoc request file, bound in this order.
pub const ADHOC_REQUEST_FIELDS: [&str; 4] = ["start_date", "end_date", "department", "product"];

pub fn adhoc_request() -> AssetDefinition {
    duckdb_asset("adhoc_request", "requests")
        .with_description("Sales by rep for one department and product over a date range")
        .with_deps(["joined_data"])
        .with_sql(
            SqlBody::new(
                "select
                    department,
                    rep_name,
                    product_name,
                    sum(dollar_amount) as total_sales
                from joined_data
                where date >= ?
                    and date < ?
                    and department = ?
                    and product_name = ?
                group by department, rep_name, product_name",
            )
            .with_params(ADHOC_REQUEST_FIELDS),
        )
}

pub fn missing_dimension_check() -> AssetCheckDefinition {
    AssetCheckDefinition::new("missing_dimension_check", "joined_data")
        .with_description("Every sale has a rep and a product")
        .requires_resource(DUCKDB_RESOURCE)
        .with_sql(SqlBody::new(
            "select count(*) from joined_data where rep_name is null or product_name is null",
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::build_definitions_with_database;
    use datapipe_core::{
        load_asset_checks_from_modules, load_assets_from_modules, AssetCheckKey, AssetKey,
        Definitions,
    };
    use serde_json::json;

    fn repo_data_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data")
    }

    /// Definitions reading the repo's sample CSVs into a fresh database.
    fn sample_defs(dir: &tempfile::TempDir) -> Definitions {
        let module = AssetsModule::with_data_dir(repo_data_dir());
        let database = dir.path().join("quickstart.duckdb");
        build_definitions_with_database(&[&module], database.to_str().unwrap()).unwrap()
    }

    fn materialize_pipeline(defs: &Definitions) {
        for asset in [
            "products",
            "sales_reps",
            "sales_data",
            "joined_data",
            "monthly_sales_performance",
            "product_performance",
        ] {
            defs.materialize(&AssetKey::new(asset), &serde_json::Value::Null)
                .unwrap_or_else(|e| panic!("materializing {} failed: {}", asset, e));
        }
    }

    fn count(defs: &Definitions, table: &str) -> i64 {
        let conn = defs.duckdb(DUCKDB_RESOURCE).unwrap().get_connection().unwrap();
        conn.query_row(&format!("select count(*) from {}", table), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_module_asset_names_are_unique() {
        let module = AssetsModule::default();
        let assets = load_assets_from_modules(&[&module]).unwrap();
        assert_eq!(assets.len(), module.assets().len());
    }

    #[test]
    fn test_every_dep_is_defined_in_module() {
        let assets = load_assets_from_modules(&[&AssetsModule::default()]).unwrap();
        for asset in assets.values() {
            for dep in &asset.deps {
                assert!(assets.contains_key(dep), "{} depends on unknown {}", asset.key, dep);
            }
        }
    }

    #[test]
    fn test_check_targets_joined_data() {
        let checks = load_asset_checks_from_modules(&[&AssetsModule::default()]).unwrap();
        let check = checks.values().next().unwrap();
        assert_eq!(check.asset, AssetKey::new("joined_data"));
    }

    #[test]
    fn test_csv_import_sql() {
        let sql = csv_import(Path::new(DATA_DIR), "products");
        assert_eq!(
            sql.statement,
            "create or replace table products as (select * from read_csv_auto('data/products.csv'))"
        );
    }

    #[test]
    fn test_csv_import_escapes_quotes() {
        let sql = csv_import(Path::new("o'neil"), "products");
        assert!(sql.statement.contains("read_csv_auto('o''neil/products.csv')"));
    }

    #[test]
    fn test_adhoc_request_params_match_placeholders() {
        let sql = adhoc_request().sql.unwrap();
        assert_eq!(sql.statement.matches('?').count(), sql.params.len());
    }

    #[test]
    fn test_pipeline_runs_on_sample_data() {
        let dir = tempfile::tempdir().unwrap();
        let defs = sample_defs(&dir);
        materialize_pipeline(&defs);

        assert_eq!(count(&defs, "products"), 4);
        assert_eq!(count(&defs, "sales_reps"), 3);
        assert_eq!(count(&defs, "joined_data"), 6);
        assert_eq!(count(&defs, "monthly_sales_performance"), 6);
        assert_eq!(count(&defs, "product_performance"), 4);
    }

    #[test]
    fn test_missing_dimension_check_passes_on_sample_data() {
        let dir = tempfile::tempdir().unwrap();
        let defs = sample_defs(&dir);
        materialize_pipeline(&defs);

        let result = defs
            .execute_check(&AssetCheckKey::new("joined_data", "missing_dimension_check"))
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.failing_rows, 0);
    }

    #[test]
    fn test_adhoc_request_answers_sensor_run_config() {
        let dir = tempfile::tempdir().unwrap();
        let defs = sample_defs(&dir);
        materialize_pipeline(&defs);

        let run_config = json!({
            "ops": {
                "adhoc_request": {
                    "config": {
                        "department": "South",
                        "product": "Driftwood Denim Jacket",
                        "start_date": "2024-01-01",
                        "end_date": "2024-06-01"
                    }
                }
            }
        });
        let result = defs
            .materialize(&AssetKey::new("adhoc_request"), &run_config)
            .unwrap();
        assert_eq!(result.row_count, 2);

        let total_for = |rep: &str| {
            result
                .rows
                .iter()
                .find(|row| row["rep_name"] == rep)
                .and_then(|row| row["total_sales"].as_f64())
                .unwrap()
        };
        assert!((total_for("Ana Ruiz") - 269.97).abs() < 1e-6);
        assert!((total_for("Chen Wei") - 539.94).abs() < 1e-6);
    }
}
