//! Datapipe developer CLI.
//!
//! Loads the quickstart definitions and inspects or exercises them locally.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use datapipe_core::sql::run_sql;
use datapipe_core::{AssetCheckKey, AssetKey, Definitions, RetryConfig};
use datapipe_quickstart::{defs, CliConfig};

#[derive(Parser)]
#[command(name = "datapipe")]
#[command(version, about = "Datapipe quickstart developer tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered asset, check, job, schedule, sensor and resource
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load the definitions and report what was registered
    Validate,

    /// Sensor commands
    Sensor {
        #[command(subcommand)]
        command: SensorCommands,
    },

    /// Resource commands
    Resource {
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Materialize one asset. Upstream assets are not run.
    Materialize {
        /// Asset key
        asset: String,

        /// Asset config as a JSON object
        #[arg(long, value_name = "JSON")]
        config: Option<String>,
    },

    /// Run one asset check
    Check {
        /// Asset the check is attached to
        asset: String,

        /// Check name
        check: String,
    },
}

#[derive(Subcommand)]
enum SensorCommands {
    /// Evaluate one tick and print the run requests and next cursor
    Preview {
        /// Sensor name
        name: String,

        /// Cursor returned by a previous tick
        #[arg(long)]
        cursor: Option<String>,
    },
}

#[derive(Subcommand)]
enum ResourceCommands {
    /// Open the resource and run a trivial query
    Ping {
        /// Resource key
        key: String,

        /// Connection retries before giving up
        #[arg(long, default_value_t = 10)]
        retries: u32,
    },
}

/// Initialize tracing/logging.
fn init_tracing(config: &CliConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter.clone().into());

    tracing_subscriber::registry()
        .with(filter)
        .with(config.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!config.log_json).then(tracing_subscriber::fmt::layer))
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = CliConfig::from_env().context("Invalid DATAPIPE_* environment")?;
    init_tracing(&config);

    let cli = Cli::parse();
    let defs = defs().context("Failed to load definitions")?;

    match cli.command {
        Commands::List { json } => list(&defs, json)?,
        Commands::Validate => {
            println!(
                "Loaded {} assets, {} asset checks, {} jobs, {} schedules, {} sensors, {} resources",
                defs.assets().len(),
                defs.asset_checks().len(),
                defs.all_jobs().len(),
                defs.schedules().len(),
                defs.sensors().len(),
                defs.resources().len(),
            );
        }
        Commands::Sensor {
            command: SensorCommands::Preview { name, cursor },
        } => {
            let result = defs
                .evaluate_sensor(&name, cursor)
                .with_context(|| format!("Sensor {} failed", name))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Resource {
            command: ResourceCommands::Ping { key, retries },
        } => {
            let resource = defs.duckdb(&key)?;
            let conn =
                resource.get_connection_with_retry(&RetryConfig::with_max_retries(retries))?;
            run_sql(&conn, "select 1", &[]).context("Ping query failed")?;
            println!("{}: ok ({})", key, resource.database);
        }
        Commands::Materialize { asset, config } => {
            let config = match config {
                Some(raw) => serde_json::from_str(&raw).context("--config is not valid JSON")?,
                None => serde_json::Value::Null,
            };
            let result = defs
                .materialize(&AssetKey::new(asset.as_str()), &config)
                .with_context(|| format!("Materializing {} failed", asset))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Check { asset, check } => {
            let key = AssetCheckKey::new(asset.as_str(), check.as_str());
            let result = defs
                .execute_check(&key)
                .with_context(|| format!("Check {} failed to run", key))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.passed {
                bail!("Check {} failed with {} failing rows", key, result.failing_rows);
            }
        }
    }

    Ok(())
}

fn list(defs: &Definitions, json: bool) -> Result<()> {
    let summary = defs.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Assets:");
    for asset in &summary.assets {
        let deps: Vec<&str> = asset.deps.iter().map(AssetKey::as_str).collect();
        println!(
            "  {:<28} group={:<10} deps=[{}]",
            asset.key.as_str(),
            asset.group_name.as_deref().unwrap_or("default"),
            deps.join(", ")
        );
    }

    println!("Asset checks:");
    for check in &summary.asset_checks {
        println!("  {}", check.key());
    }

    println!("Jobs:");
    for job in &summary.jobs {
        match &job.selection_error {
            Some(err) => println!("  {:<28} error: {}", job.name, err),
            None => println!("  {:<28} assets=[{}]", job.name, job.assets.join(", ")),
        }
    }

    println!("Schedules:");
    for schedule in &summary.schedules {
        println!(
            "  {:<28} cron={:<12} job={}",
            schedule.name, schedule.cron_schedule, schedule.job
        );
    }

    println!("Sensors:");
    for sensor in &summary.sensors {
        println!(
            "  {:<28} job={} interval={}s",
            sensor.name, sensor.job, sensor.minimum_interval_seconds
        );
    }

    println!("Resources:");
    for (key, resource) in &summary.resources {
        println!(
            "  {:<28} {:<10} {}",
            key,
            resource.kind(),
            resource.as_duckdb().database
        );
    }

    Ok(())
}
