//! The registry handed to the host: every asset, check, job, schedule,
//! sensor and resource of a project.
//!
//! [`Definitions`] is built once through [`DefinitionsBuilder::build`], which
//! validates names, uniqueness and references, and is read-only afterwards.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::asset::{AssetDefinition, AssetKey};
use crate::check::{AssetCheckDefinition, AssetCheckKey, CheckResult};
use crate::error::{ComponentKind, DefinitionsError, ExecutionError, ResourceError};
use crate::job::JobDefinition;
use crate::naming::validate_name;
use crate::resource::{DuckDbResource, ResourceDefinition};
use crate::schedule::{DefaultStatus, ScheduleDefinition};
use crate::sensor::{SensorDefinition, SensorResult};
use crate::sql::{run_sql, SqlOutcome};

/// Immutable bundle of all components and resources.
#[derive(Debug, Clone, PartialEq)]
pub struct Definitions {
    assets: BTreeMap<AssetKey, AssetDefinition>,
    asset_checks: BTreeMap<AssetCheckKey, AssetCheckDefinition>,
    schedules: Vec<ScheduleDefinition>,
    jobs: Vec<JobDefinition>,
    sensors: Vec<SensorDefinition>,
    resources: BTreeMap<String, ResourceDefinition>,
}

/// Collects components for [`Definitions`].
#[derive(Default)]
pub struct DefinitionsBuilder {
    assets: Vec<AssetDefinition>,
    asset_checks: Vec<AssetCheckDefinition>,
    schedules: Vec<ScheduleDefinition>,
    jobs: Vec<JobDefinition>,
    sensors: Vec<SensorDefinition>,
    resources: Vec<(String, ResourceDefinition)>,
}

impl DefinitionsBuilder {
    pub fn assets<I: IntoIterator<Item = AssetDefinition>>(mut self, assets: I) -> Self {
        self.assets.extend(assets);
        self
    }

    pub fn asset_checks<I: IntoIterator<Item = AssetCheckDefinition>>(mut self, checks: I) -> Self {
        self.asset_checks.extend(checks);
        self
    }

    pub fn schedules<I: IntoIterator<Item = ScheduleDefinition>>(mut self, schedules: I) -> Self {
        self.schedules.extend(schedules);
        self
    }

    pub fn jobs<I: IntoIterator<Item = JobDefinition>>(mut self, jobs: I) -> Self {
        self.jobs.extend(jobs);
        self
    }

    pub fn sensors<I: IntoIterator<Item = SensorDefinition>>(mut self, sensors: I) -> Self {
        self.sensors.extend(sensors);
        self
    }

    pub fn resource(mut self, key: impl Into<String>, resource: impl Into<ResourceDefinition>) -> Self {
        self.resources.push((key.into(), resource.into()));
        self
    }

    /// Validate and freeze the collected components.
    pub fn build(self) -> Result<Definitions, DefinitionsError> {
        let mut resources = BTreeMap::new();
        for (key, resource) in self.resources {
            validate_name(ComponentKind::Resource, &key)?;
            if resources.contains_key(&key) {
                return Err(duplicate(ComponentKind::Resource, key));
            }
            resources.insert(key, resource);
        }

        let mut assets = BTreeMap::new();
        for asset in self.assets {
            validate_name(ComponentKind::Asset, asset.key.as_str())?;
            if assets.contains_key(&asset.key) {
                return Err(duplicate(ComponentKind::Asset, asset.key.to_string()));
            }
            require_resources(
                &resources,
                &format!("asset {}", asset.key),
                asset.required_resources.iter(),
            )?;
            assets.insert(asset.key.clone(), asset);
        }

        for asset in assets.values() {
            for dep in asset.deps.iter().filter(|dep| !assets.contains_key(*dep)) {
                tracing::warn!(
                    asset = %asset.key,
                    dep = %dep,
                    "Upstream asset is not registered; treating it as external"
                );
            }
        }

        let mut asset_checks = BTreeMap::new();
        for check in self.asset_checks {
            validate_name(ComponentKind::AssetCheck, &check.name)?;
            let key = check.key();
            if asset_checks.contains_key(&key) {
                return Err(duplicate(ComponentKind::AssetCheck, key.to_string()));
            }
            if !assets.contains_key(&check.asset) {
                return Err(DefinitionsError::MissingCheckTarget {
                    check: check.name.clone(),
                    asset: check.asset.to_string(),
                });
            }
            require_resources(
                &resources,
                &format!("asset check {}", key),
                check.required_resources.iter(),
            )?;
            asset_checks.insert(key, check);
        }

        let mut job_names = HashSet::new();
        for job in &self.jobs {
            validate_name(ComponentKind::Job, &job.name)?;
            if !job_names.insert(job.name.as_str()) {
                return Err(duplicate(ComponentKind::Job, job.name.clone()));
            }
        }

        // Jobs referenced by schedules and sensors share one namespace with
        // the explicit jobs: a name must always mean the same definition.
        let mut targeted: BTreeMap<&str, &JobDefinition> = BTreeMap::new();
        let targets = self
            .schedules
            .iter()
            .map(|s| &s.job)
            .chain(self.sensors.iter().map(|s| &s.job));
        for job in targets {
            validate_name(ComponentKind::Job, &job.name)?;
            let conflicts_explicit = self
                .jobs
                .iter()
                .any(|explicit| explicit.name == job.name && explicit != job);
            let conflicts_target = targeted
                .get(job.name.as_str())
                .is_some_and(|existing| *existing != job);
            if conflicts_explicit || conflicts_target {
                return Err(duplicate(ComponentKind::Job, job.name.clone()));
            }
            targeted.insert(job.name.as_str(), job);
        }

        let mut schedule_names = HashSet::new();
        for schedule in &self.schedules {
            validate_name(ComponentKind::Schedule, &schedule.name)?;
            if !schedule_names.insert(schedule.name.as_str()) {
                return Err(duplicate(ComponentKind::Schedule, schedule.name.clone()));
            }
        }

        let mut sensor_names = HashSet::new();
        for sensor in &self.sensors {
            validate_name(ComponentKind::Sensor, &sensor.name)?;
            if !sensor_names.insert(sensor.name.as_str()) {
                return Err(duplicate(ComponentKind::Sensor, sensor.name.clone()));
            }
        }

        let defs = Definitions {
            assets,
            asset_checks,
            schedules: self.schedules,
            jobs: self.jobs,
            sensors: self.sensors,
            resources,
        };

        tracing::info!(
            assets = defs.assets.len(),
            asset_checks = defs.asset_checks.len(),
            jobs = defs.jobs.len(),
            schedules = defs.schedules.len(),
            sensors = defs.sensors.len(),
            resources = defs.resources.len(),
            "Definitions assembled"
        );

        Ok(defs)
    }
}

fn duplicate(kind: ComponentKind, name: String) -> DefinitionsError {
    DefinitionsError::DuplicateName { kind, name }
}

fn require_resources<'a>(
    resources: &BTreeMap<String, ResourceDefinition>,
    component: &str,
    required: impl Iterator<Item = &'a String>,
) -> Result<(), DefinitionsError> {
    for key in required {
        if !resources.contains_key(key) {
            return Err(DefinitionsError::MissingResource {
                component: component.to_string(),
                resource: key.clone(),
            });
        }
    }
    Ok(())
}

/// The asset's own config out of a run config: `ops.<asset>.config` when
/// present (the shape sensors emit), otherwise the value itself.
fn asset_config<'a>(key: &AssetKey, run_config: &'a serde_json::Value) -> &'a serde_json::Value {
    run_config
        .get("ops")
        .and_then(|ops| ops.get(key.as_str()))
        .and_then(|op| op.get("config"))
        .unwrap_or(run_config)
}

/// Result of materializing one asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterializeResult {
    pub asset: AssetKey,
    pub row_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<serde_json::Value>,
    pub duration_ms: u64,
}

impl Definitions {
    pub fn builder() -> DefinitionsBuilder {
        DefinitionsBuilder::default()
    }

    pub fn assets(&self) -> &BTreeMap<AssetKey, AssetDefinition> {
        &self.assets
    }

    pub fn asset_checks(&self) -> &BTreeMap<AssetCheckKey, AssetCheckDefinition> {
        &self.asset_checks
    }

    pub fn schedules(&self) -> &[ScheduleDefinition] {
        &self.schedules
    }

    /// Explicitly registered jobs, in registration order.
    pub fn jobs(&self) -> &[JobDefinition] {
        &self.jobs
    }

    pub fn sensors(&self) -> &[SensorDefinition] {
        &self.sensors
    }

    pub fn resources(&self) -> &BTreeMap<String, ResourceDefinition> {
        &self.resources
    }

    pub fn get_asset(&self, key: &AssetKey) -> Option<&AssetDefinition> {
        self.assets.get(key)
    }

    pub fn get_asset_check(&self, key: &AssetCheckKey) -> Option<&AssetCheckDefinition> {
        self.asset_checks.get(key)
    }

    pub fn get_schedule(&self, name: &str) -> Option<&ScheduleDefinition> {
        self.schedules.iter().find(|s| s.name == name)
    }

    pub fn get_sensor(&self, name: &str) -> Option<&SensorDefinition> {
        self.sensors.iter().find(|s| s.name == name)
    }

    pub fn get_resource(&self, key: &str) -> Option<&ResourceDefinition> {
        self.resources.get(key)
    }

    /// Find a job by name: explicit jobs first, then schedule and sensor targets.
    pub fn get_job(&self, name: &str) -> Option<&JobDefinition> {
        self.all_jobs().into_iter().find(|j| j.name == name)
    }

    /// Explicit jobs followed by jobs only reachable through schedules or
    /// sensors, each name once.
    pub fn all_jobs(&self) -> Vec<&JobDefinition> {
        let mut seen = HashSet::new();
        self.jobs
            .iter()
            .chain(self.schedules.iter().map(|s| &s.job))
            .chain(self.sensors.iter().map(|s| &s.job))
            .filter(|job| seen.insert(job.name.as_str()))
            .collect()
    }

    /// Resolve the asset keys a job would materialize.
    pub fn resolve_job_selection(&self, job: &str) -> Result<Vec<AssetKey>, DefinitionsError> {
        let job = self.get_job(job).ok_or_else(|| DefinitionsError::NotFound {
            kind: ComponentKind::Job,
            name: job.to_string(),
        })?;
        job.selection.resolve(&job.name, &self.assets)
    }

    /// The DuckDB resource under `key`.
    pub fn duckdb(&self, key: &str) -> Result<&DuckDbResource, ResourceError> {
        self.resources
            .get(key)
            .map(ResourceDefinition::as_duckdb)
            .ok_or_else(|| ResourceError::NotFound(key.to_string()))
    }

    fn duckdb_for<'a>(
        &self,
        required: impl Iterator<Item = &'a String>,
        component: &str,
    ) -> Result<&DuckDbResource, ResourceError> {
        required
            .filter_map(|key| self.resources.get(key))
            .map(ResourceDefinition::as_duckdb)
            .next()
            .ok_or_else(|| ResourceError::NotFound(format!("duckdb resource for {}", component)))
    }

    /// Run one asset's SQL body against its DuckDB resource.
    ///
    /// `config` supplies the values of the body's named params. Upstream
    /// assets are not materialized.
    pub fn materialize(
        &self,
        key: &AssetKey,
        config: &serde_json::Value,
    ) -> Result<MaterializeResult, ExecutionError> {
        let asset = self.get_asset(key).ok_or_else(|| DefinitionsError::NotFound {
            kind: ComponentKind::Asset,
            name: key.to_string(),
        })?;
        let sql = asset
            .sql
            .as_ref()
            .ok_or_else(|| ExecutionError::NoComputation(key.to_string()))?;

        let config = asset_config(key, config);
        let params = sql
            .params
            .iter()
            .map(|field| {
                config.get(field).cloned().ok_or_else(|| ExecutionError::MissingConfig {
                    asset: key.to_string(),
                    field: field.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let resource = self.duckdb_for(asset.required_resources.iter(), &format!("asset {}", key))?;
        let conn = resource.get_connection()?;

        tracing::info!(asset = %key, database = %resource.database, "Materializing asset");
        let start = Instant::now();
        let outcome = run_sql(&conn, &sql.statement, &params)?;
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(asset = %key, rows = outcome.row_count(), duration_ms, "Asset materialized");

        Ok(MaterializeResult {
            asset: key.clone(),
            row_count: outcome.row_count(),
            rows: outcome.rows().to_vec(),
            duration_ms,
        })
    }

    /// Run one check. It passes when its SQL body reports zero failing rows.
    pub fn execute_check(&self, key: &AssetCheckKey) -> Result<CheckResult, ExecutionError> {
        let check = self.get_asset_check(key).ok_or_else(|| DefinitionsError::NotFound {
            kind: ComponentKind::AssetCheck,
            name: key.to_string(),
        })?;
        let sql = check
            .sql
            .as_ref()
            .ok_or_else(|| ExecutionError::NoComputation(key.to_string()))?;

        let resource =
            self.duckdb_for(check.required_resources.iter(), &format!("asset check {}", key))?;
        let conn = resource.get_connection()?;

        let failing_rows = match run_sql(&conn, &sql.statement, &[])? {
            SqlOutcome::Rows { columns, rows } => columns
                .first()
                .and_then(|col| rows.first().and_then(|row| row.get(col)))
                .and_then(|v| v.as_i64()),
            SqlOutcome::Executed { .. } => None,
        }
        .ok_or_else(|| {
            ExecutionError::UnexpectedResult(format!("check {} did not return a count", key))
        })?;

        let passed = failing_rows == 0;
        if passed {
            tracing::info!(check = %key, "Asset check passed");
        } else {
            tracing::warn!(check = %key, failing_rows, blocking = check.blocking, "Asset check failed");
        }

        Ok(CheckResult {
            check: key.clone(),
            passed,
            failing_rows,
            blocking: check.blocking,
        })
    }

    /// Run one tick of a sensor.
    pub fn evaluate_sensor(
        &self,
        name: &str,
        cursor: Option<String>,
    ) -> Result<SensorResult, ExecutionError> {
        let sensor = self.get_sensor(name).ok_or_else(|| DefinitionsError::NotFound {
            kind: ComponentKind::Sensor,
            name: name.to_string(),
        })?;
        sensor.evaluate(cursor)
    }

    /// Serializable overview of the registry.
    pub fn summary(&self) -> DefinitionsSummary {
        DefinitionsSummary {
            assets: self.assets.values().cloned().collect(),
            asset_checks: self.asset_checks.values().cloned().collect(),
            jobs: self
                .all_jobs()
                .into_iter()
                .map(|job| {
                    let (assets, selection_error) =
                        match job.selection.resolve(&job.name, &self.assets) {
                            Ok(keys) => (keys.into_iter().map(|k| k.to_string()).collect(), None),
                            Err(e) => (Vec::new(), Some(e.to_string())),
                        };
                    JobSummary {
                        name: job.name.clone(),
                        explicit: self.jobs.iter().any(|j| j.name == job.name),
                        assets,
                        selection_error,
                    }
                })
                .collect(),
            schedules: self
                .schedules
                .iter()
                .map(|s| ScheduleSummary {
                    name: s.name.clone(),
                    cron_schedule: s.cron_schedule.clone(),
                    job: s.job.name.clone(),
                    default_status: s.default_status,
                })
                .collect(),
            sensors: self
                .sensors
                .iter()
                .map(|s| SensorSummary {
                    name: s.name.clone(),
                    job: s.job.name.clone(),
                    minimum_interval_seconds: s.minimum_interval_seconds,
                    default_status: s.default_status,
                    evaluator: s.evaluator_name(),
                })
                .collect(),
            resources: self.resources.clone(),
        }
    }
}

/// Snapshot of [`Definitions`] for listing.
#[derive(Debug, Clone, Serialize)]
pub struct DefinitionsSummary {
    pub assets: Vec<AssetDefinition>,
    pub asset_checks: Vec<AssetCheckDefinition>,
    pub jobs: Vec<JobSummary>,
    pub schedules: Vec<ScheduleSummary>,
    pub sensors: Vec<SensorSummary>,
    pub resources: BTreeMap<String, ResourceDefinition>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub name: String,
    /// False for jobs only reachable through a schedule or sensor.
    pub explicit: bool,
    pub assets: Vec<String>,
    /// Set when the selection names unregistered assets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSummary {
    pub name: String,
    pub cron_schedule: String,
    pub job: String,
    pub default_status: DefaultStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorSummary {
    pub name: String,
    pub job: String,
    pub minimum_interval_seconds: u64,
    pub default_status: DefaultStatus,
    pub evaluator: &'static str,
}
