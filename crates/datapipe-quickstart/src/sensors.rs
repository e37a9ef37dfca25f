//! Ad-hoc report requests dropped as JSON files into a directory.

use datapipe_core::{
    AssetSelection, ExecutionError, JobDefinition, RunRequest, SensorContext, SensorDefinition,
    SensorEvaluator, SensorResult,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Directory scanned for request files, relative to the working directory.
pub const REQUESTS_DIR: &str = "data/requests";

pub fn adhoc_request_job() -> JobDefinition {
    JobDefinition::new("adhoc_request_job", AssetSelection::keys(["adhoc_request"]))
        .with_description("Answer one ad-hoc sales report request")
}

pub fn adhoc_request_sensor() -> SensorDefinition {
    adhoc_request_sensor_in(REQUESTS_DIR)
}

pub fn adhoc_request_sensor_in(requests_dir: impl Into<PathBuf>) -> SensorDefinition {
    SensorDefinition::new(
        "adhoc_request_sensor",
        adhoc_request_job(),
        AdhocRequestSensor::new(requests_dir),
    )
    .with_description("Requests one adhoc_request run per new or modified request file")
}

/// Cursor: request file name to modification time (nanoseconds since epoch).
type FileState = BTreeMap<String, u64>;

/// Emits a run for each `*.json` file that is new or changed since the
/// previous tick.
pub struct AdhocRequestSensor {
    requests_dir: PathBuf,
}

impl AdhocRequestSensor {
    pub fn new(requests_dir: impl Into<PathBuf>) -> Self {
        Self {
            requests_dir: requests_dir.into(),
        }
    }
}

impl SensorEvaluator for AdhocRequestSensor {
    fn name(&self) -> &'static str {
        "adhoc_request_files"
    }

    fn evaluate(
        &self,
        ctx: &SensorContext,
        job: &JobDefinition,
    ) -> Result<SensorResult, ExecutionError> {
        let previous: FileState = match ctx.cursor.as_deref() {
            Some(cursor) if !cursor.is_empty() => serde_json::from_str(cursor)?,
            _ => FileState::new(),
        };

        let mut entries = fs::read_dir(&self.requests_dir)?.collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut current = FileState::new();
        let mut run_requests = Vec::new();

        for entry in entries {
            let filename = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            if !filename.ends_with(".json") || !path.is_file() {
                continue;
            }

            let last_modified = modified_nanos(&path)?;
            current.insert(filename.clone(), last_modified);

            if previous.get(&filename) == Some(&last_modified) {
                continue;
            }

            let request_config: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(&path)?)?;
            tracing::info!(file = %filename, last_modified, "New ad-hoc request");

            run_requests.push(RunRequest {
                run_key: format!("adhoc_request_{}_{}", filename, last_modified),
                job_name: job.name.clone(),
                run_config: json!({
                    "ops": {
                        "adhoc_request": { "config": request_config }
                    }
                }),
            });
        }

        Ok(SensorResult {
            run_requests,
            cursor: Some(serde_json::to_string(&current)?),
        })
    }
}

fn modified_nanos(path: &Path) -> Result<u64, ExecutionError> {
    let modified = fs::metadata(path)?.modified()?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ExecutionError::Sensor(format!("{}: {}", path.display(), e)))?;
    Ok(since_epoch.as_nanos() as u64)
}
