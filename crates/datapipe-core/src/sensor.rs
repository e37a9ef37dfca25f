//! Sensors: cursor-driven evaluators that request job runs.
//!
//! The host owns the polling loop. A sensor only turns a cursor into run
//! requests plus the next cursor, one tick at a time.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ExecutionError;
use crate::job::JobDefinition;
use crate::schedule::DefaultStatus;

/// Default minimum seconds between two ticks of a sensor.
pub const DEFAULT_MINIMUM_INTERVAL_SECONDS: u64 = 30;

/// Input of one sensor tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorContext {
    pub sensor_name: String,

    /// Cursor returned by the previous tick, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl SensorContext {
    pub fn new(sensor_name: impl Into<String>, cursor: Option<String>) -> Self {
        Self {
            sensor_name: sensor_name.into(),
            cursor,
        }
    }
}

/// Request for the host to launch one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Idempotency key; the host skips keys it has already launched.
    pub run_key: String,
    pub job_name: String,
    #[serde(default)]
    pub run_config: serde_json::Value,
}

/// Output of one sensor tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorResult {
    pub run_requests: Vec<RunRequest>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Evaluation logic behind a sensor.
pub trait SensorEvaluator: Send + Sync {
    /// Stable name of the evaluator implementation.
    fn name(&self) -> &'static str;

    /// Run one tick. `job` is the sensor's target job.
    fn evaluate(
        &self,
        ctx: &SensorContext,
        job: &JobDefinition,
    ) -> Result<SensorResult, ExecutionError>;
}

/// A sensor registered with the definitions.
#[derive(Clone)]
pub struct SensorDefinition {
    pub name: String,
    pub job: JobDefinition,
    pub minimum_interval_seconds: u64,
    pub description: Option<String>,
    pub default_status: DefaultStatus,
    evaluator: Arc<dyn SensorEvaluator>,
}

impl SensorDefinition {
    pub fn new<E>(name: impl Into<String>, job: JobDefinition, evaluator: E) -> Self
    where
        E: SensorEvaluator + 'static,
    {
        Self {
            name: name.into(),
            job,
            minimum_interval_seconds: DEFAULT_MINIMUM_INTERVAL_SECONDS,
            description: None,
            default_status: DefaultStatus::default(),
            evaluator: Arc::new(evaluator),
        }
    }

    pub fn with_minimum_interval(mut self, seconds: u64) -> Self {
        self.minimum_interval_seconds = seconds;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn evaluator_name(&self) -> &'static str {
        self.evaluator.name()
    }

    /// Run one tick with the given cursor.
    pub fn evaluate(&self, cursor: Option<String>) -> Result<SensorResult, ExecutionError> {
        let ctx = SensorContext::new(self.name.clone(), cursor);
        tracing::debug!(
            sensor = %self.name,
            evaluator = self.evaluator.name(),
            has_cursor = ctx.cursor.is_some(),
            "Evaluating sensor tick"
        );
        let result = self.evaluator.evaluate(&ctx, &self.job)?;
        tracing::debug!(
            sensor = %self.name,
            run_requests = result.run_requests.len(),
            "Sensor tick complete"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for SensorDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorDefinition")
            .field("name", &self.name)
            .field("job", &self.job.name)
            .field("minimum_interval_seconds", &self.minimum_interval_seconds)
            .field("description", &self.description)
            .field("default_status", &self.default_status)
            .field("evaluator", &self.evaluator.name())
            .finish()
    }
}

// Evaluators compare by name.
impl PartialEq for SensorDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.job == other.job
            && self.minimum_interval_seconds == other.minimum_interval_seconds
            && self.description == other.description
            && self.default_status == other.default_status
            && self.evaluator.name() == other.evaluator.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::AssetSelection;

    struct CursorEcho;

    impl SensorEvaluator for CursorEcho {
        fn name(&self) -> &'static str {
            "cursor_echo"
        }

        fn evaluate(
            &self,
            ctx: &SensorContext,
            job: &JobDefinition,
        ) -> Result<SensorResult, ExecutionError> {
            let next = ctx.cursor.clone().unwrap_or_default() + "x";
            Ok(SensorResult {
                run_requests: vec![RunRequest {
                    run_key: next.clone(),
                    job_name: job.name.clone(),
                    run_config: serde_json::json!({}),
                }],
                cursor: Some(next),
            })
        }
    }

    fn sensor() -> SensorDefinition {
        SensorDefinition::new(
            "echo_sensor",
            JobDefinition::new("echo_job", AssetSelection::All),
            CursorEcho,
        )
    }

    #[test]
    fn test_sensor_defaults() {
        let sensor = sensor();
        assert_eq!(sensor.minimum_interval_seconds, DEFAULT_MINIMUM_INTERVAL_SECONDS);
        assert_eq!(sensor.default_status, DefaultStatus::Stopped);
        assert_eq!(sensor.evaluator_name(), "cursor_echo");
    }

    #[test]
    fn test_sensor_evaluate_threads_cursor() {
        let sensor = sensor();
        let first = sensor.evaluate(None).unwrap();
        assert_eq!(first.cursor.as_deref(), Some("x"));
        assert_eq!(first.run_requests[0].job_name, "echo_job");

        let second = sensor.evaluate(first.cursor).unwrap();
        assert_eq!(second.cursor.as_deref(), Some("xx"));
    }

    #[test]
    fn test_sensor_equality_ignores_evaluator_instance() {
        assert_eq!(sensor(), sensor());
        assert_ne!(sensor(), sensor().with_minimum_interval(5));
    }
}
