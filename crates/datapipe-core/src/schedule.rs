//! Cron schedules targeting a job.

use serde::{Deserialize, Serialize};

use crate::job::JobDefinition;

/// Whether a schedule or sensor starts running when first loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DefaultStatus {
    Running,
    #[default]
    Stopped,
}

/// Runs a job on a cron expression.
///
/// The cron string is evaluated by the host scheduler; it is stored verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    pub name: String,
    pub cron_schedule: String,
    pub job: JobDefinition,

    #[serde(default)]
    pub default_status: DefaultStatus,
}

impl ScheduleDefinition {
    pub fn new(name: impl Into<String>, cron_schedule: impl Into<String>, job: JobDefinition) -> Self {
        Self {
            name: name.into(),
            cron_schedule: cron_schedule.into(),
            job,
            default_status: DefaultStatus::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::AssetSelection;

    #[test]
    fn test_schedule_defaults() {
        let job = JobDefinition::new("nightly", AssetSelection::All);
        let schedule = ScheduleDefinition::new("nightly_schedule", "0 0 * * *", job);
        assert_eq!(schedule.default_status, DefaultStatus::Stopped);
    }

    #[test]
    fn test_default_status_serialization() {
        let json = serde_json::to_string(&DefaultStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }
}
