//! Recurring refresh of the analysis assets.

use datapipe_core::{AssetSelection, JobDefinition, ScheduleDefinition};

/// Every Monday at midnight.
pub const WEEKLY_CRON: &str = "0 0 * * 1";

pub fn analysis_update_job() -> JobDefinition {
    JobDefinition::new(
        "analysis_update_job",
        AssetSelection::keys(["joined_data", "monthly_sales_performance", "product_performance"]),
    )
    .with_description("Rebuild the joined view and both sales reports")
}

pub fn weekly_update_schedule() -> ScheduleDefinition {
    ScheduleDefinition::new("weekly_update_schedule", WEEKLY_CRON, analysis_update_job())
}
