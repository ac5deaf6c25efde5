use std::sync::Arc;

use crate::app::{export_summary, print_summary, run_scenario};
use crate::error::{AppError, AppResult, ValidationError};
use crate::scenario::PvzScenario;

use super::types::RunPlan;

pub(crate) async fn execute_plan(plan: RunPlan) -> AppResult<()> {
    let scenario = Arc::new(PvzScenario::new(plan.scenario));
    let outcome = run_scenario(scenario, plan.run).await?;

    print_summary(&outcome.summary, plan.output_format, plan.no_color)?;
    if let Some(path) = plan.summary_export.as_deref() {
        export_summary(path, &outcome.summary).await?;
    }

    if outcome.failed_thresholds > 0 {
        tracing::error!("{} threshold(s) failed", outcome.failed_thresholds);
        return Err(AppError::validation(ValidationError::ThresholdsFailed {
            count: outcome.failed_thresholds,
        }));
    }
    Ok(())
}
