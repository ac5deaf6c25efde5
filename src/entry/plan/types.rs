use crate::app::RunSettings;
use crate::args::OutputFormat;
use crate::scenario::PvzSettings;

/// A fully validated run: defaults filled in, profile and thresholds parsed.
pub(in crate::entry) struct RunPlan {
    pub(super) run: RunSettings,
    pub(super) scenario: PvzSettings,
    pub(super) summary_export: Option<String>,
    pub(super) output_format: OutputFormat,
    pub(super) no_color: bool,
}
