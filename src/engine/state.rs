use crate::pipeline::UpdateReport;
use crate::resolver::ModSummary;

// How a `check` run ended.
#[derive(Clone, Debug)]
pub enum CheckOutcome {
    /// The check interval had not elapsed and the user did not force a check.
    NotDue { days_since: i64 },
    NoModFiles,
    NothingHashed,
    UpToDate { summary: Vec<ModSummary> },
    DryRun { summary: Vec<ModSummary> },
    Declined,
    Applied(UpdateReport),
}

// Switches supplied from the command line for one `check` run.
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckOptions {
    pub force: bool,
    pub assume_yes: bool,
    pub dry_run: bool,
}
