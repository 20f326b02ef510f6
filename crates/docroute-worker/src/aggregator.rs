//! Folds per-file outcomes into the job summary.

use std::time::Duration;

use docroute_core::types::Routing;
use docroute_entity::job::{FileOutcome, JobKind, JobSummary, OutcomeStatus};

/// Build the summary of a job from its outcomes, kept in submission order.
///
/// For classify jobs every file counts toward exactly one of inbox and
/// archive; error outcomes are archived.
pub fn aggregate(kind: JobKind, outcomes: Vec<FileOutcome>, elapsed: Duration) -> JobSummary {
    let successful = outcomes.iter().filter(|o| o.is_success()).count();
    let failed = outcomes.len() - successful;
    let defaulted = outcomes.iter().filter(|o| o.is_success() && o.defaulted).count();

    let (inbox_count, archive_count) = match kind {
        JobKind::Classify => {
            let inbox = outcomes
                .iter()
                .filter(|o| o.status == OutcomeStatus::Success && o.routing == Some(Routing::Inbox))
                .count();
            (Some(inbox), Some(outcomes.len() - inbox))
        }
        JobKind::Analyze => (None, None),
    };

    JobSummary {
        total_files: outcomes.len(),
        successful,
        failed,
        defaulted,
        inbox_count,
        archive_count,
        results: outcomes,
        processing_time: elapsed.as_secs_f64(),
    }
}
