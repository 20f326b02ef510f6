//! Job domain entities.

pub mod descriptor;
pub mod model;
pub mod outcome;
pub mod payload;
pub mod status;
pub mod view;

pub use descriptor::{FileDescriptor, FileLocator};
pub use model::{Job, NewJob, progress_percent};
pub use outcome::{FileOutcome, JobSummary, OutcomeStatus};
pub use payload::{FilePayload, InlineFileEntry, StoredFileEntry};
pub use status::{JobKind, JobState};
pub use view::JobStatusView;
