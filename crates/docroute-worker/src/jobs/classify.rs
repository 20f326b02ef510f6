//! Inbox/archive routing of each document.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use docroute_core::traits::{ClassifyError, Classifier};
use docroute_core::types::{Routing, RoutingDecision};
use docroute_entity::job::{FileDescriptor, FileOutcome, JobKind};

use crate::executor::JobHandler;
use crate::retry::RetryPolicy;

/// Reasoning recorded on the safe default.
pub const SAFE_DEFAULT_REASONING: &str = "All classification attempts failed - routing to archive";

/// Handles classify jobs
#[derive(Debug)]
pub struct ClassifyJobHandler {
    /// Classification service
    classifier: Arc<dyn Classifier>,
    /// Attempts per file
    retry: RetryPolicy,
    /// Deadline for one classification call
    timeout: Duration,
}

impl ClassifyJobHandler {
    /// Create a new classify job handler
    pub fn new(classifier: Arc<dyn Classifier>, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            classifier,
            retry,
            timeout,
        }
    }

    async fn classify_once(&self, text: &str) -> Result<RoutingDecision, ClassifyError> {
        match tokio::time::timeout(self.timeout, self.classifier.classify(text)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifyError::Timeout),
        }
    }
}

#[async_trait]
impl JobHandler for ClassifyJobHandler {
    fn kind(&self) -> JobKind {
        JobKind::Classify
    }

    async fn handle_file(&self, descriptor: &FileDescriptor, text: &str) -> FileOutcome {
        let result = self
            .retry
            .run(
                "classify",
                |_| self.classify_once(text),
                ClassifyError::is_transient,
            )
            .await;

        match result {
            Ok(decision) => {
                tracing::debug!(
                    "Classified '{}' as {} ({})",
                    descriptor.filename,
                    decision.routing,
                    decision.channel
                );
                FileOutcome::classified(&descriptor.filename, &decision, false)
            }
            Err(e @ ClassifyError::Rejected(_)) => {
                tracing::warn!("Classification of '{}' rejected: {}", descriptor.filename, e);
                self.failed_outcome(&descriptor.filename, &format!("Classification failed: {e}"))
            }
            Err(e) => {
                tracing::warn!(
                    "Classification of '{}' failed after {} attempts, using safe default: {}",
                    descriptor.filename,
                    self.retry.max_attempts(),
                    e
                );
                let decision = RoutingDecision::safe_default(SAFE_DEFAULT_REASONING);
                FileOutcome::classified(&descriptor.filename, &decision, true)
            }
        }
    }

    /// Unprocessable files of a classify job are filed to the archive.
    fn failed_outcome(&self, filename: &str, error: &str) -> FileOutcome {
        let mut outcome = FileOutcome::failed(filename, error);
        outcome.routing = Some(Routing::Archive);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docroute_core::config::BackoffConfig;
    use docroute_core::types::AnalysisContext;
    use docroute_entity::job::{FileLocator, OutcomeStatus};
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Scripted {
        calls: AtomicU32,
        error: Option<ClassifyError>,
        stall: bool,
    }

    impl Scripted {
        fn new(error: Option<ClassifyError>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                error,
                stall: false,
            }
        }
    }

    #[async_trait]
    impl Classifier for Scripted {
        async fn classify(&self, _text: &str) -> Result<RoutingDecision, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.stall {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            match &self.error {
                Some(e) => Err(e.clone()),
                None => Ok(RoutingDecision {
                    routing: Routing::Inbox,
                    channel: "TAX".into(),
                    topic_type: Some("VAT Filing Reminder".into()),
                    topic_title: None,
                    urgency: Some("HIGH".into()),
                    deadline: None,
                    authority: None,
                    reasoning: None,
                }),
            }
        }

        async fn analyze(&self, _text: &str, _context: &AnalysisContext) -> Result<Value, ClassifyError> {
            Err(ClassifyError::Rejected("not used".into()))
        }
    }

    fn descriptor() -> FileDescriptor {
        FileDescriptor::new(
            "letter.txt",
            FileLocator::StoragePath("jobs/letter.txt".into()),
            None,
            None,
            None,
        )
    }

    fn handler(classifier: Arc<Scripted>) -> ClassifyJobHandler {
        ClassifyJobHandler::new(
            classifier,
            RetryPolicy::new(3, BackoffConfig::None),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_successful_classification() {
        let classifier = Arc::new(Scripted::new(None));
        let outcome = handler(Arc::clone(&classifier))
            .handle_file(&descriptor(), "VAT due")
            .await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.routing, Some(Routing::Inbox));
        assert!(!outcome.defaulted);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_use_safe_default() {
        let classifier = Arc::new(Scripted::new(Some(ClassifyError::Transport(
            "connection refused".into(),
        ))));
        let outcome = handler(Arc::clone(&classifier))
            .handle_file(&descriptor(), "text")
            .await;
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 3);
        assert!(outcome.is_success());
        assert!(outcome.defaulted);
        assert_eq!(outcome.routing, Some(Routing::Archive));
        let reasoning = outcome.classification.as_ref().unwrap()["reasoning"].clone();
        assert_eq!(reasoning, SAFE_DEFAULT_REASONING);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let classifier = Arc::new(Scripted::new(Some(ClassifyError::Rejected(
            "content policy".into(),
        ))));
        let outcome = handler(Arc::clone(&classifier))
            .handle_file(&descriptor(), "text")
            .await;
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!(outcome.routing, Some(Routing::Archive));
        assert!(outcome.error.unwrap().contains("content policy"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_call_times_out_per_attempt() {
        let classifier = Arc::new(Scripted {
            calls: AtomicU32::new(0),
            error: None,
            stall: true,
        });
        let outcome = handler(Arc::clone(&classifier))
            .handle_file(&descriptor(), "text")
            .await;
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 3);
        assert!(outcome.defaulted);
    }
}
