//! Structured analysis of each document.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use docroute_core::traits::{ClassifyError, Classifier};
use docroute_core::types::AnalysisContext;
use docroute_entity::job::{FileDescriptor, FileOutcome, JobKind};

use crate::executor::JobHandler;
use crate::retry::RetryPolicy;

/// Analysis recorded when the service could not produce one.
pub fn fallback_analysis() -> Value {
    json!({
        "summary": "Failed to analyze this topic",
        "key_data": {},
        "actionable_items": [
            {
                "type": "ai_chat",
                "action": "ask_general_ai",
                "label": "Ask AI for Guidance",
                "priority": 1
            }
        ],
        "risk_if_ignored": "Unable to determine - please review manually",
        "status": "OPEN"
    })
}

/// First `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Handles analyze jobs
#[derive(Debug)]
pub struct AnalyzeJobHandler {
    classifier: Arc<dyn Classifier>,
    retry: RetryPolicy,
    timeout: Duration,
    excerpt_chars: usize,
}

impl AnalyzeJobHandler {
    /// Create a new analyze job handler
    pub fn new(
        classifier: Arc<dyn Classifier>,
        retry: RetryPolicy,
        timeout: Duration,
        excerpt_chars: usize,
    ) -> Self {
        Self {
            classifier,
            retry,
            timeout,
            excerpt_chars,
        }
    }

    async fn analyze_once(&self, text: &str, context: &AnalysisContext) -> Result<Value, ClassifyError> {
        match tokio::time::timeout(self.timeout, self.classifier.analyze(text, context)).await {
            Ok(result) => result,
            Err(_) => Err(ClassifyError::Timeout),
        }
    }
}

#[async_trait]
impl JobHandler for AnalyzeJobHandler {
    fn kind(&self) -> JobKind {
        JobKind::Analyze
    }

    async fn handle_file(&self, descriptor: &FileDescriptor, text: &str) -> FileOutcome {
        let context = AnalysisContext::default();
        let result = self
            .retry
            .run(
                "analyze",
                |_| self.analyze_once(text, &context),
                ClassifyError::is_transient,
            )
            .await;
        let preview = excerpt(text, self.excerpt_chars);

        match result {
            Ok(analysis) => FileOutcome::analyzed(&descriptor.filename, analysis, preview, false),
            Err(e @ ClassifyError::Rejected(_)) => {
                tracing::warn!("Analysis of '{}' rejected: {}", descriptor.filename, e);
                self.failed_outcome(&descriptor.filename, &format!("Analysis failed: {e}"))
            }
            Err(e) => {
                tracing::warn!(
                    "Analysis of '{}' failed, using fallback: {}",
                    descriptor.filename,
                    e
                );
                FileOutcome::analyzed(&descriptor.filename, fallback_analysis(), preview, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docroute_core::config::BackoffConfig;
    use docroute_core::types::RoutingDecision;
    use docroute_entity::job::FileLocator;

    #[derive(Debug)]
    struct Unreachable;

    #[async_trait]
    impl Classifier for Unreachable {
        async fn classify(&self, _text: &str) -> Result<RoutingDecision, ClassifyError> {
            Err(ClassifyError::Transport("down".into()))
        }

        async fn analyze(&self, _text: &str, _context: &AnalysisContext) -> Result<Value, ClassifyError> {
            Err(ClassifyError::Upstream {
                status: 503,
                message: "unavailable".into(),
            })
        }
    }

    #[derive(Debug)]
    struct Summarizer;

    #[async_trait]
    impl Classifier for Summarizer {
        async fn classify(&self, _text: &str) -> Result<RoutingDecision, ClassifyError> {
            Err(ClassifyError::Rejected("not used".into()))
        }

        async fn analyze(&self, text: &str, context: &AnalysisContext) -> Result<Value, ClassifyError> {
            assert!(context.channel.is_none());
            Ok(json!({ "summary": format!("{} chars", text.chars().count()) }))
        }
    }

    fn descriptor() -> FileDescriptor {
        FileDescriptor::new("report.txt", FileLocator::Url("https://files.example/report.txt".into()), None, None, None)
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo wörld", 4), "héll");
        assert_eq!(excerpt("short", 100), "short");
        assert_eq!(excerpt("abc", 0), "");
    }

    #[tokio::test]
    async fn test_analysis_with_excerpt() {
        let handler = AnalyzeJobHandler::new(
            Arc::new(Summarizer),
            RetryPolicy::once(),
            Duration::from_secs(5),
            5,
        );
        let outcome = handler.handle_file(&descriptor(), "quarterly numbers").await;
        assert!(outcome.is_success());
        assert!(!outcome.defaulted);
        assert_eq!(outcome.extracted_text.as_deref(), Some("quart"));
        assert_eq!(outcome.classification.unwrap()["summary"], "17 chars");
        assert!(outcome.routing.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service_uses_fallback() {
        let handler = AnalyzeJobHandler::new(
            Arc::new(Unreachable),
            RetryPolicy::new(2, BackoffConfig::None),
            Duration::from_secs(5),
            1000,
        );
        let outcome = handler.handle_file(&descriptor(), "text").await;
        assert!(outcome.is_success());
        assert!(outcome.defaulted);
        let analysis = outcome.classification.unwrap();
        assert_eq!(analysis["summary"], "Failed to analyze this topic");
        assert_eq!(analysis["actionable_items"][0]["action"], "ask_general_ai");
        assert_eq!(analysis["status"], "OPEN");
    }
}
