//! OpenAI-compatible chat-completions client.
//!
//! Both calls send a system prompt plus the document text with
//! `response_format = json_object` and expect a single JSON object back.
//! HTTP failures are mapped onto [`ClassifyError`] so the caller can decide
//! whether to retry: 408, 429 and 5xx are upstream hiccups, any other 4xx
//! means the service refused the input.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use docroute_core::config::ClassifierConfig;
use docroute_core::error::{AppError, ErrorKind};
use docroute_core::result::AppResult;
use docroute_core::traits::{ClassifyError, Classifier};
use docroute_core::types::{AnalysisContext, RoutingDecision};

use crate::prompts::{ANALYSIS_PROMPT, ROUTING_PROMPT, analysis_message};

/// Characters of an error body kept in error messages.
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Classifier backed by an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiClassifier {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiClassifier {
    /// Build a client from the classifier section of the configuration.
    pub fn new(config: &ClassifierConfig) -> AppResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::configuration(
                "classifier.api_key is not set (DOCROUTE__CLASSIFIER__API_KEY)",
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        info!(model = %config.model, "Classification client ready");
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    async fn complete(&self, system: &str, user: &str) -> Result<Value, ClassifyError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                r#type: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport)?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        parse_completion(&body)
    }
}

fn map_transport(e: reqwest::Error) -> ClassifyError {
    if e.is_timeout() {
        ClassifyError::Timeout
    } else {
        ClassifyError::Transport(e.to_string())
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

fn status_error(status: StatusCode, body: &str) -> ClassifyError {
    let retryable = status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error();
    if retryable {
        ClassifyError::Upstream {
            status: status.as_u16(),
            message: excerpt(body),
        }
    } else {
        ClassifyError::Rejected(format!("{status}: {}", excerpt(body)))
    }
}

/// Pull the JSON object out of a chat-completions response body.
fn parse_completion(body: &str) -> Result<Value, ClassifyError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ClassifyError::Malformed(format!("invalid response envelope: {e}")))?;
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| ClassifyError::Malformed("response has no choices".into()))?;

    if let Some(refusal) = message.refusal.filter(|r| !r.trim().is_empty()) {
        return Err(ClassifyError::Rejected(refusal));
    }
    let content = message
        .content
        .ok_or_else(|| ClassifyError::Malformed("response has no content".into()))?;
    debug!(content = %content, "Classification service response");

    let value: Value = serde_json::from_str(content.trim())
        .map_err(|e| ClassifyError::Malformed(format!("content is not JSON: {e}")))?;
    if !value.is_object() {
        return Err(ClassifyError::Malformed("content is not a JSON object".into()));
    }
    Ok(value)
}

fn routing_decision(value: Value) -> Result<RoutingDecision, ClassifyError> {
    if value.get("channel").is_none() || value.get("routing").is_none() {
        return Err(ClassifyError::Malformed(
            "routing response lacks channel or routing".into(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| ClassifyError::Malformed(format!("unexpected routing format: {e}")))
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, text: &str) -> Result<RoutingDecision, ClassifyError> {
        let value = self.complete(ROUTING_PROMPT, text).await?;
        let decision = routing_decision(value)?;
        debug!(routing = %decision.routing, channel = %decision.channel, "Document routed");
        Ok(decision)
    }

    async fn analyze(&self, text: &str, context: &AnalysisContext) -> Result<Value, ClassifyError> {
        let value = self
            .complete(ANALYSIS_PROMPT, &analysis_message(text, context))
            .await?;
        if value.get("summary").is_none() {
            return Err(ClassifyError::Malformed(
                "analysis response lacks a summary".into(),
            ));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docroute_core::types::Routing;

    fn envelope(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[test]
    fn test_parse_routing_response() {
        let body = envelope(r#"{"channel":"TAX","routing":"INBOX","urgency":"HIGH"}"#);
        let decision = routing_decision(parse_completion(&body).unwrap()).unwrap();
        assert_eq!(decision.routing, Routing::Inbox);
        assert_eq!(decision.channel, "TAX");
    }

    #[test]
    fn test_malformed_responses() {
        assert!(matches!(
            parse_completion("not json"),
            Err(ClassifyError::Malformed(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#),
            Err(ClassifyError::Malformed(_))
        ));
        assert!(matches!(
            parse_completion(&envelope("here you go: {")),
            Err(ClassifyError::Malformed(_))
        ));

        let missing = parse_completion(&envelope(r#"{"channel":"TAX"}"#)).unwrap();
        assert!(matches!(routing_decision(missing), Err(ClassifyError::Malformed(_))));

        let bad_routing = parse_completion(&envelope(r#"{"channel":"TAX","routing":"MAYBE"}"#)).unwrap();
        assert!(matches!(routing_decision(bad_routing), Err(ClassifyError::Malformed(_))));
    }

    #[test]
    fn test_refusal_is_rejection() {
        let body = serde_json::json!({
            "choices": [{"message": {"content": null, "refusal": "I can't help with that."}}]
        })
        .to_string();
        let err = parse_completion(&body).unwrap_err();
        assert!(matches!(err, ClassifyError::Rejected(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            ClassifyError::Upstream { status: 429, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, ""),
            ClassifyError::Upstream { status: 502, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::REQUEST_TIMEOUT, ""),
            ClassifyError::Upstream { status: 408, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "context length exceeded"),
            ClassifyError::Rejected(_)
        ));
    }

    #[test]
    fn test_missing_api_key() {
        let err = OpenAiClassifier::new(&ClassifierConfig::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
