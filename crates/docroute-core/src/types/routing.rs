//! Routing decisions returned by the classification service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a classified document lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Routing {
    /// Needs attention; shown in the inbox with a topic.
    Inbox,
    /// Auto-filed without user action.
    Archive,
}

impl Routing {
    /// Return the routing as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbox => "INBOX",
            Self::Archive => "ARCHIVE",
        }
    }
}

impl fmt::Display for Routing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured decision produced by the classification service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Inbox vs. archive.
    pub routing: Routing,
    /// Channel name, e.g. `TAX` or `ARCHIVE`.
    pub channel: String,
    /// Topic type within the channel.
    #[serde(default)]
    pub topic_type: Option<String>,
    /// Human-readable topic title.
    #[serde(default)]
    pub topic_title: Option<String>,
    /// Urgency label (`LOW`, `MEDIUM`, `HIGH`).
    #[serde(default)]
    pub urgency: Option<String>,
    /// Deadline mentioned in the document, if any.
    #[serde(default)]
    pub deadline: Option<String>,
    /// Issuing authority.
    #[serde(default)]
    pub authority: Option<String>,
    /// Model explanation of the decision.
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl RoutingDecision {
    /// The conservative decision used when the service cannot be reached:
    /// file the document to the archive with low urgency.
    pub fn safe_default(reasoning: impl Into<String>) -> Self {
        Self {
            routing: Routing::Archive,
            channel: Routing::Archive.as_str().to_string(),
            topic_type: None,
            topic_title: None,
            urgency: Some("LOW".to_string()),
            deadline: None,
            authority: None,
            reasoning: Some(reasoning.into()),
        }
    }
}

/// Optional context passed along with an analysis request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Channel the document was routed to.
    pub channel: Option<String>,
    /// Topic type.
    pub topic_type: Option<String>,
    /// Topic title.
    pub topic_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_parses_service_output() {
        let raw = r#"{
            "channel": "TAX",
            "routing": "INBOX",
            "topic_type": "VAT Filing Reminder",
            "topic_title": "Q1 2024 VAT",
            "urgency": "HIGH",
            "deadline": "2024-04-30",
            "authority": "Belastingdienst",
            "reasoning": "Filing reminder with deadline"
        }"#;
        let decision: RoutingDecision = serde_json::from_str(raw).unwrap();
        assert_eq!(decision.routing, Routing::Inbox);
        assert_eq!(decision.topic_title.as_deref(), Some("Q1 2024 VAT"));
    }

    #[test]
    fn test_missing_optional_fields() {
        let decision: RoutingDecision =
            serde_json::from_str(r#"{"channel": "ARCHIVE", "routing": "ARCHIVE"}"#).unwrap();
        assert_eq!(decision.routing, Routing::Archive);
        assert!(decision.reasoning.is_none());
    }

    #[test]
    fn test_safe_default_routes_to_archive() {
        let decision = RoutingDecision::safe_default("service unavailable");
        assert_eq!(decision.routing, Routing::Archive);
        assert_eq!(decision.channel, "ARCHIVE");
        assert_eq!(decision.urgency.as_deref(), Some("LOW"));
    }
}
