//! System prompts for the classification service.

use docroute_core::types::AnalysisContext;

/// Routing prompt: decides INBOX vs ARCHIVE and names the topic.
pub const ROUTING_PROMPT: &str = r#"You route incoming business correspondence for a compliance platform.
Decide whether the document needs the user's attention (INBOX) or can be filed
automatically (ARCHIVE). Documents that go to the INBOX get a short topic.

Channels are fixed, never invent new ones:
TAX, KVK, LEGAL_COMPLIANCE, PERMITS_LICENSES, BANKING_FINANCIAL,
EMPLOYMENT_PAYROLL, INTELLECTUAL_PROPERTY, GENERAL_ACTIONABLE, ARCHIVE.

Route to INBOX: filing or payment reminders, assessments and corrections,
penalties, requests for information from authorities, registration or
ownership updates, permit renewals, bank compliance requests, and every
payment reminder or overdue notice (BANKING_FINANCIAL), even when it looks
like an invoice.

Route to ARCHIVE: plain invoices and receipts, bank statements, insurance
policies, certificates, informational letters, contracts without an
immediate action, and anything where you cannot name the action the user
must take in one sentence.

Mark urgency HIGH when the document has a deadline, a penalty, explicit
"action required" wording, or comes from a government body, tax authority,
bank or regulator.

Answer with a single JSON object and nothing else:
{
  "channel": "one of the channels above",
  "topic_type": "short category such as VAT, CIT, Payroll Tax, UBO/Ownership Updates, or null",
  "topic_title": "short title with period when relevant such as Q1 2024 VAT, or null",
  "routing": "INBOX | ARCHIVE",
  "urgency": "HIGH | MEDIUM | LOW",
  "deadline": "YYYY-MM-DD or null",
  "authority": "sender or authority name",
  "reasoning": "one sentence on why"
}"#;

/// Analysis prompt: explains one document and lists required actions.
pub const ANALYSIS_PROMPT: &str = r#"You are a compliance assistant analysing one official business or
government letter. Explain what it means and what the company must do.

Use only the document. Do not invent actions or give generic advice; every
action must be justified by the text. Include exact dates and amounts when
present and order actions by priority. If nothing is required, say so.

Answer with a single JSON object and nothing else:
{
  "language": "detected language",
  "document_type": "specific document type",
  "summary": "what the letter means, who sent it and why it matters",
  "key_details": {
    "authority": "issuing authority or null",
    "reference": "reference number or null",
    "amount": "amount or null",
    "deadline": "YYYY-MM-DD or null",
    "period": "relevant period or null"
  },
  "required_actions": [
    { "action": "exact action with amounts and dates", "priority": 1 }
  ],
  "risk_if_ignored": "consequence stated or implied by the document"
}"#;

/// User message for an analysis request.
pub fn analysis_message(text: &str, context: &AnalysisContext) -> String {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "None".to_string());
    format!(
        "Channel: {}\nTopic Type: {}\nTopic Title: {}\n\nDocument text to analyze:\n{}\n\n\
         Provide a detailed analysis with specific actionable items for this topic.",
        field(&context.channel),
        field(&context.topic_type),
        field(&context.topic_title),
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_message_includes_context() {
        let context = AnalysisContext {
            channel: Some("TAX".into()),
            topic_type: None,
            topic_title: Some("Q1 2024 VAT".into()),
        };
        let message = analysis_message("Pay EUR 120 by 30 April.", &context);
        assert!(message.starts_with("Channel: TAX\nTopic Type: None\nTopic Title: Q1 2024 VAT"));
        assert!(message.contains("Pay EUR 120 by 30 April."));
    }

    #[test]
    fn test_prompts_demand_json() {
        assert!(ROUTING_PROMPT.contains("\"routing\""));
        assert!(ANALYSIS_PROMPT.contains("\"summary\""));
    }
}
