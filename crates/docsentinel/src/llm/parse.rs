//! Defensive parsing of model output into normalized findings.
//!
//! The model is asked for a JSON array but real responses drift: markdown
//! fences, an object wrapping the array, bare prose. Everything normalizes
//! here; downstream stages only ever see [`Finding`] values.

use serde::Deserialize;

use crate::finding::{Finding, FindingKind, Provenance, Severity};
use crate::llm::prompt::truncate_chars;

/// One item as the model reports it, before normalization.
#[derive(Debug, Deserialize)]
struct RawFinding {
    #[serde(default)]
    category: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    suggestion: String,
    #[serde(default)]
    old_text: Option<String>,
    #[serde(default)]
    new_text: Option<String>,
    #[serde(default)]
    old_doc: String,
    #[serde(default)]
    doc_id: String,
}

#[derive(Debug, Deserialize)]
struct WrappedFindings {
    contradictions: Vec<RawFinding>,
}

/// Parses a raw model response into contradiction findings.
///
/// Accepts a JSON array, an object with a `contradictions` key, or — as a
/// last resort — wraps the raw text in a single low-confidence analysis
/// finding rather than dropping the response.
pub fn parse_findings(raw: &str) -> Vec<Finding> {
    let clean = strip_code_fences(raw);

    if let Ok(items) = serde_json::from_str::<Vec<RawFinding>>(clean) {
        return items.into_iter().map(normalize).collect();
    }

    if let Ok(wrapped) = serde_json::from_str::<WrappedFindings>(clean) {
        return wrapped.contradictions.into_iter().map(normalize).collect();
    }

    log::warn!("Model returned non-JSON output; storing as raw analysis text");
    vec![Finding {
        kind: FindingKind::Contradiction,
        category: "AI analysis".to_string(),
        severity: Severity::Info,
        message: truncate_chars(clean, 200).to_string(),
        suggestion: String::new(),
        old_text: None,
        new_text: Some(clean.to_string()),
        source_doc: String::new(),
        doc_id: String::new(),
        provenance: Provenance::Model,
    }]
}

fn normalize(raw: RawFinding) -> Finding {
    Finding {
        kind: FindingKind::Contradiction,
        category: if raw.category.is_empty() {
            "Uncategorized".to_string()
        } else {
            raw.category
        },
        severity: Severity::parse_lenient(&raw.severity),
        message: raw.message,
        suggestion: raw.suggestion,
        old_text: raw.old_text,
        new_text: raw.new_text,
        source_doc: raw.old_doc,
        doc_id: raw.doc_id,
        provenance: Provenance::Model,
    }
}

/// Strips a surrounding markdown code fence (with optional `json` tag).
fn strip_code_fences(raw: &str) -> &str {
    // Lazily compiled on first use; the pattern is static.
    use std::sync::OnceLock;
    static FENCE: OnceLock<regex::Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        regex::Regex::new(r"(?s)^\s*```(?:json)?\s*\n?(.*?)\n?\s*```\s*$")
            .expect("fence pattern is valid")
    });

    match fence.captures(raw) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw).trim(),
        None => raw.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json_array() {
        let raw = r#"[
            {"category": "Terminology", "severity": "warning",
             "message": "Dashboard was renamed", "suggestion": "Use Home screen"}
        ]"#;
        let findings = parse_findings(raw);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, "Terminology");
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].provenance, Provenance::Model);
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n[{\"category\": \"Facts\", \"severity\": \"critical\", \"message\": \"m\"}]\n```";
        let findings = parse_findings(raw);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn test_parse_fenced_without_language_tag() {
        let raw = "```\n[]\n```";
        assert!(parse_findings(raw).is_empty());
    }

    #[test]
    fn test_parse_wrapped_object() {
        let raw = r#"{"contradictions": [
            {"category": "Navigation", "severity": "critical", "message": "m"},
            {"category": "Terminology", "severity": "warning", "message": "n"}
        ]}"#;
        let findings = parse_findings(raw);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].category, "Navigation");
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_findings("[]").is_empty());
        assert!(parse_findings("```json\n[]\n```").is_empty());
    }

    #[test]
    fn test_unknown_severity_normalized_not_rejected() {
        let raw = r#"[{"category": "c", "severity": "catastrophic", "message": "m"}]"#;
        let findings = parse_findings(raw);
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn test_missing_category_gets_default() {
        let raw = r#"[{"severity": "info", "message": "m"}]"#;
        assert_eq!(parse_findings(raw)[0].category, "Uncategorized");
    }

    #[test]
    fn test_prose_response_wrapped_as_single_analysis_finding() {
        let raw = "The documents disagree about where the settings screen lives.";
        let findings = parse_findings(raw);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, "AI analysis");
        assert_eq!(findings[0].severity, Severity::Info);
        assert!(findings[0].message.contains("settings screen"));
        assert_eq!(findings[0].new_text.as_deref(), Some(raw));
    }

    #[test]
    fn test_long_prose_message_is_truncated() {
        let raw = "word ".repeat(200);
        let findings = parse_findings(&raw);
        assert!(findings[0].message.chars().count() <= 200);
    }

    #[test]
    fn test_doc_reference_fields_carried_through() {
        let raw = r#"[{"category": "c", "severity": "info", "message": "m",
                      "old_doc": "Manual v2.1", "doc_id": "d-9"}]"#;
        let findings = parse_findings(raw);
        assert_eq!(findings[0].source_doc, "Manual v2.1");
        assert_eq!(findings[0].doc_id, "d-9");
    }
}
