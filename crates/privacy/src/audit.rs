//! Audit Recorder
//!
//! Builds the structured detection event for a completed scan or anonymize
//! call. Pure construction: the engine returns the event value and the
//! caller owns persistence.

use chrono::Utc;
use uuid::Uuid;

use crate::models::{DetectionEvent, ScanAction, ScanOutcome, Severity};

/// Construct the detection event for a completed call.
pub fn record(
    source_id: &str,
    action: ScanAction,
    outcome: &ScanOutcome,
    file_names: Option<String>,
) -> DetectionEvent {
    DetectionEvent {
        id: Uuid::new_v4(),
        source_id: source_id.to_string(),
        timestamp: Utc::now(),
        action,
        severity: severity_for(outcome),
        detected_patterns: serde_json::to_value(&outcome.matches).unwrap_or_default(),
        file_names,
    }
}

/// Severity from aggregate confidence and match counts: High when any
/// surviving pattern is near-certain or repeated, Medium for ordinary
/// survivors, Low for sub-threshold or degraded-only outcomes.
fn severity_for(outcome: &ScanOutcome) -> Severity {
    let mut severity = Severity::Low;
    for m in &outcome.matches {
        if m.confidence >= 0.9 || m.occurrence_count >= 5 {
            return Severity::High;
        }
        if m.confidence >= 0.7 {
            severity = Severity::Medium;
        }
    }
    severity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchResult;
    use std::time::Duration;

    fn outcome_with(matches: Vec<MatchResult>) -> ScanOutcome {
        ScanOutcome {
            is_sensitive: !matches.is_empty(),
            degraded: false,
            matches,
            chunks_scanned: 1,
            chunks_failed: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn result(name: &str, confidence: f64, count: usize) -> MatchResult {
        MatchResult {
            pattern_name: name.to_string(),
            confidence,
            occurrence_count: count,
            sample_spans: vec![(0, 4)],
        }
    }

    #[test]
    fn high_confidence_is_high_severity() {
        let outcome = outcome_with(vec![result("email", 0.9, 1)]);
        let event = record("user-1", ScanAction::Scan, &outcome, None);
        assert_eq!(event.severity, Severity::High);
    }

    #[test]
    fn repeated_matches_are_high_severity() {
        let outcome = outcome_with(vec![result("phone_number", 0.8, 5)]);
        let event = record("user-1", ScanAction::Scan, &outcome, None);
        assert_eq!(event.severity, Severity::High);
    }

    #[test]
    fn ordinary_survivors_are_medium() {
        let outcome = outcome_with(vec![result("date_of_birth", 0.7, 2)]);
        let event = record("user-1", ScanAction::Scan, &outcome, None);
        assert_eq!(event.severity, Severity::Medium);
    }

    #[test]
    fn clean_and_degraded_outcomes_are_low() {
        let event = record("user-1", ScanAction::Scan, &outcome_with(vec![]), None);
        assert_eq!(event.severity, Severity::Low);

        let mut degraded = outcome_with(vec![]);
        degraded.degraded = true;
        let event = record("user-1", ScanAction::Scan, &degraded, None);
        assert_eq!(event.severity, Severity::Low);
    }

    #[test]
    fn event_snapshot_serializes_matches() {
        let outcome = outcome_with(vec![result("email", 0.9, 1)]);
        let event = record("user-7", ScanAction::Anonymize, &outcome, Some("cv.pdf".into()));

        assert_eq!(event.source_id, "user-7");
        assert_eq!(event.action, ScanAction::Anonymize);
        assert_eq!(event.file_names.as_deref(), Some("cv.pdf"));
        let patterns = event.detected_patterns.as_array().unwrap();
        assert_eq!(patterns[0]["pattern_name"], "email");
        assert_eq!(patterns[0]["occurrence_count"], 1);
    }
}
