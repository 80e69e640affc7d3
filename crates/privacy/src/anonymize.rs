//! Anonymizer
//!
//! Produces a redacted variant of the original text for the patterns that
//! survived a scan. Spans are re-located against the whole original text
//! with the snapshot's own matchers, overlaps between patterns are resolved
//! by confidence, and replacements apply rightmost-first so earlier offset
//! shifts never invalidate pending spans.

use crate::models::ScanOutcome;
use crate::pattern::ReplacementStrategy;
use crate::registry::RegistrySnapshot;

/// Fixed token substituted under the Mask strategy. Hides the original
/// length so redacted output cannot be re-identified by length.
pub const MASK_TOKEN: &str = "***REDACTED***";

/// Character repeated under the TokenizePreserveLength strategy.
pub const TOKENIZE_CHAR: char = '\u{2022}';

/// Result of an anonymization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redaction {
    pub text: String,
    /// Spans actually replaced.
    pub replacements: usize,
    /// Overlapping lower-confidence spans discarded instead of
    /// double-redacted. Resolved deterministically, never an error.
    pub conflicts: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: usize,
    end: usize,
    registry_index: usize,
    confidence: f64,
}

/// Redact every occurrence of the outcome's surviving patterns in `text`.
pub fn anonymize(text: &str, outcome: &ScanOutcome, snapshot: &RegistrySnapshot) -> Redaction {
    // Re-locate spans in the original text for each surviving pattern,
    // walking the registry so collection order is registration order.
    let mut candidates: Vec<Candidate> = Vec::new();
    for (registry_index, spec) in snapshot.patterns().iter().enumerate() {
        if outcome.get(&spec.name).is_none() {
            continue;
        }
        for m in spec.matcher.find_iter(text) {
            candidates.push(Candidate {
                start: m.start(),
                end: m.end(),
                registry_index,
                confidence: spec.confidence,
            });
        }
    }

    // Higher confidence wins an overlap; ties go to registration order.
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.registry_index.cmp(&b.registry_index))
            .then(a.start.cmp(&b.start))
    });

    let mut accepted: Vec<Candidate> = Vec::new();
    let mut conflicts = 0usize;
    for c in candidates {
        let overlaps = accepted
            .iter()
            .any(|a| a.start < c.end && c.start < a.end);
        if overlaps {
            conflicts += 1;
            tracing::debug!(
                pattern = %snapshot.patterns()[c.registry_index].name,
                start = c.start,
                end = c.end,
                "discarding overlapping lower-confidence span"
            );
        } else {
            accepted.push(c);
        }
    }

    // Rightmost-first application keeps remaining offsets valid.
    accepted.sort_by(|a, b| b.start.cmp(&a.start));

    let mut redacted = text.to_string();
    for c in &accepted {
        let spec = &snapshot.patterns()[c.registry_index];
        let replacement = match spec.strategy {
            ReplacementStrategy::Mask => MASK_TOKEN.to_string(),
            ReplacementStrategy::TokenizePreserveLength => {
                let width = text[c.start..c.end].chars().count();
                TOKENIZE_CHAR.to_string().repeat(width)
            }
            ReplacementStrategy::Placeholder => spec.placeholder.clone(),
        };
        redacted.replace_range(c.start..c.end, &replacement);
    }

    Redaction {
        text: redacted,
        replacements: accepted.len(),
        conflicts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanOptions;
    use crate::pattern::{CustomPattern, Tier};
    use crate::registry;
    use crate::scan::scan_chunk;
    use crate::models::{MatchResult, ScanOutcome};

    fn outcome_for(text: &str, snapshot: &crate::registry::RegistrySnapshot) -> ScanOutcome {
        let hits = scan_chunk(text, 0, snapshot, ScanOptions::default().minimum_confidence);
        let matches: Vec<MatchResult> = hits
            .iter()
            .map(|h| {
                let spec = &snapshot.patterns()[h.registry_index];
                MatchResult {
                    pattern_name: spec.name.clone(),
                    confidence: spec.confidence,
                    occurrence_count: h.spans.len(),
                    sample_spans: h.spans.clone(),
                }
            })
            .collect();
        ScanOutcome {
            is_sensitive: !matches.is_empty(),
            degraded: false,
            matches,
            chunks_scanned: 1,
            chunks_failed: 0,
            elapsed: std::time::Duration::ZERO,
        }
    }

    #[test]
    fn placeholder_strategy_keeps_text_order() {
        let (snapshot, _) = registry::build(Tier::Standard, &[]);
        let text = "Contact me at jane@example.com or 555-12-3456";
        let outcome = outcome_for(text, &snapshot);

        let redaction = anonymize(text, &outcome, &snapshot);
        assert_eq!(redaction.text, "Contact me at [EMAIL] or [SSN]");
        assert_eq!(redaction.replacements, 2);
        assert_eq!(redaction.conflicts, 0);
    }

    #[test]
    fn mask_is_idempotent() {
        let (snapshot, _) = registry::build(Tier::Standard, &[]);
        let text = "my password: hunter2 stays here";
        let outcome = outcome_for(text, &snapshot);
        let first = anonymize(text, &outcome, &snapshot);
        assert!(first.text.contains(MASK_TOKEN));
        assert!(!first.text.contains("hunter2"));

        // Already-anonymized text detects no further matches.
        let again = outcome_for(&first.text, &snapshot);
        assert!(again.get("password_assignment").is_none());
        let second = anonymize(&first.text, &again, &snapshot);
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn tokenize_preserves_length() {
        let (snapshot, _) = registry::build(Tier::Standard, &[]);
        let text = "card 4111 1111 1111 1111 on file";
        let outcome = outcome_for(text, &snapshot);

        let redaction = anonymize(text, &outcome, &snapshot);
        assert_eq!(
            redaction.text.chars().count(),
            text.chars().count()
        );
        assert!(!redaction.text.contains("4111"));
    }

    #[test]
    fn overlapping_spans_resolve_by_confidence() {
        let customs = vec![
            CustomPattern {
                name: "ticket".to_string(),
                pattern: r"TCK-\d{4}".to_string(),
                confidence: 0.95,
                level: Tier::Standard,
            },
            CustomPattern {
                name: "digits".to_string(),
                pattern: r"\d{4}".to_string(),
                confidence: 0.8,
                level: Tier::Standard,
            },
        ];
        let (snapshot, _) = registry::build(Tier::Standard, &customs);
        let text = "ref TCK-9921 end";
        let outcome = outcome_for(text, &snapshot);

        let redaction = anonymize(text, &outcome, &snapshot);
        // The higher-confidence ticket match wins; the nested digit match
        // is discarded, not double-redacted.
        assert_eq!(redaction.text, "ref [TICKET] end");
        assert_eq!(redaction.conflicts, 1);
    }

    #[test]
    fn no_matches_returns_text_unchanged() {
        let (snapshot, _) = registry::build(Tier::Standard, &[]);
        let text = "nothing sensitive here";
        let outcome = outcome_for(text, &snapshot);

        let redaction = anonymize(text, &outcome, &snapshot);
        assert_eq!(redaction.text, text);
        assert_eq!(redaction.replacements, 0);
    }
}
