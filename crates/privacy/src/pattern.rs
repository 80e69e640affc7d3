//! Sensitivity detectors
//!
//! Built-in patterns for common PII, credentials and financial identifiers,
//! plus the definition of caller-supplied custom patterns. Each pattern
//! carries a static confidence weight (estimated precision, used to filter
//! low-quality matches) and a replacement strategy for anonymization.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which subset of detectors is active for a scan.
///
/// Standard covers common PII; Strict adds broader, more aggressive
/// matching (names, URLs, passport/bank-account shapes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Standard,
    Strict,
}

/// Anonymization policy applied to a matched span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementStrategy {
    /// Fixed-length token, hiding the original length.
    Mask,
    /// Same-length run of a mask character, preserving layout.
    TokenizePreserveLength,
    /// Semantic category tag (e.g. `[EMAIL]`) for user-facing review.
    Placeholder,
}

/// A compiled, immutable sensitivity detector within a registry snapshot.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub name: String,
    pub tier: Tier,
    pub matcher: Regex,
    pub confidence: f64,
    pub strategy: ReplacementStrategy,
    /// Tag substituted under the Placeholder strategy.
    pub placeholder: String,
}

/// Custom pattern as supplied by caller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPattern {
    pub name: String,
    pub pattern: String,
    #[serde(default = "default_custom_confidence")]
    pub confidence: f64,
    /// Tier the pattern belongs to; strict-level patterns are only active
    /// when scanning under the Strict tier.
    #[serde(default)]
    pub level: Tier,
}

fn default_custom_confidence() -> f64 {
    0.75
}

pub(crate) struct BuiltinPattern {
    pub name: &'static str,
    pub tier: Tier,
    pub pattern: &'static str,
    pub confidence: f64,
    pub strategy: ReplacementStrategy,
    pub placeholder: &'static str,
}

/// Built-in detectors, in registration order. Standard-tier entries first.
pub(crate) const BUILTIN_PATTERNS: &[BuiltinPattern] = &[
    BuiltinPattern {
        name: "credit_card",
        tier: Tier::Standard,
        pattern: r"\b(?:\d{4}[ -]?){3}\d{4}\b",
        confidence: 0.9,
        strategy: ReplacementStrategy::TokenizePreserveLength,
        placeholder: "[CREDIT_CARD]",
    },
    BuiltinPattern {
        name: "ssn",
        tier: Tier::Standard,
        pattern: r"\b\d{3}[-]?\d{2}[-]?\d{4}\b",
        confidence: 0.85,
        strategy: ReplacementStrategy::Placeholder,
        placeholder: "[SSN]",
    },
    BuiltinPattern {
        name: "email",
        tier: Tier::Standard,
        pattern: r"\b[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}\b",
        confidence: 0.9,
        strategy: ReplacementStrategy::Placeholder,
        placeholder: "[EMAIL]",
    },
    BuiltinPattern {
        name: "phone_number",
        tier: Tier::Standard,
        pattern: r"\b(?:\+\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b",
        confidence: 0.8,
        strategy: ReplacementStrategy::Placeholder,
        placeholder: "[PHONE]",
    },
    BuiltinPattern {
        name: "ip_address",
        tier: Tier::Standard,
        pattern: r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b",
        confidence: 0.8,
        strategy: ReplacementStrategy::TokenizePreserveLength,
        placeholder: "[IP_ADDRESS]",
    },
    BuiltinPattern {
        name: "date_of_birth",
        tier: Tier::Standard,
        pattern: r"\b\d{1,2}[-/]\d{1,2}[-/]\d{2,4}\b",
        confidence: 0.7,
        strategy: ReplacementStrategy::Placeholder,
        placeholder: "[DATE_OF_BIRTH]",
    },
    BuiltinPattern {
        // Below the default minimum confidence; active only for callers
        // that lower the threshold.
        name: "street_address",
        tier: Tier::Standard,
        pattern: r"\b\d+\s+[A-Za-z0-9\s,]+\b(?:street|st|avenue|ave|road|rd|highway|hwy|square|sq|trail|trl|drive|dr|court|ct|parkway|pkwy|circle|cir|boulevard|blvd)\b\s*(?:[A-Za-z]+\s*,\s*)?(?:[A-Za-z]+\s*,\s*)?(?:\d{5}(?:-\d{4})?)?",
        confidence: 0.6,
        strategy: ReplacementStrategy::Placeholder,
        placeholder: "[ADDRESS]",
    },
    BuiltinPattern {
        name: "password_assignment",
        tier: Tier::Standard,
        pattern: r"\b(?:password|passwd|pwd)[\s:=]+\S+",
        confidence: 0.95,
        strategy: ReplacementStrategy::Mask,
        placeholder: "[PASSWORD]",
    },
    BuiltinPattern {
        name: "api_key",
        tier: Tier::Standard,
        pattern: r"\b(?:sk-|pk-|api[-_]?key|token)[-_a-zA-Z0-9]{10,}\b",
        confidence: 0.95,
        strategy: ReplacementStrategy::Mask,
        placeholder: "[API_KEY]",
    },
    // Strict tier extras
    BuiltinPattern {
        name: "honorific_name",
        tier: Tier::Strict,
        pattern: r"\b(?:Mr\.|Mrs\.|Ms\.|Dr\.|Prof\.)\s+[A-Z][a-z]+\s+[A-Z][a-z]+\b",
        confidence: 0.75,
        strategy: ReplacementStrategy::Placeholder,
        placeholder: "[NAME]",
    },
    BuiltinPattern {
        name: "url",
        tier: Tier::Strict,
        pattern: r"https?://(?:www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b(?:[-a-zA-Z0-9()@:%_\+.~#?&/=]*)",
        confidence: 0.75,
        strategy: ReplacementStrategy::Placeholder,
        placeholder: "[URL]",
    },
    BuiltinPattern {
        name: "uuid",
        tier: Tier::Strict,
        pattern: r"\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b",
        confidence: 0.8,
        strategy: ReplacementStrategy::TokenizePreserveLength,
        placeholder: "[UUID]",
    },
    BuiltinPattern {
        name: "passport",
        tier: Tier::Strict,
        pattern: r"\b[A-Z]{1,2}[0-9]{6,9}\b",
        confidence: 0.7,
        strategy: ReplacementStrategy::Placeholder,
        placeholder: "[PASSPORT]",
    },
    BuiltinPattern {
        name: "bank_account",
        tier: Tier::Strict,
        pattern: r"\b[0-9]{8,17}\b",
        confidence: 0.6,
        strategy: ReplacementStrategy::TokenizePreserveLength,
        placeholder: "[BANK_ACCOUNT]",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_patterns_compile() {
        for builtin in BUILTIN_PATTERNS {
            assert!(
                Regex::new(builtin.pattern).is_ok(),
                "built-in pattern {} failed to compile",
                builtin.name
            );
        }
    }

    #[test]
    fn builtin_names_are_unique() {
        let mut names: Vec<&str> = BUILTIN_PATTERNS.iter().map(|b| b.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BUILTIN_PATTERNS.len());
    }

    #[test]
    fn builtin_confidences_in_range() {
        for builtin in BUILTIN_PATTERNS {
            assert!((0.0..=1.0).contains(&builtin.confidence), "{}", builtin.name);
        }
    }

    #[test]
    fn email_and_ssn_match_expected_shapes() {
        let email = Regex::new(
            BUILTIN_PATTERNS.iter().find(|b| b.name == "email").unwrap().pattern,
        )
        .unwrap();
        assert!(email.is_match("jane@example.com"));
        assert!(!email.is_match("not-an-email"));

        let ssn = Regex::new(
            BUILTIN_PATTERNS.iter().find(|b| b.name == "ssn").unwrap().pattern,
        )
        .unwrap();
        assert!(ssn.is_match("555-12-3456"));
        assert!(ssn.is_match("555123456"));
    }

    #[test]
    fn custom_pattern_defaults() {
        let p: CustomPattern =
            serde_json::from_str(r#"{"name": "badge", "pattern": "B-\\d{6}"}"#).unwrap();
        assert_eq!(p.confidence, 0.75);
        assert_eq!(p.level, Tier::Standard);
    }
}
