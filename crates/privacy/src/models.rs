//! Privacy Engine Data Models

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veilchat_extract::{ContentKind, DEFAULT_CHUNK_SIZE};

use crate::pattern::{CustomPattern, Tier};
use crate::registry::RejectedPattern;

/// Content handed to the engine: chat text, or a file buffer to extract.
#[derive(Debug, Clone)]
pub enum Content {
    Text(String),
    Bytes { file_name: String, bytes: Vec<u8> },
}

/// Per-call tuning knobs, supplied by the caller's settings layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Patterns below this confidence are dropped before matching.
    pub minimum_confidence: f64,
    /// Chunk size in characters for extracted text.
    pub chunk_size: usize,
    /// Upper bound on concurrent chunk-scan workers.
    pub max_workers: usize,
    /// Wall-clock budget for the whole scan; on expiry the outcome is
    /// returned Degraded with whatever merged so far.
    pub timeout: Duration,
    /// Fraction of failed chunks above which the outcome is Degraded.
    pub max_failure_ratio: f64,
    /// Bypass scanning entirely (fully local/offline processing paths).
    pub disable_scan: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            minimum_confidence: 0.7,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_workers: 4,
            timeout: Duration::from_secs(30),
            max_failure_ratio: 0.2,
            disable_scan: false,
        }
    }
}

/// A single scan or anonymize request.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Opaque caller-supplied id (e.g. user id), echoed on the event.
    pub source_id: String,
    pub content: Content,
    pub content_kind: ContentKind,
    pub tier: Tier,
    pub custom_patterns: Vec<CustomPattern>,
    pub options: ScanOptions,
}

impl ScanRequest {
    /// Request for plain chat text with default options.
    pub fn text(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            content: Content::Text(text.into()),
            content_kind: ContentKind::Plain,
            tier: Tier::Standard,
            custom_patterns: Vec::new(),
            options: ScanOptions::default(),
        }
    }

    /// Request for a file buffer with default options.
    pub fn file(
        source_id: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        content_kind: ContentKind,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            content: Content::Bytes {
                file_name: file_name.into(),
                bytes,
            },
            content_kind,
            tier: Tier::Standard,
            custom_patterns: Vec::new(),
            options: ScanOptions::default(),
        }
    }
}

/// Aggregated matches for one pattern across all chunks.
///
/// Spans are byte offsets into the whole extracted text, not chunk-local.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub pattern_name: String,
    pub confidence: f64,
    pub occurrence_count: usize,
    /// Bounded sample of match locations, earliest first.
    pub sample_spans: Vec<(usize, usize)>,
}

/// Result of scanning one piece of content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    /// True iff at least one pattern survived confidence filtering.
    pub is_sensitive: bool,
    /// True when chunk failures or a timeout made the scan inconclusive.
    /// Never to be presented as "no sensitive data found".
    pub degraded: bool,
    /// Surviving matches in pattern-registration order.
    pub matches: Vec<MatchResult>,
    pub chunks_scanned: usize,
    pub chunks_failed: usize,
    pub elapsed: Duration,
}

impl ScanOutcome {
    /// Outcome for content that was never scanned (empty input or bypass).
    pub fn clean() -> Self {
        Self {
            is_sensitive: false,
            degraded: false,
            matches: Vec::new(),
            chunks_scanned: 0,
            chunks_failed: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// True only for a conclusive, match-free scan. A degraded outcome is
    /// inconclusive, not clean.
    pub fn is_clean(&self) -> bool {
        !self.is_sensitive && !self.degraded
    }

    /// Look up the match result for a pattern by name.
    pub fn get(&self, pattern_name: &str) -> Option<&MatchResult> {
        self.matches.iter().find(|m| m.pattern_name == pattern_name)
    }
}

/// What kind of call produced a detection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanAction {
    Scan,
    Anonymize,
}

/// Derived severity of a detection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Structured detection event, one per completed scan/anonymize call.
///
/// The engine only constructs and returns it; persistence is the caller's.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionEvent {
    pub id: Uuid,
    pub source_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: ScanAction,
    pub severity: Severity,
    /// Serializable snapshot of the surviving matches.
    pub detected_patterns: serde_json::Value,
    pub file_names: Option<String>,
}

/// Returned by [`crate::PrivacyService::scan`].
#[derive(Debug)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub event: DetectionEvent,
    /// Custom patterns that failed registration, by name and reason.
    pub rejected_patterns: Vec<RejectedPattern>,
}

/// Returned by [`crate::PrivacyService::anonymize`].
#[derive(Debug)]
pub struct AnonymizeReport {
    /// Redacted variant of the (extracted) text.
    pub text: String,
    pub outcome: ScanOutcome,
    pub event: DetectionEvent,
    /// Overlapping lower-confidence spans discarded during redaction.
    pub conflicts: usize,
    pub rejected_patterns: Vec<RejectedPattern>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let opts = ScanOptions::default();
        assert_eq!(opts.minimum_confidence, 0.7);
        assert_eq!(opts.chunk_size, 2000);
        assert_eq!(opts.max_workers, 4);
        assert!(!opts.disable_scan);
    }

    #[test]
    fn options_deserialize_with_partial_fields() {
        let opts: ScanOptions = serde_json::from_str(r#"{"chunk_size": 512}"#).unwrap();
        assert_eq!(opts.chunk_size, 512);
        assert_eq!(opts.max_workers, 4);
    }

    #[test]
    fn degraded_is_not_clean() {
        let mut outcome = ScanOutcome::clean();
        assert!(outcome.is_clean());
        outcome.degraded = true;
        assert!(!outcome.is_clean());
    }
}
