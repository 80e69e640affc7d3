//! Scan Engine
//!
//! Applies a registry snapshot's matchers to one chunk of text. Spans are
//! translated to whole-text byte offsets so downstream merging and
//! anonymization never see chunk-local positions. Output order is
//! pattern-registration order; scanning the same chunk twice with the same
//! snapshot yields identical results.

use crate::registry::RegistrySnapshot;

/// Matches for one pattern within one scanned chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHits {
    /// Index of the pattern within the registry snapshot.
    pub registry_index: usize,
    /// Absolute byte spans in the whole extracted text.
    pub spans: Vec<(usize, usize)>,
}

/// Scan a single chunk against every active pattern.
///
/// `base_offset` is the byte offset of `chunk` within the whole text.
/// Patterns below `minimum_confidence` are skipped outright; they could
/// never survive filtering.
pub fn scan_chunk(
    chunk: &str,
    base_offset: usize,
    snapshot: &RegistrySnapshot,
    minimum_confidence: f64,
) -> Vec<PatternHits> {
    let mut hits = Vec::new();

    for (registry_index, spec) in snapshot.patterns().iter().enumerate() {
        if spec.confidence < minimum_confidence {
            continue;
        }

        let spans: Vec<(usize, usize)> = spec
            .matcher
            .find_iter(chunk)
            .map(|m| (base_offset + m.start(), base_offset + m.end()))
            .collect();

        if !spans.is_empty() {
            hits.push(PatternHits {
                registry_index,
                spans,
            });
        }
    }

    hits
}
