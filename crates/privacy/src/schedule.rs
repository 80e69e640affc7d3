//! Scan Scheduler
//!
//! Fans a chunk stream out to a bounded pool of concurrent scan workers and
//! merges the partial results deterministically. Chunks are independent;
//! the only shared state is the read-only registry snapshot.
//!
//! Each chunk is scanned as a window that carries the tail of its
//! predecessor, so matches spanning a chunk boundary are still found:
//! a match flush against a non-final window edge may be truncated and is
//! deferred to the next window's rescan, and the merge dedups by absolute
//! span. Matches longer than the overlap can still be missed at a boundary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::models::{MatchResult, ScanOptions, ScanOutcome};
use crate::registry::RegistrySnapshot;
use crate::scan::{self, PatternHits};

/// Characters carried from each chunk into the next scan window.
pub const CHUNK_OVERLAP_CHARS: usize = 64;

/// Upper bound on retained sample spans per pattern in the merged result.
pub const SAMPLE_SPAN_CAP: usize = 8;

struct Window {
    text: String,
    base_offset: usize,
    is_last: bool,
}

/// Scan a chunk stream and merge the per-chunk results into one outcome.
///
/// Single-window inputs are scanned inline; larger inputs fan out across at
/// most `max_workers` concurrent tasks (scaled down for small inputs) with a
/// join barrier before merging. On timeout, in-flight work is abandoned and
/// the partial merge is returned marked Degraded.
pub async fn scan_stream<I>(
    chunks: I,
    snapshot: Arc<RegistrySnapshot>,
    options: &ScanOptions,
) -> ScanOutcome
where
    I: Iterator<Item = String>,
{
    let started = Instant::now();
    let (windows, total_bytes) = build_windows(chunks);
    let total_windows = windows.len();

    if total_windows == 0 {
        let mut outcome = ScanOutcome::clean();
        outcome.elapsed = started.elapsed();
        return outcome;
    }

    let minimum_confidence = options.minimum_confidence;

    // Single window: scan inline, no pool.
    if total_windows == 1 {
        let window = &windows[0];
        let hits = scan::scan_chunk(&window.text, window.base_offset, &snapshot, minimum_confidence);
        return merge(
            vec![hits],
            &snapshot,
            MergeStats {
                chunks_scanned: 1,
                chunks_failed: 0,
                total_windows,
                timed_out: false,
            },
            options.max_failure_ratio,
            started.elapsed(),
        );
    }

    let workers = effective_workers(options.max_workers, total_bytes);
    tracing::debug!(
        windows = total_windows,
        workers,
        bytes = total_bytes,
        "dispatching chunk scans"
    );

    let semaphore = Arc::new(Semaphore::new(workers));
    let mut set = JoinSet::new();

    for window in windows {
        let snapshot = snapshot.clone();
        let semaphore = semaphore.clone();
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            scan_window(&window, &snapshot, minimum_confidence)
        });
    }

    let mut collected: Vec<Vec<PatternHits>> = Vec::with_capacity(total_windows);
    let mut failed = 0usize;
    let drain = async {
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(hits) => collected.push(hits),
                Err(e) => {
                    tracing::warn!("chunk scan task failed: {}", e);
                    failed += 1;
                }
            }
        }
    };

    let timed_out = tokio::time::timeout(options.timeout, drain).await.is_err();
    if timed_out {
        tracing::warn!(
            timeout = ?options.timeout,
            "scan timed out; abandoning in-flight chunks and returning partial results"
        );
        set.abort_all();
    }

    let chunks_scanned = collected.len();
    merge(
        collected,
        &snapshot,
        MergeStats {
            chunks_scanned,
            chunks_failed: failed,
            total_windows,
            timed_out,
        },
        options.max_failure_ratio,
        started.elapsed(),
    )
}

/// Scan one window, deferring possibly-truncated edge matches.
fn scan_window(
    window: &Window,
    snapshot: &RegistrySnapshot,
    minimum_confidence: f64,
) -> Vec<PatternHits> {
    let mut hits = scan::scan_chunk(&window.text, window.base_offset, snapshot, minimum_confidence);

    if !window.is_last {
        // A match flush against the window edge may continue into the next
        // chunk; the next window rescans it through its overlap prefix.
        let window_end = window.base_offset + window.text.len();
        for h in &mut hits {
            h.spans.retain(|&(_, end)| end != window_end);
        }
        hits.retain(|h| !h.spans.is_empty());
    }

    hits
}

/// Materialize overlap windows from the chunk stream.
///
/// Returns the windows and the total byte length of the chunk text.
fn build_windows<I: Iterator<Item = String>>(chunks: I) -> (Vec<Window>, usize) {
    let mut windows = Vec::new();
    let mut offset = 0usize;
    let mut carry = String::new();

    for chunk in chunks {
        let base_offset = offset - carry.len();
        let mut text = carry;
        text.push_str(&chunk);
        offset += chunk.len();
        carry = tail_chars(&text, CHUNK_OVERLAP_CHARS).to_string();
        windows.push(Window {
            text,
            base_offset,
            is_last: false,
        });
    }

    if let Some(last) = windows.last_mut() {
        last.is_last = true;
    }
    (windows, offset)
}

/// The last `n` characters of `text`, on a char boundary.
fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Scale the worker count down for small inputs.
fn effective_workers(max_workers: usize, total_bytes: usize) -> usize {
    let max_workers = max_workers.max(1);
    if total_bytes < 1_000_000 {
        max_workers.min(2)
    } else if total_bytes < 5_000_000 {
        max_workers.min(3)
    } else {
        max_workers
    }
}

struct MergeStats {
    chunks_scanned: usize,
    chunks_failed: usize,
    total_windows: usize,
    timed_out: bool,
}

/// Merge per-window hits: dedup spans, sum counts, cap samples, derive the
/// degraded flag. Output is in pattern-registration order and independent
/// of task completion order.
fn merge(
    per_window: Vec<Vec<PatternHits>>,
    snapshot: &RegistrySnapshot,
    stats: MergeStats,
    max_failure_ratio: f64,
    elapsed: Duration,
) -> ScanOutcome {
    let mut spans_by_pattern: Vec<Vec<(usize, usize)>> = vec![Vec::new(); snapshot.len()];
    for hits in per_window {
        for h in hits {
            spans_by_pattern[h.registry_index].extend(h.spans);
        }
    }

    let mut matches = Vec::new();
    for (idx, spans) in spans_by_pattern.iter_mut().enumerate() {
        if spans.is_empty() {
            continue;
        }
        spans.sort_unstable();
        spans.dedup();

        let spec = &snapshot.patterns()[idx];
        matches.push(MatchResult {
            pattern_name: spec.name.clone(),
            confidence: spec.confidence,
            occurrence_count: spans.len(),
            sample_spans: spans.iter().take(SAMPLE_SPAN_CAP).copied().collect(),
        });
    }

    let failure_ratio = if stats.total_windows == 0 {
        0.0
    } else {
        stats.chunks_failed as f64 / stats.total_windows as f64
    };

    ScanOutcome {
        is_sensitive: !matches.is_empty(),
        degraded: stats.timed_out || failure_ratio > max_failure_ratio,
        matches,
        chunks_scanned: stats.chunks_scanned,
        chunks_failed: stats.chunks_failed,
        elapsed,
    }
}
