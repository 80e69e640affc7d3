//! Privacy Service
//!
//! Entry point for the surrounding application. Drives the pipeline:
//! extract -> schedule -> (anonymize) -> record, with per-call settings
//! supplied by the caller's configuration layer.

use veilchat_extract::{extract, linearize, ChunkStream};

use crate::error::PrivacyError;
use crate::models::{
    AnonymizeReport, Content, ScanAction, ScanOutcome, ScanReport, ScanRequest,
};
use crate::registry::RegistryCache;
use crate::{anonymize, audit, schedule};

/// Detection and anonymization engine with a process-wide registry cache.
///
/// Cheap to share behind an `Arc`; all state is the immutable snapshot memo.
#[derive(Debug, Default)]
pub struct PrivacyService {
    registries: RegistryCache,
}

impl PrivacyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan content for sensitive information.
    ///
    /// Returns the merged outcome plus the detection event for the caller
    /// to persist. `Err` is reserved for resource-level failures; per-chunk
    /// and per-pattern problems surface on the outcome and report instead.
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanReport, PrivacyError> {
        let ScanRequest {
            source_id,
            content,
            content_kind,
            tier,
            custom_patterns,
            options,
        } = request;
        let file_names = file_names_of(&content);

        if options.disable_scan {
            tracing::debug!(source_id = %source_id, "scanning disabled; bypassing");
            let outcome = ScanOutcome::clean();
            let event = audit::record(&source_id, ScanAction::Scan, &outcome, file_names);
            return Ok(ScanReport {
                outcome,
                event,
                rejected_patterns: Vec::new(),
            });
        }

        let (snapshot, rejected_patterns) = self.registries.get_or_build(tier, &custom_patterns);
        if !rejected_patterns.is_empty() {
            tracing::warn!(
                source_id = %source_id,
                rejected = rejected_patterns.len(),
                "some custom patterns were not registered"
            );
        }

        let chunks = match content {
            Content::Text(text) => ChunkStream::from_text(text, options.chunk_size),
            Content::Bytes { bytes, .. } => extract(bytes, content_kind, options.chunk_size)?,
        };

        let outcome = schedule::scan_stream(chunks, snapshot, &options).await;
        let event = audit::record(&source_id, ScanAction::Scan, &outcome, file_names);
        Ok(ScanReport {
            outcome,
            event,
            rejected_patterns,
        })
    }

    /// Scan content and redact the surviving matches.
    ///
    /// For binary formats the redacted text is the *extracted* text;
    /// re-encoding a redacted document is out of scope.
    pub async fn anonymize(&self, request: ScanRequest) -> Result<AnonymizeReport, PrivacyError> {
        let ScanRequest {
            source_id,
            content,
            content_kind,
            tier,
            custom_patterns,
            options,
        } = request;
        let file_names = file_names_of(&content);

        // The full text stays resident: the anonymizer re-locates spans
        // against the original, not against individual chunks.
        let text = match content {
            Content::Text(text) => text,
            Content::Bytes { bytes, .. } => linearize(bytes, content_kind)?,
        };

        if options.disable_scan {
            tracing::debug!(source_id = %source_id, "scanning disabled; returning text unmodified");
            let outcome = ScanOutcome::clean();
            let event = audit::record(&source_id, ScanAction::Anonymize, &outcome, file_names);
            return Ok(AnonymizeReport {
                text,
                outcome,
                event,
                conflicts: 0,
                rejected_patterns: Vec::new(),
            });
        }

        let (snapshot, rejected_patterns) = self.registries.get_or_build(tier, &custom_patterns);

        let chunks = ChunkStream::from_text(text.clone(), options.chunk_size);
        let outcome = schedule::scan_stream(chunks, snapshot.clone(), &options).await;
        let redaction = anonymize::anonymize(&text, &outcome, &snapshot);
        let event = audit::record(&source_id, ScanAction::Anonymize, &outcome, file_names);

        Ok(AnonymizeReport {
            text: redaction.text,
            outcome,
            event,
            conflicts: redaction.conflicts,
            rejected_patterns,
        })
    }
}

fn file_names_of(content: &Content) -> Option<String> {
    match content {
        Content::Bytes { file_name, .. } => Some(file_name.clone()),
        Content::Text(_) => None,
    }
}
