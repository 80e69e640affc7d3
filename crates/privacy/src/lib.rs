//! VeilChat Privacy Engine
//!
//! Detection and anonymization core for a privacy-preserving proxy in front
//! of third-party AI chat providers:
//! - Tiered pattern registry (built-in + per-caller custom detectors)
//! - Chunked, parallel scanning of text and extracted file content
//! - Confidence-based match filtering
//! - In-place anonymization (mask, length-preserving tokenize, placeholder)
//! - Structured detection events for the caller to persist

pub mod anonymize;
pub mod audit;
pub mod error;
pub mod models;
pub mod pattern;
pub mod registry;
pub mod scan;
pub mod schedule;
pub mod service;

pub use anonymize::Redaction;
pub use error::PrivacyError;
pub use models::{
    AnonymizeReport, Content, DetectionEvent, MatchResult, ScanAction, ScanOptions, ScanOutcome,
    ScanReport, ScanRequest, Severity,
};
pub use pattern::{CustomPattern, PatternSpec, ReplacementStrategy, Tier};
pub use registry::{RegistryCache, RegistrySnapshot, RejectedPattern};
pub use service::PrivacyService;

// Callers speak in the extractor's vocabulary when submitting files.
pub use veilchat_extract::{ContentKind, ExtractError};
