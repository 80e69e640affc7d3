//! Pattern Registry
//!
//! Builds immutable snapshots of the active detector set for a given tier
//! and custom pattern list. Snapshots are compiled once per distinct
//! configuration and shared read-only across concurrent scans; there is no
//! global mutable pattern state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::pattern::{
    CustomPattern, PatternSpec, ReplacementStrategy, Tier, BUILTIN_PATTERNS,
};

/// Immutable set of compiled detectors active for one scan configuration.
///
/// Safe for unlimited concurrent readers; never mutated after build.
#[derive(Debug)]
pub struct RegistrySnapshot {
    tier: Tier,
    patterns: Vec<PatternSpec>,
}

impl RegistrySnapshot {
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Active patterns in registration order (built-ins first, then custom).
    pub fn patterns(&self) -> &[PatternSpec] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PatternSpec> {
        self.patterns.iter().find(|p| p.name == name)
    }
}

/// A custom pattern that failed registration.
///
/// One bad custom pattern never aborts registration of the rest.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedPattern {
    pub name: String,
    pub reason: String,
}

/// Compile a registry snapshot for the given tier and custom patterns.
pub fn build(
    tier: Tier,
    custom_patterns: &[CustomPattern],
) -> (Arc<RegistrySnapshot>, Vec<RejectedPattern>) {
    let mut patterns = Vec::new();
    let mut rejected = Vec::new();

    for builtin in BUILTIN_PATTERNS {
        if builtin.tier == Tier::Strict && tier != Tier::Strict {
            continue;
        }
        patterns.push(PatternSpec {
            name: builtin.name.to_string(),
            tier: builtin.tier,
            matcher: Regex::new(builtin.pattern).expect("valid built-in pattern"),
            confidence: builtin.confidence,
            strategy: builtin.strategy,
            placeholder: builtin.placeholder.to_string(),
        });
    }

    for custom in custom_patterns {
        if custom.level == Tier::Strict && tier != Tier::Strict {
            // Inactive under this tier, not an error.
            continue;
        }
        if patterns.iter().any(|p| p.name == custom.name) {
            rejected.push(RejectedPattern {
                name: custom.name.clone(),
                reason: "duplicate pattern name".to_string(),
            });
            continue;
        }
        if !custom.confidence.is_finite() || !(0.0..=1.0).contains(&custom.confidence) {
            rejected.push(RejectedPattern {
                name: custom.name.clone(),
                reason: format!("confidence {} out of range", custom.confidence),
            });
            continue;
        }
        match Regex::new(&custom.pattern) {
            Ok(matcher) => patterns.push(PatternSpec {
                name: custom.name.clone(),
                tier: custom.level,
                matcher,
                confidence: custom.confidence,
                strategy: ReplacementStrategy::Placeholder,
                placeholder: format!("[{}]", custom.name.to_uppercase()),
            }),
            Err(e) => {
                tracing::warn!("rejecting custom pattern {}: {}", custom.name, e);
                rejected.push(RejectedPattern {
                    name: custom.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    (Arc::new(RegistrySnapshot { tier, patterns }), rejected)
}

/// Process-wide memo of registry snapshots, keyed by tier and a digest of
/// the custom pattern set. Matcher compilation is paid once per distinct
/// configuration, never per text chunk.
#[derive(Debug, Default)]
pub struct RegistryCache {
    snapshots: Mutex<HashMap<(Tier, String), (Arc<RegistrySnapshot>, Vec<RejectedPattern>)>>,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the snapshot for this configuration, building it on first use.
    pub fn get_or_build(
        &self,
        tier: Tier,
        custom_patterns: &[CustomPattern],
    ) -> (Arc<RegistrySnapshot>, Vec<RejectedPattern>) {
        let key = (tier, digest(custom_patterns));

        if let Ok(snapshots) = self.snapshots.lock() {
            if let Some((snapshot, rejected)) = snapshots.get(&key) {
                return (snapshot.clone(), rejected.clone());
            }
        }

        let (snapshot, rejected) = build(tier, custom_patterns);
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots
                .entry(key)
                .or_insert_with(|| (snapshot.clone(), rejected.clone()));
        }
        (snapshot, rejected)
    }
}

/// Stable fingerprint of a custom pattern set.
fn digest(custom_patterns: &[CustomPattern]) -> String {
    let mut hasher = Sha256::new();
    for p in custom_patterns {
        hasher.update(p.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(p.pattern.as_bytes());
        hasher.update([0u8]);
        hasher.update(p.confidence.to_le_bytes());
        hasher.update([p.level as u8]);
    }
    hex::encode(hasher.finalize())
}
