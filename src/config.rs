//! Acceptance cutoffs for the fuzzy stages of the matchers.

use log::{info, warn};
use std::env;

pub const DEFAULT_INSTITUTION_CUTOFF: f64 = 0.25;
pub const DEFAULT_INVESTIGATOR_CUTOFF: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingConfig {
    /// Highest edit ratio accepted for city-scoped institution candidates.
    pub institution_cutoff: f64,
    /// Highest edit ratio accepted for investigator candidates.
    pub investigator_cutoff: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            institution_cutoff: DEFAULT_INSTITUTION_CUTOFF,
            investigator_cutoff: DEFAULT_INVESTIGATOR_CUTOFF,
        }
    }
}

impl MatchingConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            institution_cutoff: cutoff_from_env("INSTITUTION_FUZZY_CUTOFF", DEFAULT_INSTITUTION_CUTOFF),
            investigator_cutoff: cutoff_from_env("INVESTIGATOR_FUZZY_CUTOFF", DEFAULT_INVESTIGATOR_CUTOFF),
        }
    }

    pub fn log_config(&self) {
        info!(
            "Fuzzy cutoffs: institution <= {}, investigator <= {}",
            self.institution_cutoff, self.investigator_cutoff
        );
    }
}

fn cutoff_from_env(var: &str, default: f64) -> f64 {
    match env::var(var) {
        Ok(raw) => parse_cutoff(&raw).unwrap_or_else(|| {
            warn!("Ignoring {}={:?}: expected a ratio between 0 and 1", var, raw);
            default
        }),
        Err(_) => default,
    }
}

fn parse_cutoff(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| (0.0..=1.0).contains(v))
}
