//! Search configuration

use crate::error::{KolosalError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default maximum node depth (the root is depth 1)
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Default number of candidates kept per round
pub const DEFAULT_BEAM_WIDTH: usize = 3;

/// Evaluation cap used when none is configured
pub const UNBOUNDED_EVALUATIONS: usize = 10_000_000;

/// Configuration for the beam search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum depth of any node in the graph, refinement nodes included
    pub max_depth: usize,

    /// Candidates kept per round, root excluded
    pub beam_width: usize,

    /// Candidate evaluations allowed; `None` for effectively unbounded
    pub max_evaluations: Option<usize>,

    /// Wall-clock budget in seconds
    pub time_budget_secs: Option<f64>,

    /// Seed handed to seeded operators
    pub seed: u64,

    /// Run categorical crossing and selection on the final incumbent
    pub enable_post_process: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            beam_width: DEFAULT_BEAM_WIDTH,
            max_evaluations: None,
            time_budget_secs: None,
            seed: 1,
            enable_post_process: true,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: SearchConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_evaluations(mut self, n: usize) -> Self {
        self.max_evaluations = Some(n);
        self
    }

    pub fn with_time_budget(mut self, secs: f64) -> Self {
        self.time_budget_secs = Some(secs);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_beam_width(mut self, width: usize) -> Self {
        self.beam_width = width;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_post_process(mut self, enabled: bool) -> Self {
        self.enable_post_process = enabled;
        self
    }

    /// Evaluation cap with `None` resolved
    pub fn evaluation_limit(&self) -> usize {
        self.max_evaluations.unwrap_or(UNBOUNDED_EVALUATIONS)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(KolosalError::ConfigError("max_depth must be at least 1".to_string()));
        }
        if self.beam_width == 0 {
            return Err(KolosalError::ConfigError("beam_width must be at least 1".to_string()));
        }
        if self.max_evaluations == Some(0) {
            return Err(KolosalError::ConfigError(
                "max_evaluations must be at least 1".to_string(),
            ));
        }
        if let Some(t) = self.time_budget_secs {
            if !(t > 0.0 && t.is_finite()) {
                return Err(KolosalError::ConfigError(format!(
                    "time_budget_secs must be positive, got {}",
                    t
                )));
            }
        }
        Ok(())
    }
}
