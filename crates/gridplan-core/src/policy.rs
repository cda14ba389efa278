//! Evaluation policy.
//!
//! Constants that decide feasibility but are not part of an instance (the
//! global reliability threshold, numeric tolerance, whether built-but-idle
//! substations are acceptable) live in [`EvaluationPolicy`]. The policy is
//! passed explicitly into every evaluation call; there is no process-wide
//! default that code can mutate.
//!
//! A policy can be written as TOML; unspecified keys use the defaults:
//!
//! ```toml
//! failure_threshold = 0.05
//! tolerance = 1e-9
//! allow_idle_sites = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// Policy constants applied during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationPolicy {
    /// Maximum failure probability a site may have, unless the site's own
    /// reliability parameters override it.
    pub failure_threshold: f64,

    /// Absolute tolerance for flow/demand equality and capacity checks.
    pub tolerance: f64,

    /// Whether an activated site carrying no load is acceptable.
    pub allow_idle_sites: bool,
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 0.05,
            tolerance: 1e-9,
            allow_idle_sites: true,
        }
    }
}

impl EvaluationPolicy {
    /// Set the global failure-probability threshold
    pub fn with_failure_threshold(mut self, threshold: f64) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set the numeric tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Allow or reject activated sites with zero load
    pub fn with_idle_sites(mut self, allow: bool) -> Self {
        self.allow_idle_sites = allow;
        self
    }

    /// Parse a policy from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> GridResult<Self> {
        let policy: EvaluationPolicy = toml::from_str(text)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy file.
    pub fn load(path: impl AsRef<Path>) -> GridResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading evaluation policy");
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> GridResult<String> {
        toml::to_string(self).map_err(|e| GridError::Config(e.to_string()))
    }

    /// Reject thresholds outside [0, 1] and negative or non-finite tolerances.
    pub fn validate(&self) -> GridResult<()> {
        if !(0.0..=1.0).contains(&self.failure_threshold) {
            return Err(GridError::Config(format!(
                "failure_threshold must be within [0, 1], got {}",
                self.failure_threshold
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(GridError::Config(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}
