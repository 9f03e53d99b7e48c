//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the service as an
//! `Arc<CoreConfig>`. Nothing in this crate reads environment variables; binaries do that and
//! build a `CoreConfig` from the result.

use crate::constants::{
    ACCEPTANCE_FLOOR, DEFAULT_DATA_DIR, FALLBACK_ACTION_COUNT, FALLBACK_ALERT_COUNT,
    GENUS_EXACT_SCORE, GENUS_WEIGHT,
};
use crate::{SurveillanceError, SurveillanceResult};
use std::path::{Path, PathBuf};
use urc_records::ThresholdProfile;

/// Scoring constants of the organism matcher.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchPolicy {
    /// Score for a candidate whose genus equals the query genus.
    pub genus_exact_score: f64,
    /// Weight applied to genus-only similarity.
    pub genus_weight: f64,
    /// Scores must be strictly above this to be accepted.
    pub acceptance_floor: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            genus_exact_score: GENUS_EXACT_SCORE,
            genus_weight: GENUS_WEIGHT,
            acceptance_floor: ACCEPTANCE_FLOOR,
        }
    }
}

impl MatchPolicy {
    pub fn accepts(&self, score: f64) -> bool {
        score > self.acceptance_floor
    }

    fn validate(&self) -> SurveillanceResult<()> {
        for (name, value) in [
            ("genus_exact_score", self.genus_exact_score),
            ("genus_weight", self.genus_weight),
            ("acceptance_floor", self.acceptance_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SurveillanceError::InvalidInput(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    match_policy: MatchPolicy,
    fallback_profile: ThresholdProfile,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`SurveillanceError::InvalidInput`] if `data_dir` is empty or a matcher constant
    /// lies outside `[0, 1]`.
    pub fn new(
        data_dir: PathBuf,
        match_policy: MatchPolicy,
        fallback_profile: ThresholdProfile,
    ) -> SurveillanceResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(SurveillanceError::InvalidInput(
                "data_dir cannot be empty".into(),
            ));
        }
        match_policy.validate()?;

        Ok(Self {
            data_dir,
            match_policy,
            fallback_profile,
        })
    }

    /// Configuration with default matcher policy and fallback thresholds.
    pub fn with_data_dir(data_dir: PathBuf) -> SurveillanceResult<Self> {
        Self::new(
            data_dir,
            MatchPolicy::default(),
            ThresholdProfile::new(FALLBACK_ALERT_COUNT, FALLBACK_ACTION_COUNT),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn match_policy(&self) -> MatchPolicy {
        self.match_policy
    }

    pub fn fallback_profile(&self) -> ThresholdProfile {
        self.fallback_profile
    }
}

/// Resolve the data directory from an optional override value.
///
/// `None` or a blank value selects [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}
