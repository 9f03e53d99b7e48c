//! Threshold profiles and their file format.

use crate::{parse_yaml, render_yaml, RecordsError, RecordsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use urc_types::RiskTier;

/// Colony-count boundaries for one risk tier.
///
/// A count at or above `action_count` calls for immediate corrective action; at or above
/// `alert_count` it calls for a watch-and-reinforce response. `action_count >= alert_count` is
/// expected but not enforced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    pub alert_count: u32,
    pub action_count: u32,
}

impl ThresholdProfile {
    pub const fn new(alert_count: u32, action_count: u32) -> Self {
        Self {
            alert_count,
            action_count,
        }
    }

    /// True when the action boundary sits below the alert boundary.
    pub fn is_inverted(&self) -> bool {
        self.action_count < self.alert_count
    }
}

/// Threshold file operations.
pub struct Thresholds;

impl Thresholds {
    /// Parse threshold profiles from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] if the YAML does not match the schema or a tier appears twice.
    pub fn parse(yaml_text: &str) -> RecordsResult<BTreeMap<RiskTier, ThresholdProfile>> {
        if yaml_text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        let wire: ThresholdsWire = parse_yaml(yaml_text, "Thresholds")?;

        let mut profiles = BTreeMap::new();
        for (idx, p) in wire.profiles.into_iter().enumerate() {
            let profile = ThresholdProfile::new(p.alert, p.action);
            if profiles.insert(p.risk_tier, profile).is_some() {
                return Err(RecordsError::Translation(format!(
                    "Duplicate risk tier {} at profiles[{idx}]",
                    p.risk_tier
                )));
            }
        }
        Ok(profiles)
    }

    /// Render threshold profiles as YAML text, most critical tier first.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] if serialisation fails.
    pub fn render(profiles: &BTreeMap<RiskTier, ThresholdProfile>) -> RecordsResult<String> {
        let wire = ThresholdsWire {
            profiles: profiles
                .iter()
                .rev()
                .map(|(tier, p)| ProfileWire {
                    risk_tier: *tier,
                    alert: p.alert_count,
                    action: p.action_count,
                })
                .collect(),
        };
        render_yaml(&wire, "thresholds")
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ThresholdsWire {
    profiles: Vec<ProfileWire>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ProfileWire {
    risk_tier: RiskTier,
    alert: u32,
    action: u32,
}
