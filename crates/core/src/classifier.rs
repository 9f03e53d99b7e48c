//! Threshold registry and alert/action classification.

use std::collections::BTreeMap;
use urc_records::{RecordStatus, ThresholdProfile};
use urc_types::RiskTier;

/// Threshold profiles by risk tier, with a fallback for unconfigured tiers.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdRegistry {
    profiles: BTreeMap<RiskTier, ThresholdProfile>,
    fallback: ThresholdProfile,
}

impl ThresholdRegistry {
    pub fn new(profiles: BTreeMap<RiskTier, ThresholdProfile>, fallback: ThresholdProfile) -> Self {
        for (tier, profile) in &profiles {
            warn_if_inverted(*tier, profile);
        }
        Self { profiles, fallback }
    }

    /// Profile configured for `tier`, or the fallback.
    pub fn profile_for(&self, tier: RiskTier) -> ThresholdProfile {
        match self.profiles.get(&tier) {
            Some(profile) => *profile,
            None => {
                tracing::warn!(tier = tier.value(), "no threshold profile configured, using fallback");
                self.fallback
            }
        }
    }

    pub fn configured(&self) -> &BTreeMap<RiskTier, ThresholdProfile> {
        &self.profiles
    }

    /// Replaces the profile for one tier. Inverted profiles are kept but logged.
    pub fn set(&mut self, tier: RiskTier, profile: ThresholdProfile) {
        warn_if_inverted(tier, &profile);
        self.profiles.insert(tier, profile);
    }

    /// Replaces every profile.
    pub fn replace_all(&mut self, profiles: BTreeMap<RiskTier, ThresholdProfile>) {
        self.profiles = profiles;
    }

    /// Effective profile for every tier, most critical first.
    ///
    /// A tier missing from the registry shows the value from `defaults` for that tier, then
    /// the fallback.
    pub fn effective(
        &self,
        defaults: &BTreeMap<RiskTier, ThresholdProfile>,
    ) -> Vec<(RiskTier, ThresholdProfile)> {
        RiskTier::ALL_DESCENDING
            .iter()
            .map(|tier| {
                let profile = self
                    .profiles
                    .get(tier)
                    .or_else(|| defaults.get(tier))
                    .copied()
                    .unwrap_or(self.fallback);
                (*tier, profile)
            })
            .collect()
    }

    /// Classify a colony count for an organism of `tier`.
    pub fn classify(&self, tier: RiskTier, colony_count: u32) -> Classification {
        let profile = self.profile_for(tier);
        Classification {
            status: classify(colony_count, &profile),
            profile,
        }
    }
}

/// A status with the thresholds that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub status: RecordStatus,
    pub profile: ThresholdProfile,
}

/// Action-first classification: the action boundary is checked before the alert boundary.
pub fn classify(colony_count: u32, profile: &ThresholdProfile) -> RecordStatus {
    if colony_count >= profile.action_count {
        RecordStatus::Action
    } else if colony_count >= profile.alert_count {
        RecordStatus::Alert
    } else {
        RecordStatus::Ok
    }
}

fn warn_if_inverted(tier: RiskTier, profile: &ThresholdProfile) {
    if profile.is_inverted() {
        tracing::warn!(
            tier = tier.value(),
            alert = profile.alert_count,
            action = profile.action_count,
            "threshold profile has action count below alert count"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn tier(v: i64) -> RiskTier {
        RiskTier::new(v).expect("valid tier")
    }

    fn registry() -> ThresholdRegistry {
        ThresholdRegistry::new(
            seed::default_thresholds().expect("seed"),
            ThresholdProfile::new(25, 40),
        )
    }

    #[test]
    fn test_critical_tier_single_colony_is_action() {
        let result = registry().classify(tier(5), 1);
        assert_eq!(result.status, RecordStatus::Action);
        assert_eq!(result.profile, ThresholdProfile::new(1, 1));
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let registry = registry();
        assert_eq!(registry.classify(tier(4), 9).status, RecordStatus::Ok);
        assert_eq!(registry.classify(tier(4), 10).status, RecordStatus::Alert);
        assert_eq!(registry.classify(tier(4), 25).status, RecordStatus::Action);
        assert_eq!(registry.classify(tier(4), 30).status, RecordStatus::Action);
    }

    #[test]
    fn test_zero_count_is_ok() {
        assert_eq!(registry().classify(tier(3), 0).status, RecordStatus::Ok);
    }

    #[test]
    fn test_inverted_profile_is_action_first() {
        let profile = ThresholdProfile::new(30, 20);
        assert_eq!(classify(20, &profile), RecordStatus::Action);
        assert_eq!(classify(19, &profile), RecordStatus::Ok);
    }

    #[test]
    fn test_unconfigured_tier_falls_back() {
        let registry = ThresholdRegistry::new(BTreeMap::new(), ThresholdProfile::new(25, 40));
        let result = registry.classify(tier(2), 39);
        assert_eq!(result.status, RecordStatus::Alert);
        assert_eq!(result.profile, ThresholdProfile::new(25, 40));
    }

    #[test]
    fn test_effective_uses_defaults_then_fallback() {
        let mut profiles = BTreeMap::new();
        profiles.insert(tier(5), ThresholdProfile::new(2, 3));
        let registry = ThresholdRegistry::new(profiles, ThresholdProfile::new(25, 40));

        let mut defaults = BTreeMap::new();
        defaults.insert(tier(4), ThresholdProfile::new(10, 25));

        let effective = registry.effective(&defaults);
        assert_eq!(effective[0], (tier(5), ThresholdProfile::new(2, 3)));
        assert_eq!(effective[1], (tier(4), ThresholdProfile::new(10, 25)));
        assert_eq!(effective[4], (tier(1), ThresholdProfile::new(25, 40)));
    }
}
