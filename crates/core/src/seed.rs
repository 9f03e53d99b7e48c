//! Bundled seed data: default taxonomy, threshold profiles and measure catalog.
//!
//! The seed files are embedded at compile time and parsed with the same wire formats used for
//! the data directory, so a seed file can be copied into the data directory as-is.

use crate::{SurveillanceError, SurveillanceResult};
use std::collections::BTreeMap;
use urc_records::{
    CorrectiveMeasureData, MeasureCatalog, OrganismData, Taxonomy, ThresholdProfile, Thresholds,
};
use urc_types::RiskTier;

const ORGANISMS_SEED: &str = include_str!("../seed/organisms.yaml");
const THRESHOLDS_SEED: &str = include_str!("../seed/thresholds.yaml");
const MEASURES_SEED: &str = include_str!("../seed/measures.yaml");

pub fn default_organisms() -> SurveillanceResult<Vec<OrganismData>> {
    Taxonomy::parse(ORGANISMS_SEED).map_err(|source| SurveillanceError::Seed {
        what: "organisms",
        source,
    })
}

pub fn default_thresholds() -> SurveillanceResult<BTreeMap<RiskTier, ThresholdProfile>> {
    Thresholds::parse(THRESHOLDS_SEED).map_err(|source| SurveillanceError::Seed {
        what: "thresholds",
        source,
    })
}

pub fn default_measures() -> SurveillanceResult<Vec<CorrectiveMeasureData>> {
    MeasureCatalog::parse(MEASURES_SEED).map_err(|source| SurveillanceError::Seed {
        what: "measures",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use urc_records::{MeasureScope, RiskFilter};

    fn tier(v: i64) -> RiskTier {
        RiskTier::new(v).expect("valid tier")
    }

    #[test]
    fn test_seed_taxonomy_parses() {
        let organisms = default_organisms().expect("seed taxonomy");
        assert_eq!(organisms.len(), 51);
        let ecoli = organisms
            .iter()
            .find(|o| o.name.as_str() == "Escherichia coli")
            .expect("E. coli in seed");
        assert_eq!(ecoli.risk_tier, tier(4));
        assert_eq!(ecoli.origin(), "Flore fécale");
    }

    #[test]
    fn test_seed_keeps_first_of_repeated_names() {
        let organisms = default_organisms().expect("seed taxonomy");
        let burkholderia: Vec<_> = organisms
            .iter()
            .filter(|o| o.name.as_str() == "Burkholderia cepacia")
            .collect();
        assert_eq!(burkholderia.len(), 1);
        assert_eq!(burkholderia[0].origin(), "Humidité");
    }

    #[test]
    fn test_seed_thresholds() {
        let profiles = default_thresholds().expect("seed thresholds");
        assert_eq!(profiles.len(), 5);
        assert_eq!(profiles[&tier(5)], ThresholdProfile::new(1, 1));
        assert_eq!(profiles[&tier(4)], ThresholdProfile::new(10, 25));
        assert_eq!(profiles[&tier(3)], ThresholdProfile::new(25, 40));
        assert_eq!(profiles[&tier(2)], ThresholdProfile::new(25, 40));
        assert_eq!(profiles[&tier(1)], ThresholdProfile::new(40, 50));
    }

    #[test]
    fn test_seed_measures() {
        let measures = default_measures().expect("seed measures");
        assert_eq!(measures.len(), 52);
        assert_eq!(measures[0].id.as_str(), "m001");
        assert_eq!(measures[0].scope, MeasureScope::All);
        assert_eq!(measures[0].risk, RiskFilter::All);

        let nebulisation = measures
            .iter()
            .find(|m| m.id.as_str() == "m025")
            .expect("m025");
        assert!(nebulisation.risk.admits(tier(5)));
        assert!(!nebulisation.risk.admits(tier(4)));
    }
}
