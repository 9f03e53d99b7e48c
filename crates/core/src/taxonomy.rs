//! Taxonomy administration: validated add/edit/delete, grouping and backfill.

use crate::constants::UNDEFINED_PATHOGENICITY;
use crate::{SurveillanceError, SurveillanceResult};
use std::collections::{BTreeMap, HashMap};
use urc_records::{
    ApaSensitivity, ClassificationPath, NonEmptyText, OrganismData, SurfaSafeSensitivity,
};
use urc_types::RiskTier;

/// Operator-supplied organism fields before validation.
#[derive(Clone, Debug, PartialEq)]
pub struct OrganismDraft {
    pub name: String,
    /// Family, source and origin leaf. The root level is implied.
    pub family: String,
    pub source: String,
    pub origin: String,
    pub risk_tier: RiskTier,
    pub pathogenicity: String,
    pub surfa_safe: SurfaSafeSensitivity,
    pub apa: ApaSensitivity,
    pub note: String,
    pub long_comment: String,
}

impl OrganismDraft {
    fn into_organism(self) -> SurveillanceResult<OrganismData> {
        let name = NonEmptyText::new(&self.name)
            .map_err(|_| SurveillanceError::InvalidInput("organism name is required".into()))?;
        let path = ClassificationPath::new(&self.family, &self.source, &self.origin)?;
        let pathogenicity = match self.pathogenicity.trim() {
            "" => UNDEFINED_PATHOGENICITY.to_string(),
            other => other.to_string(),
        };

        Ok(OrganismData {
            name,
            path,
            risk_tier: self.risk_tier,
            pathogenicity,
            surfa_safe: self.surfa_safe,
            apa: self.apa,
            note: non_blank(self.note),
            long_comment: non_blank(self.long_comment),
        })
    }
}

/// Validates `draft` and appends it.
///
/// # Errors
///
/// Returns a validation error if the name is blank, any path level is blank, or another
/// organism already has this name (case-insensitive). Nothing is changed on error.
pub fn add_organism(
    organisms: &mut Vec<OrganismData>,
    draft: OrganismDraft,
) -> SurveillanceResult<OrganismData> {
    let organism = draft.into_organism()?;
    if organisms
        .iter()
        .any(|o| o.name.eq_ignore_case(organism.name.as_str()))
    {
        return Err(SurveillanceError::InvalidInput(format!(
            "an organism named '{}' already exists",
            organism.name
        )));
    }
    organisms.push(organism.clone());
    Ok(organism)
}

/// Replaces the organism currently named `current_name` (case-insensitive) with `draft`.
///
/// Renaming onto the name of a different organism is rejected.
pub fn edit_organism(
    organisms: &mut [OrganismData],
    current_name: &str,
    draft: OrganismDraft,
) -> SurveillanceResult<OrganismData> {
    let idx = position(organisms, current_name)?;
    let organism = draft.into_organism()?;

    let collides = organisms
        .iter()
        .enumerate()
        .any(|(i, o)| i != idx && o.name.eq_ignore_case(organism.name.as_str()));
    if collides {
        return Err(SurveillanceError::InvalidInput(format!(
            "an organism named '{}' already exists",
            organism.name
        )));
    }

    organisms[idx] = organism.clone();
    Ok(organism)
}

pub fn delete_organism(
    organisms: &mut Vec<OrganismData>,
    name: &str,
) -> SurveillanceResult<OrganismData> {
    let idx = position(organisms, name)?;
    Ok(organisms.remove(idx))
}

/// Organisms grouped by risk tier, most critical first. Empty tiers are omitted.
pub fn group_by_tier(organisms: &[OrganismData]) -> Vec<(RiskTier, Vec<&OrganismData>)> {
    let mut groups: BTreeMap<RiskTier, Vec<&OrganismData>> = BTreeMap::new();
    for organism in organisms {
        groups.entry(organism.risk_tier).or_default().push(organism);
    }
    groups.into_iter().rev().collect()
}

/// Distinct origin leaves in first-seen order.
pub fn origins(organisms: &[OrganismData]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for organism in organisms {
        if !seen.iter().any(|o| o == organism.origin()) {
            seen.push(organism.origin().to_string());
        }
    }
    seen
}

/// Fills missing notes and long comments from `defaults`, matched by exact name.
///
/// Returns the number of organisms that gained a field.
pub fn backfill(organisms: &mut [OrganismData], defaults: &[OrganismData]) -> usize {
    let by_name: HashMap<&str, &OrganismData> =
        defaults.iter().map(|d| (d.name.as_str(), d)).collect();

    let mut filled = 0;
    for organism in organisms.iter_mut() {
        let Some(default) = by_name.get(organism.name.as_str()) else {
            continue;
        };
        let mut changed = false;
        if organism.note.is_none() && default.note.is_some() {
            organism.note = default.note.clone();
            changed = true;
        }
        if organism.long_comment.is_none() && default.long_comment.is_some() {
            organism.long_comment = default.long_comment.clone();
            changed = true;
        }
        if changed {
            filled += 1;
        }
    }
    filled
}

fn position(organisms: &[OrganismData], name: &str) -> SurveillanceResult<usize> {
    organisms
        .iter()
        .position(|o| o.name.eq_ignore_case(name.trim()))
        .ok_or_else(|| SurveillanceError::NotFound(format!("organism '{}'", name.trim())))
}

fn non_blank(value: String) -> Option<String> {
    NonEmptyText::optional(value).map(NonEmptyText::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn tier(v: i64) -> RiskTier {
        RiskTier::new(v).expect("valid tier")
    }

    fn draft(name: &str) -> OrganismDraft {
        OrganismDraft {
            name: name.into(),
            family: "Bactéries".into(),
            source: "Environnemental".into(),
            origin: "Humidité".into(),
            risk_tier: tier(2),
            pathogenicity: String::new(),
            surfa_safe: SurfaSafeSensitivity::Sensitive,
            apa: ApaSensitivity::Sensitive,
            note: "  ".into(),
            long_comment: String::new(),
        }
    }

    #[test]
    fn test_add_applies_defaults() {
        let mut organisms = Vec::new();
        let added = add_organism(&mut organisms, draft("  Ralstonia pickettii ")).expect("add");
        assert_eq!(added.name.as_str(), "Ralstonia pickettii");
        assert_eq!(added.pathogenicity, UNDEFINED_PATHOGENICITY);
        assert_eq!(added.note, None);
        assert_eq!(added.path.levels()[0], "Germes");
        assert_eq!(organisms.len(), 1);
    }

    #[test]
    fn test_add_rejects_duplicate_name_case_insensitive() {
        let mut organisms = seed::default_organisms().expect("seed");
        let before = organisms.len();
        let err = add_organism(&mut organisms, draft("ESCHERICHIA COLI")).expect_err("dup");
        assert!(err.is_validation());
        assert_eq!(organisms.len(), before);
    }

    #[test]
    fn test_add_rejects_blank_path_level() {
        let mut organisms = Vec::new();
        let mut bad = draft("Ralstonia pickettii");
        bad.origin = " ".into();
        assert!(add_organism(&mut organisms, bad).is_err());
        assert!(organisms.is_empty());
    }

    #[test]
    fn test_edit_in_place_and_rename_collision() {
        let mut organisms = seed::default_organisms().expect("seed");
        let idx = organisms
            .iter()
            .position(|o| o.name.as_str() == "Hafnia alvei")
            .expect("hafnia");

        let edited = edit_organism(&mut organisms, "hafnia alvei", draft("Hafnia alvei"))
            .expect("edit keeps own name");
        assert_eq!(organisms[idx], edited);
        assert_eq!(edited.risk_tier, tier(2));

        let err = edit_organism(&mut organisms, "Hafnia alvei", draft("Proteus spp."))
            .expect_err("rename onto existing");
        assert!(err.is_validation());
    }

    #[test]
    fn test_delete_unknown_is_not_found() {
        let mut organisms = seed::default_organisms().expect("seed");
        let err = delete_organism(&mut organisms, "Nope").expect_err("missing");
        assert!(matches!(err, SurveillanceError::NotFound(_)));
        delete_organism(&mut organisms, "Mucorales").expect("delete");
        assert!(organisms.iter().all(|o| o.name.as_str() != "Mucorales"));
    }

    #[test]
    fn test_group_by_tier_most_critical_first() {
        let organisms = seed::default_organisms().expect("seed");
        let groups = group_by_tier(&organisms);
        assert_eq!(groups[0].0, tier(5));
        assert_eq!(groups.last().map(|g| g.0), Some(tier(1)));
        let total: usize = groups.iter().map(|(_, g)| g.len()).sum();
        assert_eq!(total, organisms.len());
    }

    #[test]
    fn test_origins_first_seen_order() {
        let organisms = seed::default_organisms().expect("seed");
        let origins = origins(&organisms);
        assert_eq!(origins[0], "Peau / Muqueuses");
        assert_eq!(origins[1], "Oropharynx / Gouttelettes");
        assert!(origins.contains(&"Air".to_string()));
    }

    #[test]
    fn test_backfill_restores_missing_notes() {
        let defaults = seed::default_organisms().expect("seed");
        let mut organisms = defaults.clone();
        for organism in organisms.iter_mut() {
            organism.note = None;
        }
        let filled = backfill(&mut organisms, &defaults);
        assert!(filled > 0);
        assert_eq!(organisms, defaults);
    }
}
