//! Corrective measure selection and catalog administration.

use crate::constants::CUSTOM_MEASURE_SUFFIX;
use crate::{SurveillanceError, SurveillanceResult};
use urc_records::{
    CorrectiveMeasureData, MeasureScope, MeasureType, NonEmptyText, RecordStatus, RiskFilter,
};
use urc_types::RiskTier;

/// What to do after a classification.
#[derive(Clone, Debug, PartialEq)]
pub enum CorrectiveAction {
    /// The status is `ok`; no checklist is requested.
    NotRequired,
    /// At least one measure applies, in catalog order.
    Measures(Vec<CorrectiveMeasureData>),
    /// The status calls for measures but none are configured for this situation.
    NoConfiguredMeasure,
}

/// Measures that apply to an organism of `origin_leaf` and `tier` for the `triggered` type.
///
/// Catalog order is preserved. Pure and idempotent.
pub fn select_measures<'a>(
    catalog: &'a [CorrectiveMeasureData],
    origin_leaf: &str,
    tier: RiskTier,
    triggered: MeasureType,
) -> Vec<&'a CorrectiveMeasureData> {
    catalog
        .iter()
        .filter(|m| m.applies(origin_leaf, tier, triggered))
        .collect()
}

/// Checklist for an explicit triggered type, with an empty selection made explicit.
pub fn checklist(
    catalog: &[CorrectiveMeasureData],
    origin_leaf: &str,
    tier: RiskTier,
    triggered: MeasureType,
) -> CorrectiveAction {
    let selected = select_measures(catalog, origin_leaf, tier, triggered);
    if selected.is_empty() {
        tracing::warn!(
            origin = origin_leaf,
            tier = tier.value(),
            triggered = triggered.as_str(),
            "no configured measure"
        );
        CorrectiveAction::NoConfiguredMeasure
    } else {
        CorrectiveAction::Measures(selected.into_iter().cloned().collect())
    }
}

/// Turns a status into the checklist the operator should see.
pub fn corrective_action(
    catalog: &[CorrectiveMeasureData],
    origin_leaf: &str,
    tier: RiskTier,
    status: RecordStatus,
) -> CorrectiveAction {
    match status {
        RecordStatus::Ok => CorrectiveAction::NotRequired,
        RecordStatus::Alert => checklist(catalog, origin_leaf, tier, MeasureType::Alert),
        RecordStatus::Action => checklist(catalog, origin_leaf, tier, MeasureType::Action),
    }
}

// ============================================================================
// Catalog administration
// ============================================================================

/// Editable fields of a measure.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasureDraft {
    pub text: String,
    pub scope: MeasureScope,
    pub risk: RiskFilter,
    pub measure_type: MeasureType,
}

/// Optional criteria for the administration view. Unset criteria match everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeasureFilter {
    /// Exact scope match (`all` selects only catalog-wide measures).
    pub scope: Option<MeasureScope>,
    /// Matches measures of this type or `both`.
    pub measure_type: Option<MeasureType>,
    /// Matches measures whose risk filter admits this tier.
    pub tier: Option<RiskTier>,
}

impl MeasureFilter {
    pub fn matches(&self, measure: &CorrectiveMeasureData) -> bool {
        self.scope.as_ref().map_or(true, |s| *s == measure.scope)
            && self
                .measure_type
                .map_or(true, |t| measure.measure_type.answers(t))
            && self.tier.map_or(true, |t| measure.risk.admits(t))
    }
}

pub fn filter_measures<'a>(
    catalog: &'a [CorrectiveMeasureData],
    filter: &MeasureFilter,
) -> Vec<&'a CorrectiveMeasureData> {
    catalog.iter().filter(|m| filter.matches(m)).collect()
}

/// Measures grouped by scope: `all` first, then origins in first-seen order.
pub fn group_by_scope(
    catalog: &[CorrectiveMeasureData],
) -> Vec<(MeasureScope, Vec<&CorrectiveMeasureData>)> {
    let mut groups: Vec<(MeasureScope, Vec<&CorrectiveMeasureData>)> =
        vec![(MeasureScope::All, Vec::new())];
    for measure in catalog {
        match groups.iter_mut().find(|(scope, _)| *scope == measure.scope) {
            Some((_, members)) => members.push(measure),
            None => groups.push((measure.scope.clone(), vec![measure])),
        }
    }
    groups.retain(|(_, members)| !members.is_empty());
    groups
}

/// Next free id of the form `m{n:03}_custom`, starting from the catalog length + 1.
pub fn next_custom_id(catalog: &[CorrectiveMeasureData]) -> String {
    let mut n = catalog.len() + 1;
    loop {
        let candidate = format!("m{n:03}{CUSTOM_MEASURE_SUFFIX}");
        if !catalog.iter().any(|m| m.id.as_str() == candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Appends a measure built from `draft` and returns it.
///
/// # Errors
///
/// - [`SurveillanceError::Text`] if the text is blank.
/// - [`SurveillanceError::Records`] if the risk filter admits no tier.
pub fn add_measure(
    catalog: &mut Vec<CorrectiveMeasureData>,
    draft: MeasureDraft,
) -> SurveillanceResult<CorrectiveMeasureData> {
    draft.risk.validate()?;
    let measure = CorrectiveMeasureData {
        id: NonEmptyText::new(next_custom_id(catalog))?,
        text: NonEmptyText::new(&draft.text)?,
        scope: draft.scope,
        risk: draft.risk,
        measure_type: draft.measure_type,
    };
    catalog.push(measure.clone());
    Ok(measure)
}

/// Replaces the editable fields of measure `id` in place.
pub fn edit_measure(
    catalog: &mut [CorrectiveMeasureData],
    id: &str,
    draft: MeasureDraft,
) -> SurveillanceResult<CorrectiveMeasureData> {
    let text = NonEmptyText::new(&draft.text)?;
    draft.risk.validate()?;
    let measure = catalog
        .iter_mut()
        .find(|m| m.id.as_str() == id)
        .ok_or_else(|| SurveillanceError::NotFound(format!("measure {id}")))?;
    measure.text = text;
    measure.scope = draft.scope;
    measure.risk = draft.risk;
    measure.measure_type = draft.measure_type;
    Ok(measure.clone())
}

pub fn delete_measure(
    catalog: &mut Vec<CorrectiveMeasureData>,
    id: &str,
) -> SurveillanceResult<CorrectiveMeasureData> {
    let idx = catalog
        .iter()
        .position(|m| m.id.as_str() == id)
        .ok_or_else(|| SurveillanceError::NotFound(format!("measure {id}")))?;
    Ok(catalog.remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn tier(v: i64) -> RiskTier {
        RiskTier::new(v).expect("valid tier")
    }

    fn ids(measures: &[&CorrectiveMeasureData]) -> Vec<String> {
        measures.iter().map(|m| m.id.to_string()).collect()
    }

    #[test]
    fn test_fecal_action_for_major_tier() {
        let catalog = seed::default_measures().expect("seed");
        let selected = select_measures(&catalog, "Flore fécale", tier(4), MeasureType::Action);
        assert_eq!(
            ids(&selected),
            vec!["m010", "m011", "m012", "m013", "m014", "m015", "m062", "m063", "m064"]
        );
    }

    #[test]
    fn test_selection_is_idempotent() {
        let catalog = seed::default_measures().expect("seed");
        let first = select_measures(&catalog, "Air", tier(5), MeasureType::Alert);
        let second = select_measures(&catalog, "Air", tier(5), MeasureType::Alert);
        assert_eq!(first, second);
    }

    #[test]
    fn test_ok_status_requests_nothing() {
        let catalog = seed::default_measures().expect("seed");
        let action = corrective_action(&catalog, "Air", tier(5), RecordStatus::Ok);
        assert_eq!(action, CorrectiveAction::NotRequired);
    }

    #[test]
    fn test_empty_selection_is_explicit() {
        let action = corrective_action(&[], "Air", tier(5), RecordStatus::Action);
        assert_eq!(action, CorrectiveAction::NoConfiguredMeasure);
    }

    #[test]
    fn test_custom_id_skips_taken_ids() {
        let mut catalog = seed::default_measures().expect("seed");
        let first = add_measure(
            &mut catalog,
            MeasureDraft {
                text: "Vérifier le sas".into(),
                scope: MeasureScope::All,
                risk: RiskFilter::All,
                measure_type: MeasureType::Both,
            },
        )
        .expect("add");
        assert_eq!(first.id.as_str(), "m053_custom");

        catalog.remove(0);
        // Length is back to 52, so m053_custom is taken and the generator moves on.
        assert_eq!(next_custom_id(&catalog), "m054_custom");
    }

    #[test]
    fn test_add_rejects_blank_text() {
        let mut catalog = Vec::new();
        let err = add_measure(
            &mut catalog,
            MeasureDraft {
                text: "  ".into(),
                scope: MeasureScope::All,
                risk: RiskFilter::All,
                measure_type: MeasureType::Alert,
            },
        )
        .expect_err("blank text");
        assert!(err.is_validation());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_edit_and_delete_by_id() {
        let mut catalog = seed::default_measures().expect("seed");
        let edited = edit_measure(
            &mut catalog,
            "m001",
            MeasureDraft {
                text: "Documenter dans le registre".into(),
                scope: MeasureScope::All,
                risk: RiskFilter::Single(tier(5)),
                measure_type: MeasureType::Alert,
            },
        )
        .expect("edit");
        assert_eq!(edited.risk, RiskFilter::Single(tier(5)));
        assert_eq!(catalog[0].text.as_str(), "Documenter dans le registre");

        delete_measure(&mut catalog, "m001").expect("delete");
        assert!(catalog.iter().all(|m| m.id.as_str() != "m001"));

        let err = delete_measure(&mut catalog, "m001").expect_err("already gone");
        assert!(matches!(err, SurveillanceError::NotFound(_)));
    }

    #[test]
    fn test_filter_criteria_combine() {
        let catalog = seed::default_measures().expect("seed");
        let filter = MeasureFilter {
            scope: Some(MeasureScope::parse("Air").expect("scope")),
            measure_type: Some(MeasureType::Action),
            tier: Some(tier(5)),
        };
        assert_eq!(ids(&filter_measures(&catalog, &filter)), vec!["m023", "m024", "m025"]);

        let everything = filter_measures(&catalog, &MeasureFilter::default());
        assert_eq!(everything.len(), catalog.len());
    }

    #[test]
    fn test_group_by_scope_puts_all_first() {
        let catalog = seed::default_measures().expect("seed");
        let groups = group_by_scope(&catalog);
        assert_eq!(groups[0].0, MeasureScope::All);
        assert_eq!(groups[1].0.as_str(), "Air");
        let total: usize = groups.iter().map(|(_, m)| m.len()).sum();
        assert_eq!(total, catalog.len());
    }

    #[test]
    fn test_empty_risk_set_rejected_before_mutation() {
        let mut catalog = seed::default_measures().expect("seed");
        let before = catalog.clone();
        let draft = MeasureDraft {
            text: "Aucun palier".into(),
            scope: MeasureScope::All,
            risk: RiskFilter::Set(Default::default()),
            measure_type: MeasureType::Alert,
        };

        let err = add_measure(&mut catalog, draft.clone()).expect_err("empty set");
        assert!(matches!(err, SurveillanceError::Records(_)));
        let err = edit_measure(&mut catalog, "m001", draft).expect_err("empty set");
        assert!(matches!(err, SurveillanceError::Records(_)));
        assert_eq!(catalog, before);
    }
}
