//! Corrective measures and the measure catalog file format.
//!
//! A measure applies to a triggered status when three independent predicates hold: its
//! [`MeasureScope`] covers the organism's origin leaf, its [`MeasureType`] answers the
//! triggered status, and its [`RiskFilter`] admits the organism's tier. The predicates are
//! exposed separately so callers can compose them (selection vs. administration filtering).

use crate::{parse_yaml, render_yaml, RecordsError, RecordsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use urc_types::{NonEmptyText, RiskTier};

/// Sentinel used on the wire for "every origin" / "every tier".
const ALL: &str = "all";

// ============================================================================
// Public domain-level types
// ============================================================================

/// Which origin leaves a measure applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeasureScope {
    All,
    /// Exactly one origin leaf, compared by exact string match.
    Origin(NonEmptyText),
}

impl MeasureScope {
    pub fn covers(&self, origin_leaf: &str) -> bool {
        match self {
            Self::All => true,
            Self::Origin(origin) => origin.as_str() == origin_leaf,
        }
    }

    /// Parses `"all"` or an origin label.
    pub fn parse(s: &str) -> RecordsResult<Self> {
        if s.trim() == ALL {
            return Ok(Self::All);
        }
        NonEmptyText::new(s)
            .map(Self::Origin)
            .map_err(|_| RecordsError::InvalidInput("measure scope cannot be empty".into()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL,
            Self::Origin(origin) => origin.as_str(),
        }
    }
}

/// Which risk tiers a measure applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RiskFilter {
    All,
    Single(RiskTier),
    Set(BTreeSet<RiskTier>),
}

impl RiskFilter {
    /// Builds a filter from a list of tiers. One tier becomes [`RiskFilter::Single`].
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::InvalidInput`] if `tiers` is empty.
    pub fn from_tiers(tiers: impl IntoIterator<Item = RiskTier>) -> RecordsResult<Self> {
        let tiers: BTreeSet<RiskTier> = tiers.into_iter().collect();
        let mut iter = tiers.iter();
        match (iter.next(), iter.next()) {
            (None, _) => Err(RecordsError::InvalidInput(
                "risk filter list cannot be empty".into(),
            )),
            (Some(single), None) => Ok(Self::Single(*single)),
            _ => Ok(Self::Set(tiers)),
        }
    }

    /// Rejects a filter that admits no tier, which the catalog file cannot hold.
    pub fn validate(&self) -> RecordsResult<()> {
        match self {
            Self::Set(tiers) if tiers.is_empty() => Err(RecordsError::InvalidInput(
                "risk filter list cannot be empty".into(),
            )),
            _ => Ok(()),
        }
    }

    pub fn admits(&self, tier: RiskTier) -> bool {
        match self {
            Self::All => true,
            Self::Single(single) => *single == tier,
            Self::Set(tiers) => tiers.contains(&tier),
        }
    }

    /// Parses `"all"`, a single tier (`"4"`) or a comma-separated set (`"3,4,5"`).
    pub fn parse(s: &str) -> RecordsResult<Self> {
        let trimmed = s.trim().trim_start_matches('[').trim_end_matches(']');
        if trimmed == ALL {
            return Ok(Self::All);
        }
        let tiers = trimmed
            .split(',')
            .map(|part| {
                part.parse::<RiskTier>()
                    .map_err(|e| RecordsError::InvalidInput(format!("invalid risk filter: {e}")))
            })
            .collect::<RecordsResult<Vec<_>>>()?;
        Self::from_tiers(tiers)
    }
}

impl std::fmt::Display for RiskFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str(ALL),
            Self::Single(tier) => write!(f, "{tier}"),
            Self::Set(tiers) => {
                let parts: Vec<String> = tiers.iter().map(|t| t.to_string()).collect();
                write!(f, "[{}]", parts.join(","))
            }
        }
    }
}

/// Whether a measure answers an alert, an action, or both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureType {
    Alert,
    Action,
    Both,
}

impl MeasureType {
    /// True when a measure of this type answers `triggered`.
    pub fn answers(&self, triggered: MeasureType) -> bool {
        *self == triggered || *self == Self::Both
    }

    pub fn parse(s: &str) -> RecordsResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "alert" => Ok(Self::Alert),
            "action" => Ok(Self::Action),
            "both" => Ok(Self::Both),
            _ => Err(RecordsError::InvalidInput(format!(
                "Invalid measure type: {s}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Action => "action",
            Self::Both => "both",
        }
    }
}

/// A rule in the measure catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrectiveMeasureData {
    pub id: NonEmptyText,
    pub text: NonEmptyText,
    pub scope: MeasureScope,
    pub risk: RiskFilter,
    pub measure_type: MeasureType,
}

impl CorrectiveMeasureData {
    /// Whether this measure belongs on the checklist for the given situation.
    pub fn applies(&self, origin_leaf: &str, tier: RiskTier, triggered: MeasureType) -> bool {
        self.scope.covers(origin_leaf)
            && self.measure_type.answers(triggered)
            && self.risk.admits(tier)
    }
}

// ============================================================================
// Public MeasureCatalog operations
// ============================================================================

/// Measure catalog file operations.
pub struct MeasureCatalog;

impl MeasureCatalog {
    /// Parse the catalog from YAML text, preserving entry order.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] if the YAML does not match the schema, a risk filter keyword is
    /// not `all`, a risk set is empty, or two measures share an id.
    pub fn parse(yaml_text: &str) -> RecordsResult<Vec<CorrectiveMeasureData>> {
        if yaml_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let wire: CatalogWire = parse_yaml(yaml_text, "Measure catalog")?;

        let mut measures: Vec<CorrectiveMeasureData> = Vec::with_capacity(wire.measures.len());
        for (idx, m) in wire.measures.into_iter().enumerate() {
            let measure = wire_to_domain(m).map_err(|e| {
                RecordsError::Translation(format!("Invalid measure at measures[{idx}]: {e}"))
            })?;
            if measures.iter().any(|existing| existing.id == measure.id) {
                return Err(RecordsError::Translation(format!(
                    "Duplicate measure id at measures[{idx}]: {}",
                    measure.id
                )));
            }
            measures.push(measure);
        }
        Ok(measures)
    }

    /// Render the catalog as YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] if a risk set is empty or serialisation fails.
    pub fn render(measures: &[CorrectiveMeasureData]) -> RecordsResult<String> {
        let wire = CatalogWire {
            measures: measures
                .iter()
                .map(domain_to_wire)
                .collect::<RecordsResult<Vec<_>>>()?,
        };
        render_yaml(&wire, "measure catalog")
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct CatalogWire {
    measures: Vec<MeasureWire>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct MeasureWire {
    id: NonEmptyText,
    text: NonEmptyText,
    scope: String,
    risk: RiskFilterWire,
    #[serde(rename = "type")]
    measure_type: MeasureType,
}

/// `all`, a bare tier, or a list of tiers.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
enum RiskFilterWire {
    Single(RiskTier),
    Set(Vec<RiskTier>),
    Keyword(String),
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: MeasureWire) -> RecordsResult<CorrectiveMeasureData> {
    let risk = match wire.risk {
        RiskFilterWire::Keyword(k) if k == ALL => RiskFilter::All,
        RiskFilterWire::Keyword(k) => {
            return Err(RecordsError::InvalidInput(format!(
                "risk filter must be '{ALL}', a tier, or a list of tiers, got '{k}'"
            )))
        }
        RiskFilterWire::Single(tier) => RiskFilter::Single(tier),
        RiskFilterWire::Set(tiers) if tiers.is_empty() => {
            return Err(RecordsError::InvalidInput(
                "risk filter list cannot be empty".into(),
            ))
        }
        RiskFilterWire::Set(tiers) => RiskFilter::Set(tiers.into_iter().collect()),
    };

    Ok(CorrectiveMeasureData {
        id: wire.id,
        text: wire.text,
        scope: MeasureScope::parse(&wire.scope)?,
        risk,
        measure_type: wire.measure_type,
    })
}

fn domain_to_wire(data: &CorrectiveMeasureData) -> RecordsResult<MeasureWire> {
    data.risk.validate()?;
    let risk = match &data.risk {
        RiskFilter::All => RiskFilterWire::Keyword(ALL.into()),
        RiskFilter::Single(tier) => RiskFilterWire::Single(*tier),
        RiskFilter::Set(tiers) => RiskFilterWire::Set(tiers.iter().copied().collect()),
    };
    Ok(MeasureWire {
        id: data.id.clone(),
        text: data.text.clone(),
        scope: data.scope.as_str().to_string(),
        risk,
        measure_type: data.measure_type,
    })
}
