//! Organism records and the taxonomy file format.
//!
//! An organism is placed in a fixed four-level classification:
//!
//! ```text
//! Germes › <family> › <source> › <origin leaf>
//! e.g.  Germes › Bactéries › Humains › Flore fécale
//! ```
//!
//! The origin leaf scopes corrective measures, so it is exposed directly via
//! [`ClassificationPath::origin`].

use crate::{parse_yaml, render_yaml, RecordsError, RecordsResult};
use serde::{Deserialize, Serialize};
use urc_types::{NonEmptyText, RiskTier};

/// Label of the fixed root level of every classification path.
pub const TAXONOMY_ROOT: &str = "Germes";

// ============================================================================
// Public domain-level types
// ============================================================================

/// Four-level classification path: fixed root, family, source, origin leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassificationPath {
    family: NonEmptyText,
    source: NonEmptyText,
    origin: NonEmptyText,
}

impl ClassificationPath {
    /// Builds a path under [`TAXONOMY_ROOT`].
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::InvalidInput`] if any level is blank.
    pub fn new(family: &str, source: &str, origin: &str) -> RecordsResult<Self> {
        let level = |value: &str, name: &str| {
            NonEmptyText::new(value).map_err(|_| {
                RecordsError::InvalidInput(format!("classification {name} cannot be empty"))
            })
        };
        Ok(Self {
            family: level(family, "family")?,
            source: level(source, "source")?,
            origin: level(origin, "origin")?,
        })
    }

    /// Builds a path from a full root-to-leaf sequence.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::InvalidInput`] unless `levels` has exactly four entries, the
    /// first of which is [`TAXONOMY_ROOT`].
    pub fn from_levels<S: AsRef<str>>(levels: &[S]) -> RecordsResult<Self> {
        let [root, family, source, origin] = levels else {
            return Err(RecordsError::InvalidInput(format!(
                "classification path must have exactly 4 levels, got {}",
                levels.len()
            )));
        };
        if root.as_ref().trim() != TAXONOMY_ROOT {
            return Err(RecordsError::InvalidInput(format!(
                "classification path must start at '{TAXONOMY_ROOT}', got '{}'",
                root.as_ref()
            )));
        }
        Self::new(family.as_ref(), source.as_ref(), origin.as_ref())
    }

    pub fn family(&self) -> &str {
        self.family.as_str()
    }

    pub fn source(&self) -> &str {
        self.source.as_str()
    }

    /// The fourth level, used to scope corrective measures.
    pub fn origin(&self) -> &str {
        self.origin.as_str()
    }

    /// Root-to-leaf labels.
    pub fn levels(&self) -> [&str; 4] {
        [
            TAXONOMY_ROOT,
            self.family.as_str(),
            self.source.as_str(),
            self.origin.as_str(),
        ]
    }
}

impl std::fmt::Display for ClassificationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.levels().join(" › "))
    }
}

/// Sensitivity to the Surfa'Safe disinfectant family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaSafeSensitivity {
    Sensitive,
    ModerateResistanceRisk,
    ResistanceRisk,
    BiofilmResistanceRisk,
    SporeResistanceRisk,
}

impl SurfaSafeSensitivity {
    /// Label as printed on the unit's reference sheets.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sensitive => "Sensible",
            Self::ModerateResistanceRisk => "Risque modéré de résistance",
            Self::ResistanceRisk => "Risque de résistance",
            Self::BiofilmResistanceRisk => "Risque de résistance (biofilm)",
            Self::SporeResistanceRisk => "Risque de résistance (spore)",
        }
    }

    /// Accepts either the snake_case key or the printed label.
    pub fn parse(s: &str) -> RecordsResult<Self> {
        let all = [
            Self::Sensitive,
            Self::ModerateResistanceRisk,
            Self::ResistanceRisk,
            Self::BiofilmResistanceRisk,
            Self::SporeResistanceRisk,
        ];
        let needle = s.trim();
        all.into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(needle) || v.key() == needle)
            .ok_or_else(|| {
                RecordsError::InvalidInput(format!("Invalid Surfa'Safe sensitivity: {s}"))
            })
    }

    fn key(&self) -> &'static str {
        match self {
            Self::Sensitive => "sensitive",
            Self::ModerateResistanceRisk => "moderate_resistance_risk",
            Self::ResistanceRisk => "resistance_risk",
            Self::BiofilmResistanceRisk => "biofilm_resistance_risk",
            Self::SporeResistanceRisk => "spore_resistance_risk",
        }
    }
}

/// Sensitivity to peracetic acid (APA) disinfectants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApaSensitivity {
    Sensitive,
    ModerateResistanceRisk,
    ResistanceRisk,
    SporeResistanceRisk,
}

impl ApaSensitivity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sensitive => "Sensible",
            Self::ModerateResistanceRisk => "Risque modéré de résistance",
            Self::ResistanceRisk => "Risque de résistance",
            Self::SporeResistanceRisk => "Risque de résistance (spore)",
        }
    }

    /// Accepts either the snake_case key or the printed label.
    pub fn parse(s: &str) -> RecordsResult<Self> {
        let all = [
            Self::Sensitive,
            Self::ModerateResistanceRisk,
            Self::ResistanceRisk,
            Self::SporeResistanceRisk,
        ];
        let needle = s.trim();
        all.into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(needle) || v.key() == needle)
            .ok_or_else(|| RecordsError::InvalidInput(format!("Invalid APA sensitivity: {s}")))
    }

    fn key(&self) -> &'static str {
        match self {
            Self::Sensitive => "sensitive",
            Self::ModerateResistanceRisk => "moderate_resistance_risk",
            Self::ResistanceRisk => "resistance_risk",
            Self::SporeResistanceRisk => "spore_resistance_risk",
        }
    }
}

/// One entry of the taxonomy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrganismData {
    /// Display name, unique across the taxonomy (case-insensitive).
    pub name: NonEmptyText,

    pub path: ClassificationPath,

    pub risk_tier: RiskTier,

    /// Free-text pathogenicity description.
    pub pathogenicity: String,

    pub surfa_safe: SurfaSafeSensitivity,

    pub apa: ApaSensitivity,

    /// Short note shown under the name (e.g. "Sporulé", "Levure").
    pub note: Option<String>,

    /// Longer mechanism/resistance commentary.
    pub long_comment: Option<String>,
}

impl OrganismData {
    /// Convenience accessor for the origin leaf of the classification path.
    pub fn origin(&self) -> &str {
        self.path.origin()
    }
}

// ============================================================================
// Public Taxonomy operations
// ============================================================================

/// Taxonomy file operations.
///
/// Zero-sized namespace; all methods are associated functions.
pub struct Taxonomy;

impl Taxonomy {
    /// Parse the organism collection from YAML text.
    ///
    /// Blank text is an empty taxonomy.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] if:
    /// - the YAML does not match the taxonomy schema (unknown keys, wrong types),
    /// - a classification path does not have 4 levels rooted at [`TAXONOMY_ROOT`],
    /// - two organisms share a name (case-insensitive).
    pub fn parse(yaml_text: &str) -> RecordsResult<Vec<OrganismData>> {
        if yaml_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let wire: TaxonomyWire = parse_yaml(yaml_text, "Taxonomy")?;

        let mut organisms: Vec<OrganismData> = Vec::with_capacity(wire.organisms.len());
        for (idx, entry) in wire.organisms.into_iter().enumerate() {
            let organism = wire_to_domain(entry).map_err(|e| {
                RecordsError::Translation(format!("Invalid organism at organisms[{idx}]: {e}"))
            })?;
            if organisms
                .iter()
                .any(|o| o.name.eq_ignore_case(organism.name.as_str()))
            {
                return Err(RecordsError::Translation(format!(
                    "Duplicate organism name at organisms[{idx}]: {}",
                    organism.name
                )));
            }
            organisms.push(organism);
        }
        Ok(organisms)
    }

    /// Render the organism collection as YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] if serialisation fails.
    pub fn render(organisms: &[OrganismData]) -> RecordsResult<String> {
        let wire = TaxonomyWire {
            organisms: organisms.iter().map(domain_to_wire).collect(),
        };
        render_yaml(&wire, "taxonomy")
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TaxonomyWire {
    organisms: Vec<OrganismWire>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct OrganismWire {
    name: NonEmptyText,
    path: Vec<String>,
    risk_tier: RiskTier,
    #[serde(default)]
    pathogenicity: String,
    disinfectant_sensitivity: SensitivityWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    long_comment: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct SensitivityWire {
    surfa_safe: SurfaSafeSensitivity,
    apa: ApaSensitivity,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: OrganismWire) -> RecordsResult<OrganismData> {
    let path = ClassificationPath::from_levels(&wire.path)?;
    Ok(OrganismData {
        name: wire.name,
        path,
        risk_tier: wire.risk_tier,
        pathogenicity: wire.pathogenicity,
        surfa_safe: wire.disinfectant_sensitivity.surfa_safe,
        apa: wire.disinfectant_sensitivity.apa,
        note: wire.note.filter(|n| !n.trim().is_empty()),
        long_comment: wire.long_comment.filter(|c| !c.trim().is_empty()),
    })
}

fn domain_to_wire(data: &OrganismData) -> OrganismWire {
    OrganismWire {
        name: data.name.clone(),
        path: data.path.levels().iter().map(|l| l.to_string()).collect(),
        risk_tier: data.risk_tier,
        pathogenicity: data.pathogenicity.clone(),
        disinfectant_sensitivity: SensitivityWire {
            surfa_safe: data.surfa_safe,
            apa: data.apa,
        },
        note: data.note.clone(),
        long_comment: data.long_comment.clone(),
    }
}
