//! Collection points and collected samples.

use crate::{parse_yaml, render_yaml, RecordsError, RecordsResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use urc_types::NonEmptyText;
use urc_uuid::RecordId;

/// How a sample is taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    Air,
    Surface,
}

impl SampleType {
    pub fn parse(s: &str) -> RecordsResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "air" => Ok(Self::Air),
            "surface" => Ok(Self::Surface),
            _ => Err(RecordsError::InvalidInput(format!(
                "Invalid sample type: {s} (expected 'air' or 'surface')"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Air => "air",
            Self::Surface => "surface",
        }
    }
}

/// A fixed place where samples are taken. Reference data; a sample keeps its own copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionPoint {
    pub label: NonEmptyText,
    pub sample_type: SampleType,
    #[serde(default)]
    pub room_class: String,
    #[serde(default)]
    pub growth_medium: String,
}

/// One collected sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleData {
    pub id: RecordId,
    pub point: CollectionPoint,
    pub operator: String,
    pub collection_date: NaiveDate,
    pub archived: bool,
}

impl SampleData {
    pub fn label(&self) -> &str {
        self.point.label.as_str()
    }
}

/// Collection point file operations.
pub struct CollectionPoints;

impl CollectionPoints {
    /// Parse collection points from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] on a schema mismatch or when two points share a label.
    pub fn parse(yaml_text: &str) -> RecordsResult<Vec<CollectionPoint>> {
        if yaml_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let wire: PointsWire = parse_yaml(yaml_text, "Collection points")?;

        for (idx, point) in wire.points.iter().enumerate() {
            if wire.points[..idx].iter().any(|p| p.label == point.label) {
                return Err(RecordsError::Translation(format!(
                    "Duplicate collection point label at points[{idx}]: {}",
                    point.label
                )));
            }
        }
        Ok(wire.points)
    }

    pub fn render(points: &[CollectionPoint]) -> RecordsResult<String> {
        let wire = PointsWire {
            points: points.to_vec(),
        };
        render_yaml(&wire, "collection points")
    }
}

/// Sample file operations.
pub struct Samples;

impl Samples {
    /// Parse samples from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] if the YAML does not match the schema or an id repeats.
    pub fn parse(yaml_text: &str) -> RecordsResult<Vec<SampleData>> {
        if yaml_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let wire: SamplesWire = parse_yaml(yaml_text, "Samples")?;

        let mut samples: Vec<SampleData> = Vec::with_capacity(wire.samples.len());
        for (idx, s) in wire.samples.into_iter().enumerate() {
            if samples.iter().any(|existing| existing.id == s.id) {
                return Err(RecordsError::Translation(format!(
                    "Duplicate sample id at samples[{idx}]: {}",
                    s.id
                )));
            }
            samples.push(SampleData {
                id: s.id,
                point: s.point,
                operator: s.operator,
                collection_date: s.collection_date,
                archived: s.archived,
            });
        }
        Ok(samples)
    }

    pub fn render(samples: &[SampleData]) -> RecordsResult<String> {
        let wire = SamplesWire {
            samples: samples
                .iter()
                .map(|s| SampleWire {
                    id: s.id,
                    point: s.point.clone(),
                    operator: s.operator.clone(),
                    collection_date: s.collection_date,
                    archived: s.archived,
                })
                .collect(),
        };
        render_yaml(&wire, "samples")
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct PointsWire {
    points: Vec<CollectionPoint>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct SamplesWire {
    samples: Vec<SampleWire>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct SampleWire {
    id: RecordId,
    point: CollectionPoint,
    #[serde(default)]
    operator: String,
    collection_date: NaiveDate,
    #[serde(default)]
    archived: bool,
}
