//! Surveillance record carriers and on-disk wire formats.
//!
//! This crate defines the data every other URC crate operates on, plus the strict YAML wire
//! formats used to persist each collection as a whole file:
//!
//! | Facade | Collection | File (by convention) |
//! |--------|------------|----------------------|
//! | [`Taxonomy`] | organisms | `organisms.yaml` |
//! | [`Thresholds`] | threshold profiles by risk tier | `thresholds.yaml` |
//! | [`MeasureCatalog`] | corrective measures | `measures.yaml` |
//! | [`CollectionPoints`] | collection points | `collection_points.yaml` |
//! | [`Samples`] | samples | `samples.yaml` |
//! | [`Schedules`] | scheduled readings | `schedules.yaml` |
//! | [`Identifications`] | pending identifications | `identifications.yaml` |
//! | [`Ledger`] | surveillance records | `ledger.yaml` |
//!
//! Each facade exposes `parse(yaml) -> Vec<Data>` and `render(&[Data]) -> yaml`. Wire structs
//! are private and use `#[serde(deny_unknown_fields)]`; schema mismatches are reported with the
//! failing field path via `serde_path_to_error`.
//!
//! This crate does no I/O. Reading and writing files belongs to `urc-core`.

pub mod ledger;
pub mod measure;
pub mod organism;
pub mod reading;
pub mod sample;
pub mod threshold;

pub use ledger::{confidence_percent, Ledger, LedgerRow, RecordStatus, SurveillanceRecordData};
pub use measure::{CorrectiveMeasureData, MeasureCatalog, MeasureScope, MeasureType, RiskFilter};
pub use organism::{
    ApaSensitivity, ClassificationPath, OrganismData, SurfaSafeSensitivity, Taxonomy,
    TAXONOMY_ROOT,
};
pub use reading::{
    IdentificationStatus, Identifications, PendingIdentificationData, ReadingMilestone,
    ReadingStatus, ScheduledReadingData, Schedules,
};
pub use sample::{CollectionPoint, CollectionPoints, SampleData, SampleType, Samples};
pub use threshold::{ThresholdProfile, Thresholds};

pub use urc_types::{NonEmptyText, RiskTier};
pub use urc_uuid::RecordId;

/// Errors returned by the records crate.
#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for results that can fail with a [`RecordsError`].
pub type RecordsResult<T> = Result<T, RecordsError>;

/// Deserialises `yaml_text` into `T`, reporting the failing field path on mismatch.
///
/// `what` names the collection in the error message, e.g. `"Taxonomy"`.
pub(crate) fn parse_yaml<T>(yaml_text: &str, what: &str) -> RecordsResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

    match serde_path_to_error::deserialize::<_, T>(deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(RecordsError::Translation(format!(
                "{what} schema mismatch at {path}: {source}"
            )))
        }
    }
}

/// Serialises `wire` to YAML, naming the collection on failure.
pub(crate) fn render_yaml<T>(wire: &T, what: &str) -> RecordsResult<String>
where
    T: serde::Serialize,
{
    serde_yaml::to_string(wire)
        .map_err(|e| RecordsError::Translation(format!("Failed to serialize {what}: {e}")))
}
