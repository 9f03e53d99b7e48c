//! Load/save contracts for the persisted collections, and the YAML file store.
//!
//! Every save is a full overwrite of one collection. `load_*` returns `Ok(None)` when the
//! collection has never been saved, so callers can tell "absent" (use defaults) from "empty".
//! A file that fails to parse is renamed to `<file>.corrupt` before the error is returned.

use crate::constants::{
    COLLECTION_POINTS_FILENAME, CORRUPT_SUFFIX, IDENTIFICATIONS_FILENAME, LEDGER_FILENAME, MEASURES_FILENAME,
    ORGANISMS_FILENAME, SAMPLES_FILENAME, SCHEDULES_FILENAME, THRESHOLDS_FILENAME,
};
use crate::{SurveillanceError, SurveillanceResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use urc_records::{
    CollectionPoint, CollectionPoints, CorrectiveMeasureData, Identifications, Ledger,
    MeasureCatalog, OrganismData, PendingIdentificationData, RecordsResult, SampleData, Samples,
    ScheduledReadingData, Schedules, SurveillanceRecordData, Taxonomy, ThresholdProfile,
    Thresholds,
};
use urc_types::RiskTier;

/// Persistence boundary of the surveillance engine.
pub trait SurveillanceStore {
    fn load_organisms(&self) -> SurveillanceResult<Option<Vec<OrganismData>>>;
    fn save_organisms(&self, organisms: &[OrganismData]) -> SurveillanceResult<()>;

    fn load_thresholds(&self) -> SurveillanceResult<Option<BTreeMap<RiskTier, ThresholdProfile>>>;
    fn save_thresholds(
        &self,
        profiles: &BTreeMap<RiskTier, ThresholdProfile>,
    ) -> SurveillanceResult<()>;

    fn load_measures(&self) -> SurveillanceResult<Option<Vec<CorrectiveMeasureData>>>;
    fn save_measures(&self, measures: &[CorrectiveMeasureData]) -> SurveillanceResult<()>;

    fn load_collection_points(&self) -> SurveillanceResult<Option<Vec<CollectionPoint>>>;
    fn save_collection_points(&self, points: &[CollectionPoint]) -> SurveillanceResult<()>;

    fn load_samples(&self) -> SurveillanceResult<Option<Vec<SampleData>>>;
    fn save_samples(&self, samples: &[SampleData]) -> SurveillanceResult<()>;

    fn load_schedules(&self) -> SurveillanceResult<Option<Vec<ScheduledReadingData>>>;
    fn save_schedules(&self, readings: &[ScheduledReadingData]) -> SurveillanceResult<()>;

    fn load_identifications(&self)
        -> SurveillanceResult<Option<Vec<PendingIdentificationData>>>;
    fn save_identifications(
        &self,
        identifications: &[PendingIdentificationData],
    ) -> SurveillanceResult<()>;

    fn load_ledger(&self) -> SurveillanceResult<Option<Vec<SurveillanceRecordData>>>;
    fn save_ledger(&self, records: &[SurveillanceRecordData]) -> SurveillanceResult<()>;
}

/// One YAML file per collection under a data directory.
///
/// ```text
/// <data_dir>/
///   organisms.yaml
///   thresholds.yaml
///   measures.yaml
///   collection_points.yaml
///   samples.yaml
///   schedules.yaml
///   identifications.yaml
///   ledger.yaml
/// ```
#[derive(Clone, Debug)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn read<T>(
        &self,
        filename: &str,
        parse: impl FnOnce(&str) -> RecordsResult<T>,
    ) -> SurveillanceResult<Option<T>> {
        let path = self.data_dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SurveillanceError::FileRead { path, source }),
        };
        match parse(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                self.move_aside(filename, &path);
                Err(e.into())
            }
        }
    }

    /// Renames an unparseable file to `<filename>.corrupt`, replacing any earlier one.
    fn move_aside(&self, filename: &str, path: &Path) {
        let aside = self.data_dir.join(format!("{filename}{CORRUPT_SUFFIX}"));
        match fs::rename(path, &aside) {
            Ok(()) => tracing::warn!(
                path = %aside.display(),
                "unparseable collection file moved aside"
            ),
            Err(e) => tracing::error!(
                path = %path.display(),
                error = %e,
                "failed to move unparseable collection file aside"
            ),
        }
    }

    /// Writes to a sibling temporary file, then renames it over the target.
    fn write(&self, filename: &str, rendered: RecordsResult<String>) -> SurveillanceResult<()> {
        let yaml = rendered?;
        fs::create_dir_all(&self.data_dir).map_err(SurveillanceError::StorageDirCreation)?;

        let path = self.data_dir.join(filename);
        let tmp = self.data_dir.join(format!(".{filename}.tmp"));
        fs::write(&tmp, yaml).map_err(|source| SurveillanceError::FileWrite {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| SurveillanceError::FileWrite { path, source })
    }
}

impl SurveillanceStore for FileStore {
    fn load_organisms(&self) -> SurveillanceResult<Option<Vec<OrganismData>>> {
        self.read(ORGANISMS_FILENAME, Taxonomy::parse)
    }

    fn save_organisms(&self, organisms: &[OrganismData]) -> SurveillanceResult<()> {
        self.write(ORGANISMS_FILENAME, Taxonomy::render(organisms))
    }

    fn load_thresholds(&self) -> SurveillanceResult<Option<BTreeMap<RiskTier, ThresholdProfile>>> {
        self.read(THRESHOLDS_FILENAME, Thresholds::parse)
    }

    fn save_thresholds(
        &self,
        profiles: &BTreeMap<RiskTier, ThresholdProfile>,
    ) -> SurveillanceResult<()> {
        self.write(THRESHOLDS_FILENAME, Thresholds::render(profiles))
    }

    fn load_measures(&self) -> SurveillanceResult<Option<Vec<CorrectiveMeasureData>>> {
        self.read(MEASURES_FILENAME, MeasureCatalog::parse)
    }

    fn save_measures(&self, measures: &[CorrectiveMeasureData]) -> SurveillanceResult<()> {
        self.write(MEASURES_FILENAME, MeasureCatalog::render(measures))
    }

    fn load_collection_points(&self) -> SurveillanceResult<Option<Vec<CollectionPoint>>> {
        self.read(COLLECTION_POINTS_FILENAME, CollectionPoints::parse)
    }

    fn save_collection_points(&self, points: &[CollectionPoint]) -> SurveillanceResult<()> {
        self.write(COLLECTION_POINTS_FILENAME, CollectionPoints::render(points))
    }

    fn load_samples(&self) -> SurveillanceResult<Option<Vec<SampleData>>> {
        self.read(SAMPLES_FILENAME, Samples::parse)
    }

    fn save_samples(&self, samples: &[SampleData]) -> SurveillanceResult<()> {
        self.write(SAMPLES_FILENAME, Samples::render(samples))
    }

    fn load_schedules(&self) -> SurveillanceResult<Option<Vec<ScheduledReadingData>>> {
        self.read(SCHEDULES_FILENAME, Schedules::parse)
    }

    fn save_schedules(&self, readings: &[ScheduledReadingData]) -> SurveillanceResult<()> {
        self.write(SCHEDULES_FILENAME, Schedules::render(readings))
    }

    fn load_identifications(
        &self,
    ) -> SurveillanceResult<Option<Vec<PendingIdentificationData>>> {
        self.read(IDENTIFICATIONS_FILENAME, Identifications::parse)
    }

    fn save_identifications(
        &self,
        identifications: &[PendingIdentificationData],
    ) -> SurveillanceResult<()> {
        self.write(IDENTIFICATIONS_FILENAME, Identifications::render(identifications))
    }

    fn load_ledger(&self) -> SurveillanceResult<Option<Vec<SurveillanceRecordData>>> {
        self.read(LEDGER_FILENAME, Ledger::parse)
    }

    fn save_ledger(&self, records: &[SurveillanceRecordData]) -> SurveillanceResult<()> {
        self.write(LEDGER_FILENAME, Ledger::render(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_load_as_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::new(temp_dir.path().join("data"));

        assert!(store.load_organisms().expect("load").is_none());
        assert!(store.load_ledger().expect("load").is_none());
    }

    #[test]
    fn test_save_then_load_round_trips_seed_collections() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::new(temp_dir.path().join("data"));

        let organisms = seed::default_organisms().expect("seed");
        let thresholds = seed::default_thresholds().expect("seed");
        let measures = seed::default_measures().expect("seed");

        store.save_organisms(&organisms).expect("save organisms");
        store.save_thresholds(&thresholds).expect("save thresholds");
        store.save_measures(&measures).expect("save measures");

        assert_eq!(store.load_organisms().expect("load"), Some(organisms));
        assert_eq!(store.load_thresholds().expect("load"), Some(thresholds));
        assert_eq!(store.load_measures().expect("load"), Some(measures));
        assert!(!temp_dir.path().join("data/.organisms.yaml.tmp").exists());
    }

    #[test]
    fn test_empty_collection_is_some_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::new(temp_dir.path());

        store.save_samples(&[]).expect("save");
        assert_eq!(store.load_samples().expect("load"), Some(Vec::new()));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join(LEDGER_FILENAME), "records: [oops").expect("write");
        let store = FileStore::new(temp_dir.path());

        let err = store.load_ledger().expect_err("corrupt ledger");
        assert!(matches!(err, SurveillanceError::Records(_)));

        let aside = temp_dir.path().join(format!("{LEDGER_FILENAME}{CORRUPT_SUFFIX}"));
        assert_eq!(fs::read_to_string(aside).expect("moved aside"), "records: [oops");
        assert!(store.load_ledger().expect("load").is_none());

        store.save_ledger(&[]).expect("save");
        assert!(temp_dir.path().join(format!("{LEDGER_FILENAME}{CORRUPT_SUFFIX}")).exists());
    }

    #[test]
    fn test_save_fails_when_data_dir_is_a_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let blocker = temp_dir.path().join("data");
        fs::write(&blocker, "not a directory").expect("write");
        let store = FileStore::new(&blocker);

        assert!(store.save_ledger(&[]).is_err());
    }
}
