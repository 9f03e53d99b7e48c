//! Constants used throughout the URC core crate.
//!
//! File names for each persisted collection, matcher policy defaults and scheduling offsets.

/// Default directory for collection files when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "surveillance_data";

pub const ORGANISMS_FILENAME: &str = "organisms.yaml";
pub const THRESHOLDS_FILENAME: &str = "thresholds.yaml";
pub const MEASURES_FILENAME: &str = "measures.yaml";
pub const COLLECTION_POINTS_FILENAME: &str = "collection_points.yaml";
pub const SAMPLES_FILENAME: &str = "samples.yaml";
pub const SCHEDULES_FILENAME: &str = "schedules.yaml";
pub const IDENTIFICATIONS_FILENAME: &str = "identifications.yaml";
pub const LEDGER_FILENAME: &str = "ledger.yaml";

/// Appended to a collection file that failed to parse, so the next save cannot overwrite it.
pub const CORRUPT_SUFFIX: &str = ".corrupt";

/// Score given to a candidate whose genus equals the query genus.
pub const GENUS_EXACT_SCORE: f64 = 0.9;

/// Weight applied to the genus-only similarity.
pub const GENUS_WEIGHT: f64 = 0.85;

/// A match is accepted only when its score is strictly above this floor.
pub const ACCEPTANCE_FLOOR: f64 = 0.4;

/// Alert count used for a tier with no configured profile.
pub const FALLBACK_ALERT_COUNT: u32 = 25;

/// Action count used for a tier with no configured profile.
pub const FALLBACK_ACTION_COUNT: u32 = 40;

/// Pathogenicity recorded when none is supplied.
pub const UNDEFINED_PATHOGENICITY: &str = "Non défini";

/// Suffix of generated ids for operator-created measures.
pub const CUSTOM_MEASURE_SUFFIX: &str = "_custom";
