//! # URC Core
//!
//! Microbiological surveillance engine for a URC cleanroom.
//!
//! This crate holds the domain rules and their persistence:
//! - Fuzzy organism matching against the taxonomy
//! - Risk classification of colony counts against per-tier thresholds
//! - Corrective measure selection by origin, tier and triggered type
//! - J2/J7 reading obligations with J7 blocked by J2
//! - The append-only surveillance ledger
//!
//! **No API concerns**: HTTP servers and command-line parsing belong in `api-rest` and `cli`.
//! Configuration is resolved by the binaries and passed in as [`CoreConfig`].

pub mod classifier;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod matcher;
pub mod measures;
pub mod scheduler;
pub mod seed;
pub mod service;
pub mod similarity;
pub mod store;
pub mod taxonomy;

pub use classifier::{Classification, ThresholdRegistry};
pub use config::{CoreConfig, MatchPolicy};
pub use error::{SurveillanceError, SurveillanceResult};
pub use ledger::LedgerStats;
pub use measures::{CorrectiveAction, MeasureDraft, MeasureFilter};
pub use scheduler::ReadingResult;
pub use service::{
    Applied, CollectedSample, DueReading, IdentificationInput, IdentificationOutcome,
    MatchReport, ReadingOutcome, SurveillanceService,
};
pub use store::{FileStore, SurveillanceStore};
pub use taxonomy::OrganismDraft;
