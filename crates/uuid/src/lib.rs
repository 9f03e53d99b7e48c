//! Record identifiers for surveillance entities.
//!
//! Samples, scheduled readings, pending identifications and ledger entries are all addressed by
//! a [`RecordId`]: a v4 UUID held in a *canonical* textual form of **32 lowercase hexadecimal
//! characters** (no hyphens).
//!
//! Canonical form is required for identifiers arriving from outside the core (REST paths, CLI
//! arguments, files on disk). Hyphenated or uppercase spellings are rejected rather than
//! normalised, so one record never has two spellings in the stored collections.
//!
//! Example: `550e8400e29b41d4a716446655440000`

mod service;

pub use service::{RecordId, Uuid};

/// Error type for identifier parsing.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
