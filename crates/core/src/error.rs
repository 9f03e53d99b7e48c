use urc_records::RecordsError;
use urc_types::{RiskTierError, TextError};

#[derive(Debug, thiserror::Error)]
pub enum SurveillanceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("record format error: {0}")]
    Records(#[from] RecordsError),
    #[error("invalid text: {0}")]
    Text(#[from] TextError),
    #[error("invalid risk tier: {0}")]
    RiskTier(#[from] RiskTierError),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read collection file {path}: {source}", path = path.display())]
    FileRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write collection file {path}: {source}", path = path.display())]
    FileWrite {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bundled seed data is invalid ({what}): {source}")]
    Seed {
        what: &'static str,
        #[source]
        source: RecordsError,
    },
}

impl SurveillanceError {
    /// True for errors caused by the caller's input rather than by storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidTransition(_)
                | Self::Records(_)
                | Self::Text(_)
                | Self::RiskTier(_)
        )
    }
}

pub type SurveillanceResult<T> = std::result::Result<T, SurveillanceError>;
