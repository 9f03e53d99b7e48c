//! Scheduled readings and pending identifications.
//!
//! Both carry a non-owning `sample_id`. A J7 reading names its sibling J2 in `blocked_by`;
//! the scheduler in `urc-core` gives that relation meaning, this module only persists it.

use crate::{parse_yaml, render_yaml, RecordsError, RecordsResult};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use urc_uuid::RecordId;

// ============================================================================
// Public domain-level types
// ============================================================================

/// Follow-up reading milestone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReadingMilestone {
    J2,
    J7,
}

impl ReadingMilestone {
    /// Days after collection at which the reading falls due.
    pub const fn offset_days(&self) -> u64 {
        match self {
            Self::J2 => 2,
            Self::J7 => 7,
        }
    }

    /// Due date for a sample collected on `collected`.
    ///
    /// Returns `None` only if the date would overflow the calendar.
    pub fn due_from(&self, collected: NaiveDate) -> Option<NaiveDate> {
        collected.checked_add_days(Days::new(self.offset_days()))
    }

    pub fn parse(s: &str) -> RecordsResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "J2" => Ok(Self::J2),
            "J7" => Ok(Self::J7),
            _ => Err(RecordsError::InvalidInput(format!(
                "Invalid reading milestone: {s}"
            ))),
        }
    }
}

impl fmt::Display for ReadingMilestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::J2 => f.write_str("J2"),
            Self::J7 => f.write_str("J7"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingStatus {
    Pending,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentificationStatus {
    Pending,
    Done,
}

/// A reading obligation for one sample.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduledReadingData {
    pub id: RecordId,
    pub sample_id: RecordId,
    pub when: ReadingMilestone,
    pub due_date: NaiveDate,
    pub status: ReadingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<RecordId>,
}

impl ScheduledReadingData {
    pub fn is_pending(&self) -> bool {
        self.status == ReadingStatus::Pending
    }
}

/// A positive reading awaiting organism identification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PendingIdentificationData {
    pub id: RecordId,
    pub sample_id: RecordId,
    /// The reading that turned positive.
    pub reading_id: RecordId,
    pub when: ReadingMilestone,
    pub colony_count: u32,
    pub date: NaiveDate,
    pub status: IdentificationStatus,
}

impl PendingIdentificationData {
    pub fn is_pending(&self) -> bool {
        self.status == IdentificationStatus::Pending
    }
}

// ============================================================================
// Public file operations
// ============================================================================

/// Scheduled reading file operations.
pub struct Schedules;

impl Schedules {
    /// Parse scheduled readings from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] on a schema mismatch, a repeated id, or a reading that names
    /// itself as its blocker.
    pub fn parse(yaml_text: &str) -> RecordsResult<Vec<ScheduledReadingData>> {
        if yaml_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let wire: SchedulesWire = parse_yaml(yaml_text, "Schedules")?;

        for (idx, reading) in wire.readings.iter().enumerate() {
            if wire.readings[..idx].iter().any(|r| r.id == reading.id) {
                return Err(RecordsError::Translation(format!(
                    "Duplicate reading id at readings[{idx}]: {}",
                    reading.id
                )));
            }
            if reading.blocked_by == Some(reading.id) {
                return Err(RecordsError::Translation(format!(
                    "Reading at readings[{idx}] cannot block itself"
                )));
            }
        }
        Ok(wire.readings)
    }

    pub fn render(readings: &[ScheduledReadingData]) -> RecordsResult<String> {
        let wire = SchedulesWire {
            readings: readings.to_vec(),
        };
        render_yaml(&wire, "schedules")
    }
}

/// Pending identification file operations.
pub struct Identifications;

impl Identifications {
    /// Parse pending identifications from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] on a schema mismatch, a repeated id, or a zero colony count.
    pub fn parse(yaml_text: &str) -> RecordsResult<Vec<PendingIdentificationData>> {
        if yaml_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let wire: IdentificationsWire = parse_yaml(yaml_text, "Identifications")?;

        for (idx, ident) in wire.identifications.iter().enumerate() {
            if wire.identifications[..idx].iter().any(|i| i.id == ident.id) {
                return Err(RecordsError::Translation(format!(
                    "Duplicate identification id at identifications[{idx}]: {}",
                    ident.id
                )));
            }
            if ident.colony_count == 0 {
                return Err(RecordsError::Translation(format!(
                    "Identification at identifications[{idx}] must have a positive colony count"
                )));
            }
        }
        Ok(wire.identifications)
    }

    /// Render identifications as YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] if a colony count is zero or serialisation fails.
    pub fn render(identifications: &[PendingIdentificationData]) -> RecordsResult<String> {
        if let Some(zero) = identifications.iter().find(|i| i.colony_count == 0) {
            return Err(RecordsError::InvalidInput(format!(
                "identification {} must have a positive colony count",
                zero.id
            )));
        }
        let wire = IdentificationsWire {
            identifications: identifications.to_vec(),
        };
        render_yaml(&wire, "identifications")
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct SchedulesWire {
    readings: Vec<ScheduledReadingData>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct IdentificationsWire {
    identifications: Vec<PendingIdentificationData>,
}
