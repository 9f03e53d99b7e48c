//! J2/J7 reading obligations.
//!
//! Collecting a sample creates two pending readings. J7 is blocked by its sibling J2 until
//! that reading is no longer pending. Eligibility is computed on demand against a supplied
//! date; there is no background scheduler.
//!
//! This module holds the pure rules. The service applies them to the working set and
//! persists the result.

use crate::{SurveillanceError, SurveillanceResult};
use chrono::NaiveDate;
use std::collections::HashMap;
use urc_records::{
    ReadingMilestone, ReadingStatus, RecordId, SampleData, ScheduledReadingData,
};

/// Operator verdict on a due reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadingResult {
    Negative,
    Positive { colony_count: u32 },
}

impl ReadingResult {
    /// A zero count is a negative reading.
    pub fn from_colony_count(colony_count: u32) -> Self {
        if colony_count == 0 {
            Self::Negative
        } else {
            Self::Positive { colony_count }
        }
    }
}

/// Creates the J2 and J7 readings for a freshly collected sample.
///
/// # Errors
///
/// Returns [`SurveillanceError::InvalidInput`] if a due date falls outside the calendar.
pub fn schedule_readings(sample: &SampleData) -> SurveillanceResult<[ScheduledReadingData; 2]> {
    let due = |when: ReadingMilestone| {
        when.due_from(sample.collection_date).ok_or_else(|| {
            SurveillanceError::InvalidInput(format!(
                "{when} due date overflows for collection date {}",
                sample.collection_date
            ))
        })
    };

    let j2 = ScheduledReadingData {
        id: RecordId::new(),
        sample_id: sample.id,
        when: ReadingMilestone::J2,
        due_date: due(ReadingMilestone::J2)?,
        status: ReadingStatus::Pending,
        blocked_by: None,
    };
    let j7 = ScheduledReadingData {
        id: RecordId::new(),
        sample_id: sample.id,
        when: ReadingMilestone::J7,
        due_date: due(ReadingMilestone::J7)?,
        status: ReadingStatus::Pending,
        blocked_by: Some(j2.id),
    };
    Ok([j2, j7])
}

/// Lookup of reading status by id, built once per query.
pub struct StatusIndex(HashMap<RecordId, ReadingStatus>);

impl StatusIndex {
    pub fn build(readings: &[ScheduledReadingData]) -> Self {
        Self(readings.iter().map(|r| (r.id, r.status)).collect())
    }

    /// True if `reading` names a blocker that is still pending.
    ///
    /// A blocker that no longer exists does not block.
    pub fn is_blocked(&self, reading: &ScheduledReadingData) -> bool {
        reading
            .blocked_by
            .and_then(|id| self.0.get(&id))
            .is_some_and(|status| *status == ReadingStatus::Pending)
    }

    /// Pending, due on or before `today`, and not blocked.
    pub fn is_eligible(&self, reading: &ScheduledReadingData, today: NaiveDate) -> bool {
        reading.is_pending() && reading.due_date <= today && !self.is_blocked(reading)
    }
}

/// Readings that can be resolved on `today`, in store order.
pub fn eligible_readings(
    readings: &[ScheduledReadingData],
    today: NaiveDate,
) -> Vec<&ScheduledReadingData> {
    let index = StatusIndex::build(readings);
    readings
        .iter()
        .filter(|r| index.is_eligible(r, today))
        .collect()
}

/// Index of reading `reading_id` if it can be resolved on `today`.
///
/// # Errors
///
/// - [`SurveillanceError::NotFound`] if no such reading exists.
/// - [`SurveillanceError::InvalidTransition`] if it is already done, still blocked by its J2,
///   or not yet due.
pub fn resolvable_index(
    readings: &[ScheduledReadingData],
    reading_id: RecordId,
    today: NaiveDate,
) -> SurveillanceResult<usize> {
    let idx = readings
        .iter()
        .position(|r| r.id == reading_id)
        .ok_or_else(|| SurveillanceError::NotFound(format!("reading {reading_id}")))?;
    let reading = &readings[idx];

    if !reading.is_pending() {
        return Err(SurveillanceError::InvalidTransition(format!(
            "reading {reading_id} is already done"
        )));
    }
    if StatusIndex::build(readings).is_blocked(reading) {
        return Err(SurveillanceError::InvalidTransition(format!(
            "{} reading {reading_id} is blocked until its J2 reading is resolved",
            reading.when
        )));
    }
    if reading.due_date > today {
        return Err(SurveillanceError::InvalidTransition(format!(
            "{} reading {reading_id} is not due until {}",
            reading.when, reading.due_date
        )));
    }
    Ok(idx)
}

/// Whether a negative result on `reading` ends the sample's surveillance.
///
/// True for J7, and for J2 when no J7 is pending for the same sample.
pub fn negative_archives_sample(
    readings: &[ScheduledReadingData],
    reading: &ScheduledReadingData,
) -> bool {
    match reading.when {
        ReadingMilestone::J7 => true,
        ReadingMilestone::J2 => !readings.iter().any(|r| {
            r.sample_id == reading.sample_id && r.when == ReadingMilestone::J7 && r.is_pending()
        }),
    }
}
