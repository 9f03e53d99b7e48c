//! Ledger queries: statistics, recent listing, deletion.

use crate::{SurveillanceError, SurveillanceResult};
use serde::Serialize;
use urc_records::{RecordId, RecordStatus, SurveillanceRecordData};

/// Counts by outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub total: usize,
    pub conforming: usize,
    pub alerts: usize,
    pub actions: usize,
}

pub fn stats(records: &[SurveillanceRecordData]) -> LedgerStats {
    records
        .iter()
        .fold(LedgerStats::default(), |mut acc, record| {
            acc.total += 1;
            match record.status {
                RecordStatus::Ok => acc.conforming += 1,
                RecordStatus::Alert => acc.alerts += 1,
                RecordStatus::Action => acc.actions += 1,
            }
            acc
        })
}

/// Most recent records first, at most `limit` of them.
///
/// Records are ordered by date, newest first; records sharing a date keep reverse append
/// order.
pub fn recent(records: &[SurveillanceRecordData], limit: usize) -> Vec<&SurveillanceRecordData> {
    let mut ordered: Vec<&SurveillanceRecordData> = records.iter().rev().collect();
    ordered.sort_by(|a, b| b.date.cmp(&a.date));
    ordered.truncate(limit);
    ordered
}

pub fn delete_record(
    records: &mut Vec<SurveillanceRecordData>,
    id: RecordId,
) -> SurveillanceResult<SurveillanceRecordData> {
    let idx = records
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| SurveillanceError::NotFound(format!("ledger record {id}")))?;
    Ok(records.remove(idx))
}
