//! The surveillance ledger: finalized outcomes, one record per resolved reading or
//! identification.

use crate::{parse_yaml, render_yaml, RecordsError, RecordsResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use urc_types::RiskTier;
use urc_uuid::RecordId;

/// Outcome of a classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Ok,
    Alert,
    Action,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Alert => "alert",
            Self::Action => "action",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable audit entry.
///
/// Records written for a negative reading have no organism: `matched_name`,
/// `match_confidence`, `risk_tier` and both thresholds are `None`, and `colony_count` is 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurveillanceRecordData {
    pub id: RecordId,
    pub date: NaiveDate,
    pub sample_label: String,
    #[serde(default)]
    pub entered_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_name: Option<String>,
    /// Similarity score in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_confidence: Option<f64>,
    pub colony_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_tier: Option<RiskTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_threshold: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_threshold: Option<u32>,
    pub status: RecordStatus,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub remark: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_id: Option<RecordId>,
}

impl SurveillanceRecordData {
    /// Export row with the field-exact shape used by spreadsheets and reports.
    pub fn to_row(&self) -> LedgerRow {
        LedgerRow {
            date: self.date.format("%Y-%m-%d").to_string(),
            sample_label: self.sample_label.clone(),
            entered_text: self.entered_text.clone(),
            matched_name: self.matched_name.clone().unwrap_or_default(),
            confidence: self
                .match_confidence
                .map(confidence_percent)
                .unwrap_or_default(),
            colony_count: self.colony_count,
            risk_tier: self.risk_tier.map(u8::from),
            alert_threshold: self.alert_threshold,
            action_threshold: self.action_threshold,
            status: self.status,
            operator: self.operator.clone(),
            remark: self.remark.clone(),
        }
    }
}

/// Flat export view of a ledger record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LedgerRow {
    pub date: String,
    pub sample_label: String,
    pub entered_text: String,
    pub matched_name: String,
    /// `int(score * 100)` followed by `%`, e.g. `"72%"`.
    pub confidence: String,
    pub colony_count: u32,
    pub risk_tier: Option<u8>,
    pub alert_threshold: Option<u32>,
    pub action_threshold: Option<u32>,
    pub status: RecordStatus,
    pub operator: String,
    pub remark: String,
}

/// Formats a score as a truncated whole percentage.
pub fn confidence_percent(score: f64) -> String {
    let pct = (score * 100.0).trunc().clamp(0.0, 100.0) as u32;
    format!("{pct}%")
}

/// Ledger file operations.
pub struct Ledger;

impl Ledger {
    /// Parse ledger records from YAML text, in append order.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError`] on a schema mismatch, a repeated id, or a confidence outside
    /// `[0, 1]`.
    pub fn parse(yaml_text: &str) -> RecordsResult<Vec<SurveillanceRecordData>> {
        if yaml_text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let wire: LedgerWire = parse_yaml(yaml_text, "Ledger")?;

        for (idx, record) in wire.records.iter().enumerate() {
            if wire.records[..idx].iter().any(|r| r.id == record.id) {
                return Err(RecordsError::Translation(format!(
                    "Duplicate record id at records[{idx}]: {}",
                    record.id
                )));
            }
            if let Some(score) = record.match_confidence {
                if !(0.0..=1.0).contains(&score) {
                    return Err(RecordsError::Translation(format!(
                        "Match confidence out of range at records[{idx}]: {score}"
                    )));
                }
            }
        }
        Ok(wire.records)
    }

    pub fn render(records: &[SurveillanceRecordData]) -> RecordsResult<String> {
        let wire = LedgerWire {
            records: records.to_vec(),
        };
        render_yaml(&wire, "ledger")
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct LedgerWire {
    records: Vec<SurveillanceRecordData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identified_record() -> SurveillanceRecordData {
        SurveillanceRecordData {
            id: RecordId::new(),
            date: NaiveDate::from_ymd_opt(2026, 3, 4).expect("date"),
            sample_label: "Salle 3 - Poste A".into(),
            entered_text: "E.coli".into(),
            matched_name: Some("Escherichia coli".into()),
            match_confidence: Some(0.729),
            colony_count: 30,
            risk_tier: Some(RiskTier::new(4).expect("tier")),
            alert_threshold: Some(10),
            action_threshold: Some(25),
            status: RecordStatus::Action,
            operator: "Marie".into(),
            remark: String::new(),
            sample_id: Some(RecordId::new()),
            reading_id: None,
        }
    }

    #[test]
    fn confidence_is_truncated_not_rounded() {
        assert_eq!(confidence_percent(0.729), "72%");
        assert_eq!(confidence_percent(0.9), "90%");
        assert_eq!(confidence_percent(1.0), "100%");
        assert_eq!(confidence_percent(0.0), "0%");
    }

    #[test]
    fn row_has_export_shape() {
        let row = identified_record().to_row();
        assert_eq!(row.date, "2026-03-04");
        assert_eq!(row.confidence, "72%");
        assert_eq!(row.risk_tier, Some(4));
        assert_eq!(row.status, RecordStatus::Action);
    }

    #[test]
    fn negative_record_row_has_blank_organism() {
        let mut record = identified_record();
        record.matched_name = None;
        record.match_confidence = None;
        record.risk_tier = None;
        record.colony_count = 0;
        record.status = RecordStatus::Ok;

        let row = record.to_row();
        assert_eq!(row.matched_name, "");
        assert_eq!(row.confidence, "");
        assert_eq!(row.risk_tier, None);
    }

    #[test]
    fn ledger_round_trips_in_order() {
        let mut second = identified_record();
        second.status = RecordStatus::Ok;
        second.matched_name = None;
        second.match_confidence = None;
        let records = vec![identified_record(), second];

        let yaml = Ledger::render(&records).expect("render");
        assert_eq!(Ledger::parse(&yaml).expect("parse"), records);
    }

    #[test]
    fn ledger_rejects_out_of_range_confidence() {
        let mut record = identified_record();
        record.match_confidence = Some(1.5);
        let yaml = Ledger::render(&[record]).expect("render");
        let err = Ledger::parse(&yaml).expect_err("confidence > 1");
        assert!(err.to_string().contains("records[0]"));
    }
}
