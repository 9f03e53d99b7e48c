//! Request and response bodies.
//!
//! Domain types stay in `urc-records`; these are their JSON shapes. Enum-like fields travel
//! as strings and are parsed with the domain parsers, so a bad value is a 400.

use crate::error::ApiError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use urc_core::{
    CorrectiveAction, MeasureDraft, MeasureFilter, OrganismDraft, SurveillanceError,
};
use urc_records::{
    ApaSensitivity, CollectionPoint, CorrectiveMeasureData, MeasureScope, MeasureType,
    NonEmptyText, OrganismData, PendingIdentificationData, RiskFilter, RiskTier, SampleData,
    SampleType, ScheduledReadingData, SurfaSafeSensitivity, SurveillanceRecordData,
    ThresholdProfile,
};
use utoipa::{IntoParams, ToSchema};

pub(crate) fn tier(value: u8) -> Result<RiskTier, ApiError> {
    RiskTier::new(i64::from(value)).map_err(|e| SurveillanceError::from(e).into())
}

/// Parses an optional `YYYY-MM-DD` date, defaulting to the local calendar date.
pub(crate) fn date_or_today(value: Option<&str>) -> Result<NaiveDate, ApiError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| ApiError::BadRequest(format!("invalid date '{s}': {e}"))),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

// ============================================================================
// Organisms
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct OrganismDto {
    pub name: String,
    /// The four classification levels, root first.
    pub path: Vec<String>,
    pub origin: String,
    pub risk_tier: u8,
    pub risk_label: String,
    pub pathogenicity: String,
    pub surfa_safe: String,
    pub apa: String,
    pub note: Option<String>,
    pub long_comment: Option<String>,
}

impl From<&OrganismData> for OrganismDto {
    fn from(o: &OrganismData) -> Self {
        Self {
            name: o.name.to_string(),
            path: o.path.levels().iter().map(|l| l.to_string()).collect(),
            origin: o.origin().to_string(),
            risk_tier: o.risk_tier.value(),
            risk_label: o.risk_tier.label().to_string(),
            pathogenicity: o.pathogenicity.clone(),
            surfa_safe: o.surfa_safe.label().to_string(),
            apa: o.apa.label().to_string(),
            note: o.note.clone(),
            long_comment: o.long_comment.clone(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrganismReq {
    pub name: String,
    pub family: String,
    pub source: String,
    pub origin: String,
    pub risk_tier: u8,
    #[serde(default)]
    pub pathogenicity: String,
    /// Key (`moderate_resistance_risk`) or printed label.
    pub surfa_safe: String,
    pub apa: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub long_comment: String,
}

impl OrganismReq {
    pub fn into_draft(self) -> Result<OrganismDraft, ApiError> {
        Ok(OrganismDraft {
            risk_tier: tier(self.risk_tier)?,
            surfa_safe: SurfaSafeSensitivity::parse(&self.surfa_safe)?,
            apa: ApaSensitivity::parse(&self.apa)?,
            name: self.name,
            family: self.family,
            source: self.source,
            origin: self.origin,
            pathogenicity: self.pathogenicity,
            note: self.note,
            long_comment: self.long_comment,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrganismListRes {
    pub organisms: Vec<OrganismDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrganismTierGroup {
    pub risk_tier: u8,
    pub risk_label: String,
    pub organisms: Vec<OrganismDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrganismsByTierRes {
    pub groups: Vec<OrganismTierGroup>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OriginsRes {
    pub origins: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrganismRes {
    pub organism: OrganismDto,
    pub save_error: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MatchReq {
    pub query: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MatchRes {
    pub candidate: Option<String>,
    pub risk_tier: Option<u8>,
    pub score: f64,
    /// Truncated percentage, as printed in the ledger.
    pub confidence: String,
    pub accepted: bool,
}

// ============================================================================
// Thresholds
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct ThresholdDto {
    pub risk_tier: u8,
    pub risk_label: String,
    pub alert_count: u32,
    pub action_count: u32,
}

impl ThresholdDto {
    pub fn new(tier: RiskTier, profile: ThresholdProfile) -> Self {
        Self {
            risk_tier: tier.value(),
            risk_label: tier.label().to_string(),
            alert_count: profile.alert_count,
            action_count: profile.action_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThresholdListRes {
    pub profiles: Vec<ThresholdDto>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ThresholdReq {
    pub alert_count: u32,
    pub action_count: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThresholdRes {
    pub profile: ThresholdDto,
    /// Set when the action count is below the alert count.
    pub warning: Option<String>,
    pub save_error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ThresholdResetRes {
    pub profiles: Vec<ThresholdDto>,
    pub save_error: Option<String>,
}

// ============================================================================
// Measures
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct MeasureDto {
    pub id: String,
    pub text: String,
    pub scope: String,
    /// `all`, a single tier, or a bracketed list such as `[4,5]`.
    pub risk: String,
    #[serde(rename = "type")]
    pub measure_type: String,
}

impl From<&CorrectiveMeasureData> for MeasureDto {
    fn from(m: &CorrectiveMeasureData) -> Self {
        Self {
            id: m.id.to_string(),
            text: m.text.to_string(),
            scope: m.scope.as_str().to_string(),
            risk: m.risk.to_string(),
            measure_type: m.measure_type.as_str().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MeasureReq {
    pub text: String,
    pub scope: String,
    pub risk: String,
    #[serde(rename = "type")]
    pub measure_type: String,
}

impl MeasureReq {
    pub fn into_draft(self) -> Result<MeasureDraft, ApiError> {
        Ok(MeasureDraft {
            scope: MeasureScope::parse(&self.scope)?,
            risk: RiskFilter::parse(&self.risk)?,
            measure_type: MeasureType::parse(&self.measure_type)?,
            text: self.text,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MeasureQuery {
    /// Exact scope, `all` for catalog-wide measures.
    pub scope: Option<String>,
    /// `alert` or `action`; `both` measures always match.
    #[serde(rename = "type")]
    pub measure_type: Option<String>,
    pub risk_tier: Option<u8>,
}

impl MeasureQuery {
    pub fn into_filter(self) -> Result<MeasureFilter, ApiError> {
        Ok(MeasureFilter {
            scope: self.scope.as_deref().map(MeasureScope::parse).transpose()?,
            measure_type: self
                .measure_type
                .as_deref()
                .map(MeasureType::parse)
                .transpose()?,
            tier: self.risk_tier.map(tier).transpose()?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeasureListRes {
    pub measures: Vec<MeasureDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeasureGroup {
    pub scope: String,
    pub measures: Vec<MeasureDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeasureGroupsRes {
    pub groups: Vec<MeasureGroup>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeasureRes {
    pub measure: MeasureDto,
    pub save_error: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectReq {
    pub origin: String,
    pub risk_tier: u8,
    /// `alert` or `action`.
    #[serde(rename = "type")]
    pub triggered: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChecklistDto {
    /// `not_required`, `measures` or `no_configured_measure`.
    pub outcome: String,
    pub measures: Vec<MeasureDto>,
}

impl From<&CorrectiveAction> for ChecklistDto {
    fn from(action: &CorrectiveAction) -> Self {
        let (outcome, measures) = match action {
            CorrectiveAction::NotRequired => ("not_required", Vec::new()),
            CorrectiveAction::Measures(measures) => {
                ("measures", measures.iter().map(MeasureDto::from).collect())
            }
            CorrectiveAction::NoConfiguredMeasure => ("no_configured_measure", Vec::new()),
        };
        Self {
            outcome: outcome.to_string(),
            measures,
        }
    }
}

// ============================================================================
// Collection points, samples and readings
// ============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PointDto {
    pub label: String,
    /// `air` or `surface`.
    pub sample_type: String,
    #[serde(default)]
    pub room_class: String,
    #[serde(default)]
    pub growth_medium: String,
}

impl From<&CollectionPoint> for PointDto {
    fn from(p: &CollectionPoint) -> Self {
        Self {
            label: p.label.to_string(),
            sample_type: p.sample_type.as_str().to_string(),
            room_class: p.room_class.clone(),
            growth_medium: p.growth_medium.clone(),
        }
    }
}

impl PointDto {
    pub fn into_point(self) -> Result<CollectionPoint, ApiError> {
        Ok(CollectionPoint {
            label: NonEmptyText::new(&self.label).map_err(SurveillanceError::from)?,
            sample_type: SampleType::parse(&self.sample_type)?,
            room_class: self.room_class.trim().to_string(),
            growth_medium: self.growth_medium.trim().to_string(),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PointListRes {
    pub points: Vec<PointDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PointRes {
    pub point: PointDto,
    pub save_error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SampleDto {
    pub id: String,
    pub point: PointDto,
    pub operator: String,
    pub collection_date: String,
    pub archived: bool,
}

impl From<&SampleData> for SampleDto {
    fn from(s: &SampleData) -> Self {
        Self {
            id: s.id.to_string(),
            point: PointDto::from(&s.point),
            operator: s.operator.clone(),
            collection_date: s.collection_date.to_string(),
            archived: s.archived,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingDto {
    pub id: String,
    pub sample_id: String,
    /// `J2` or `J7`.
    pub when: String,
    pub due_date: String,
    pub status: String,
    pub blocked_by: Option<String>,
}

impl From<&ScheduledReadingData> for ReadingDto {
    fn from(r: &ScheduledReadingData) -> Self {
        Self {
            id: r.id.to_string(),
            sample_id: r.sample_id.to_string(),
            when: r.when.to_string(),
            due_date: r.due_date.to_string(),
            status: if r.is_pending() { "pending" } else { "done" }.to_string(),
            blocked_by: r.blocked_by.map(|id| id.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CollectReq {
    pub point_label: String,
    pub operator: String,
    /// `YYYY-MM-DD`; defaults to today.
    pub collection_date: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CollectRes {
    pub sample: SampleDto,
    pub readings: Vec<ReadingDto>,
    pub save_error: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SampleQuery {
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SampleListRes {
    pub samples: Vec<SampleDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SampleRes {
    pub sample: SampleDto,
    pub save_error: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DueQuery {
    /// `YYYY-MM-DD`; defaults to today.
    pub today: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DueReadingDto {
    pub reading: ReadingDto,
    pub sample: SampleDto,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DueListRes {
    pub readings: Vec<DueReadingDto>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveReq {
    /// Zero means a negative reading.
    pub colony_count: u32,
    /// `YYYY-MM-DD`; defaults to today.
    pub today: Option<String>,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub remark: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveRes {
    /// `negative` or `positive`.
    pub outcome: String,
    pub record: Option<LedgerRecordDto>,
    pub sample_archived: bool,
    pub identification: Option<IdentificationDto>,
    pub save_error: Option<String>,
}

// ============================================================================
// Identifications
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct IdentificationDto {
    pub id: String,
    pub sample_id: String,
    pub reading_id: String,
    pub when: String,
    pub colony_count: u32,
    pub date: String,
    pub status: String,
}

impl From<&PendingIdentificationData> for IdentificationDto {
    fn from(i: &PendingIdentificationData) -> Self {
        Self {
            id: i.id.to_string(),
            sample_id: i.sample_id.to_string(),
            reading_id: i.reading_id.to_string(),
            when: i.when.to_string(),
            colony_count: i.colony_count,
            date: i.date.to_string(),
            status: if i.is_pending() { "pending" } else { "done" }.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdentificationQuery {
    #[serde(default)]
    pub pending_only: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IdentificationListRes {
    pub identifications: Vec<IdentificationDto>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IdentifyReq {
    /// Organism name as typed by the operator.
    pub organism: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub remark: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IdentifyRes {
    /// False when no organism cleared the acceptance floor; nothing was recorded.
    pub resolved: bool,
    pub best_candidate: Option<String>,
    pub score: f64,
    pub organism: Option<OrganismDto>,
    pub record: Option<LedgerRecordDto>,
    pub checklist: Option<ChecklistDto>,
    pub save_error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReopenRes {
    pub reading: ReadingDto,
    pub save_error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DiscardRes {
    pub identification: IdentificationDto,
    pub save_error: Option<String>,
}

// ============================================================================
// Ledger
// ============================================================================

/// A ledger row with the record id used for deletion.
#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerRecordDto {
    pub id: String,
    pub date: String,
    pub sample_label: String,
    pub entered_text: String,
    pub matched_name: String,
    pub confidence: String,
    pub colony_count: u32,
    pub risk_tier: Option<u8>,
    pub alert_threshold: Option<u32>,
    pub action_threshold: Option<u32>,
    pub status: String,
    pub operator: String,
    pub remark: String,
}

impl From<&SurveillanceRecordData> for LedgerRecordDto {
    fn from(r: &SurveillanceRecordData) -> Self {
        let row = r.to_row();
        Self {
            id: r.id.to_string(),
            date: row.date,
            sample_label: row.sample_label,
            entered_text: row.entered_text,
            matched_name: row.matched_name,
            confidence: row.confidence,
            colony_count: row.colony_count,
            risk_tier: row.risk_tier,
            alert_threshold: row.alert_threshold,
            action_threshold: row.action_threshold,
            status: row.status.as_str().to_string(),
            operator: row.operator,
            remark: row.remark,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LedgerQuery {
    /// Most recent first, at most this many. All records in append order when absent.
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerListRes {
    pub records: Vec<LedgerRecordDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerStatsRes {
    pub total: usize,
    pub conforming: usize,
    pub alerts: usize,
    pub actions: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteRecordRes {
    pub record: LedgerRecordDto,
    pub save_error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClearLedgerRes {
    pub removed: usize,
    pub save_error: Option<String>,
}
