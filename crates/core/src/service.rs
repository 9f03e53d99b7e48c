//! The surveillance service: one in-memory working set, persisted collection by collection.
//!
//! Every operation validates first and mutates second, so a rejected operation leaves the
//! working set untouched. After a successful mutation the affected collections are saved as
//! whole files. A failed save is logged and returned in [`Applied::save_error`]; the in-memory
//! transition stands.
//!
//! ## Workflow
//!
//! ```text
//! collect_sample ──► J2 (+2 d) ──► J7 (+7 d, blocked by J2)
//!                      │
//! resolve_reading ─────┼── negative ──► ok record (+ archive when terminal)
//!                      └── positive ──► pending identification
//!                                          │
//! identify ────────────────────────────────┴─► match ─► classify ─► measures ─► record
//! ```

use crate::classifier::{Classification, ThresholdRegistry};
use crate::config::CoreConfig;
use crate::ledger::{self, LedgerStats};
use crate::matcher::match_organism;
use crate::measures::{self, CorrectiveAction, MeasureDraft, MeasureFilter};
use crate::scheduler::{self, ReadingResult};
use crate::store::{FileStore, SurveillanceStore};
use crate::taxonomy::{self, OrganismDraft};
use crate::{seed, SurveillanceError, SurveillanceResult};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use urc_records::{
    CollectionPoint, CorrectiveMeasureData, IdentificationStatus, LedgerRow, MeasureScope,
    MeasureType, OrganismData, PendingIdentificationData, ReadingStatus, RecordId, RecordStatus,
    SampleData, ScheduledReadingData, SurveillanceRecordData, ThresholdProfile,
};
use urc_types::RiskTier;

// ============================================================================
// Working set and results
// ============================================================================

/// Everything the engine operates on.
#[derive(Clone, Debug)]
pub struct SurveillanceState {
    pub organisms: Vec<OrganismData>,
    pub thresholds: ThresholdRegistry,
    pub measures: Vec<CorrectiveMeasureData>,
    pub points: Vec<CollectionPoint>,
    pub samples: Vec<SampleData>,
    pub readings: Vec<ScheduledReadingData>,
    pub identifications: Vec<PendingIdentificationData>,
    pub ledger: Vec<SurveillanceRecordData>,
}

/// The result of an applied transition, with the outcome of persisting it.
#[derive(Clone, Debug)]
pub struct Applied<T> {
    pub value: T,
    /// Set when at least one collection could not be saved.
    pub save_error: Option<String>,
}

impl<T> Applied<T> {
    pub fn is_saved(&self) -> bool {
        self.save_error.is_none()
    }
}

/// Matcher result as shown to an operator.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchReport {
    pub candidate: Option<OrganismData>,
    pub score: f64,
    pub accepted: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CollectedSample {
    pub sample: SampleData,
    pub readings: [ScheduledReadingData; 2],
}

/// An eligible reading with the sample it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct DueReading {
    pub reading: ScheduledReadingData,
    pub sample: SampleData,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReadingOutcome {
    Negative {
        record: SurveillanceRecordData,
        sample_archived: bool,
    },
    Positive {
        identification: PendingIdentificationData,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum IdentificationOutcome {
    /// No candidate cleared the acceptance floor. Nothing was changed.
    Unresolved {
        best_candidate: Option<String>,
        score: f64,
    },
    Recorded {
        record: SurveillanceRecordData,
        organism: OrganismData,
        classification: Classification,
        corrective_action: CorrectiveAction,
    },
}

/// Operator input for completing an identification.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdentificationInput {
    pub organism_text: String,
    /// Falls back to the sample's operator when blank.
    pub operator: String,
    pub remark: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Collection {
    Organisms,
    Thresholds,
    Measures,
    Points,
    Samples,
    Readings,
    Identifications,
    Ledger,
}

// ============================================================================
// SURVEILLANCE SERVICE
// ============================================================================

/// The surveillance engine bound to a store.
pub struct SurveillanceService<S> {
    cfg: Arc<CoreConfig>,
    store: S,
    state: SurveillanceState,
    default_thresholds: BTreeMap<RiskTier, ThresholdProfile>,
}

impl SurveillanceService<FileStore> {
    /// Opens the YAML file store under the configured data directory.
    pub fn open_data_dir(cfg: Arc<CoreConfig>) -> SurveillanceResult<Self> {
        let store = FileStore::new(cfg.data_dir());
        Self::open(cfg, store)
    }
}

impl<S: SurveillanceStore> SurveillanceService<S> {
    /// Loads every collection from `store`.
    ///
    /// Absent collections start from the bundled seed (taxonomy, thresholds, measures) or
    /// empty (everything else). A collection that fails to load is logged and treated the
    /// same way. Missing organism notes are back-filled from the seed taxonomy.
    ///
    /// # Errors
    ///
    /// Returns [`SurveillanceError::Seed`] only if the bundled seed data is itself invalid.
    pub fn open(cfg: Arc<CoreConfig>, store: S) -> SurveillanceResult<Self> {
        let seed_organisms = seed::default_organisms()?;
        let default_thresholds = seed::default_thresholds()?;
        let seed_measures = seed::default_measures()?;

        let mut organisms = or_fallback("organisms", store.load_organisms(), || {
            seed_organisms.clone()
        });
        let filled = taxonomy::backfill(&mut organisms, &seed_organisms);
        if filled > 0 {
            tracing::info!(filled, "back-filled organism notes from bundled taxonomy");
        }

        let profiles = or_fallback("thresholds", store.load_thresholds(), || {
            default_thresholds.clone()
        });
        let thresholds = ThresholdRegistry::new(profiles, cfg.fallback_profile());

        let state = SurveillanceState {
            organisms,
            thresholds,
            measures: or_fallback("measures", store.load_measures(), || seed_measures),
            points: or_fallback("collection points", store.load_collection_points(), Vec::new),
            samples: or_fallback("samples", store.load_samples(), Vec::new),
            readings: or_fallback("schedules", store.load_schedules(), Vec::new),
            identifications: or_fallback(
                "identifications",
                store.load_identifications(),
                Vec::new,
            ),
            ledger: or_fallback("ledger", store.load_ledger(), Vec::new),
        };

        tracing::info!(
            organisms = state.organisms.len(),
            measures = state.measures.len(),
            samples = state.samples.len(),
            records = state.ledger.len(),
            "surveillance state loaded"
        );

        Ok(Self {
            cfg,
            store,
            state,
            default_thresholds,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn state(&self) -> &SurveillanceState {
        &self.state
    }

    // ------------------------------------------------------------------------
    // Taxonomy
    // ------------------------------------------------------------------------

    pub fn organisms(&self) -> &[OrganismData] {
        &self.state.organisms
    }

    pub fn organisms_by_tier(&self) -> Vec<(RiskTier, Vec<&OrganismData>)> {
        taxonomy::group_by_tier(&self.state.organisms)
    }

    pub fn origins(&self) -> Vec<String> {
        taxonomy::origins(&self.state.organisms)
    }

    pub fn add_organism(&mut self, draft: OrganismDraft) -> SurveillanceResult<Applied<OrganismData>> {
        let organism = taxonomy::add_organism(&mut self.state.organisms, draft)?;
        tracing::info!(name = %organism.name, "organism added");
        Ok(self.applied(organism, &[Collection::Organisms]))
    }

    pub fn edit_organism(
        &mut self,
        current_name: &str,
        draft: OrganismDraft,
    ) -> SurveillanceResult<Applied<OrganismData>> {
        let organism = taxonomy::edit_organism(&mut self.state.organisms, current_name, draft)?;
        tracing::info!(from = current_name, to = %organism.name, "organism edited");
        Ok(self.applied(organism, &[Collection::Organisms]))
    }

    pub fn delete_organism(&mut self, name: &str) -> SurveillanceResult<Applied<OrganismData>> {
        let organism = taxonomy::delete_organism(&mut self.state.organisms, name)?;
        tracing::info!(name = %organism.name, "organism deleted");
        Ok(self.applied(organism, &[Collection::Organisms]))
    }

    /// Runs the matcher against the current taxonomy without side effects.
    pub fn match_organism(&self, query: &str) -> MatchReport {
        let policy = self.cfg.match_policy();
        let outcome = match_organism(query, &self.state.organisms, &policy);
        MatchReport {
            candidate: outcome.organism.cloned(),
            score: outcome.score,
            accepted: outcome.accepted(&policy).is_some(),
        }
    }

    // ------------------------------------------------------------------------
    // Thresholds
    // ------------------------------------------------------------------------

    /// Effective profile for every tier, most critical first.
    pub fn thresholds(&self) -> Vec<(RiskTier, ThresholdProfile)> {
        self.state.thresholds.effective(&self.default_thresholds)
    }

    pub fn classify(&self, tier: RiskTier, colony_count: u32) -> Classification {
        self.state.thresholds.classify(tier, colony_count)
    }

    pub fn set_threshold(
        &mut self,
        tier: RiskTier,
        profile: ThresholdProfile,
    ) -> Applied<ThresholdProfile> {
        self.state.thresholds.set(tier, profile);
        tracing::info!(
            tier = tier.value(),
            alert = profile.alert_count,
            action = profile.action_count,
            "threshold profile set"
        );
        self.applied(profile, &[Collection::Thresholds])
    }

    pub fn reset_thresholds(&mut self) -> Applied<Vec<(RiskTier, ThresholdProfile)>> {
        self.state
            .thresholds
            .replace_all(self.default_thresholds.clone());
        tracing::info!("threshold profiles reset to defaults");
        let value = self.thresholds();
        self.applied(value, &[Collection::Thresholds])
    }

    // ------------------------------------------------------------------------
    // Measures
    // ------------------------------------------------------------------------

    pub fn measures(&self) -> &[CorrectiveMeasureData] {
        &self.state.measures
    }

    pub fn filter_measures(&self, filter: &MeasureFilter) -> Vec<&CorrectiveMeasureData> {
        measures::filter_measures(&self.state.measures, filter)
    }

    pub fn measures_by_scope(&self) -> Vec<(MeasureScope, Vec<&CorrectiveMeasureData>)> {
        measures::group_by_scope(&self.state.measures)
    }

    /// Checklist for an origin leaf, tier and triggered type.
    pub fn select_measures(
        &self,
        origin_leaf: &str,
        tier: RiskTier,
        triggered: MeasureType,
    ) -> CorrectiveAction {
        measures::checklist(&self.state.measures, origin_leaf, tier, triggered)
    }

    pub fn add_measure(
        &mut self,
        draft: MeasureDraft,
    ) -> SurveillanceResult<Applied<CorrectiveMeasureData>> {
        let measure = measures::add_measure(&mut self.state.measures, draft)?;
        tracing::info!(id = %measure.id, "measure added");
        Ok(self.applied(measure, &[Collection::Measures]))
    }

    pub fn edit_measure(
        &mut self,
        id: &str,
        draft: MeasureDraft,
    ) -> SurveillanceResult<Applied<CorrectiveMeasureData>> {
        let measure = measures::edit_measure(&mut self.state.measures, id, draft)?;
        tracing::info!(id = %measure.id, "measure edited");
        Ok(self.applied(measure, &[Collection::Measures]))
    }

    pub fn delete_measure(
        &mut self,
        id: &str,
    ) -> SurveillanceResult<Applied<CorrectiveMeasureData>> {
        let measure = measures::delete_measure(&mut self.state.measures, id)?;
        tracing::info!(id = %measure.id, "measure deleted");
        Ok(self.applied(measure, &[Collection::Measures]))
    }

    // ------------------------------------------------------------------------
    // Collection points and samples
    // ------------------------------------------------------------------------

    pub fn collection_points(&self) -> &[CollectionPoint] {
        &self.state.points
    }

    /// Registers a collection point. Labels are unique.
    pub fn add_collection_point(
        &mut self,
        point: CollectionPoint,
    ) -> SurveillanceResult<Applied<CollectionPoint>> {
        if self.state.points.iter().any(|p| p.label == point.label) {
            return Err(SurveillanceError::InvalidInput(format!(
                "a collection point labelled '{}' already exists",
                point.label
            )));
        }
        self.state.points.push(point.clone());
        tracing::info!(label = %point.label, "collection point registered");
        Ok(self.applied(point, &[Collection::Points]))
    }

    /// Samples in collection order, optionally including archived ones.
    pub fn samples(&self, include_archived: bool) -> Vec<&SampleData> {
        self.state
            .samples
            .iter()
            .filter(|s| include_archived || !s.archived)
            .collect()
    }

    /// Records a sample taken at the registered point `point_label` and schedules its J2 and
    /// J7 readings.
    ///
    /// # Errors
    ///
    /// Returns [`SurveillanceError::NotFound`] if no point has this label.
    pub fn collect_sample(
        &mut self,
        point_label: &str,
        operator: &str,
        collection_date: NaiveDate,
    ) -> SurveillanceResult<Applied<CollectedSample>> {
        let point = self
            .state
            .points
            .iter()
            .find(|p| p.label.as_str() == point_label.trim())
            .cloned()
            .ok_or_else(|| {
                SurveillanceError::NotFound(format!("collection point '{}'", point_label.trim()))
            })?;

        let sample = SampleData {
            id: RecordId::new(),
            point,
            operator: operator.trim().to_string(),
            collection_date,
            archived: false,
        };
        let readings = scheduler::schedule_readings(&sample)?;

        self.state.samples.push(sample.clone());
        self.state.readings.extend(readings.iter().cloned());
        tracing::info!(
            sample_id = %sample.id,
            point = sample.label(),
            %collection_date,
            "sample collected, J2 and J7 scheduled"
        );

        Ok(self.applied(
            CollectedSample { sample, readings },
            &[Collection::Samples, Collection::Readings],
        ))
    }

    /// Explicit operator archival. Archived samples' readings leave the eligible view.
    pub fn archive_sample(&mut self, sample_id: RecordId) -> SurveillanceResult<Applied<SampleData>> {
        let sample = self.sample_mut(sample_id)?;
        if sample.archived {
            return Err(SurveillanceError::InvalidTransition(format!(
                "sample {sample_id} is already archived"
            )));
        }
        sample.archived = true;
        let sample = sample.clone();
        tracing::info!(%sample_id, "sample archived by operator");
        Ok(self.applied(sample, &[Collection::Samples]))
    }

    // ------------------------------------------------------------------------
    // Readings
    // ------------------------------------------------------------------------

    /// Readings that can be resolved on `today`, excluding archived samples.
    pub fn eligible_readings(&self, today: NaiveDate) -> Vec<DueReading> {
        let samples: HashMap<RecordId, &SampleData> =
            self.state.samples.iter().map(|s| (s.id, s)).collect();

        scheduler::eligible_readings(&self.state.readings, today)
            .into_iter()
            .filter_map(|reading| {
                let sample = samples.get(&reading.sample_id)?;
                (!sample.archived).then(|| DueReading {
                    reading: reading.clone(),
                    sample: (*sample).clone(),
                })
            })
            .collect()
    }

    /// Resolves a due reading.
    ///
    /// A negative result marks the reading done and appends an `ok` record; the sample is
    /// archived when the reading is J7, or J2 with no pending J7. A positive result marks the
    /// reading done and opens a pending identification; the sample stays active.
    ///
    /// # Arguments
    ///
    /// * `reading_id` - The reading to resolve.
    /// * `result` - Negative, or positive with a colony count.
    /// * `today` - Resolution date; also the date of the resulting record.
    /// * `operator` - Falls back to the sample's operator when blank.
    /// * `remark` - Free text stored on a negative record.
    ///
    /// # Errors
    ///
    /// - [`SurveillanceError::InvalidInput`] if a positive result carries a zero count.
    /// - [`SurveillanceError::NotFound`] if the reading or its sample does not exist.
    /// - [`SurveillanceError::InvalidTransition`] if the reading is done, blocked, not yet
    ///   due, or belongs to an archived sample.
    pub fn resolve_reading(
        &mut self,
        reading_id: RecordId,
        result: ReadingResult,
        today: NaiveDate,
        operator: &str,
        remark: &str,
    ) -> SurveillanceResult<Applied<ReadingOutcome>> {
        if let ReadingResult::Positive { colony_count: 0 } = result {
            return Err(SurveillanceError::InvalidInput(
                "a positive reading needs a colony count above zero".into(),
            ));
        }
        let idx = scheduler::resolvable_index(&self.state.readings, reading_id, today)?;
        let reading = self.state.readings[idx].clone();
        let sample = self.sample(reading.sample_id)?.clone();
        if sample.archived {
            return Err(SurveillanceError::InvalidTransition(format!(
                "sample {} is archived",
                sample.id
            )));
        }

        self.state.readings[idx].status = ReadingStatus::Done;

        match result {
            ReadingResult::Negative => {
                let record = SurveillanceRecordData {
                    id: RecordId::new(),
                    date: today,
                    sample_label: sample.label().to_string(),
                    entered_text: String::new(),
                    matched_name: None,
                    match_confidence: None,
                    colony_count: 0,
                    risk_tier: None,
                    alert_threshold: None,
                    action_threshold: None,
                    status: RecordStatus::Ok,
                    operator: operator_or(operator, &sample),
                    remark: remark.trim().to_string(),
                    sample_id: Some(sample.id),
                    reading_id: Some(reading.id),
                };
                self.state.ledger.push(record.clone());

                let sample_archived =
                    scheduler::negative_archives_sample(&self.state.readings, &reading);
                if sample_archived {
                    self.sample_mut(sample.id)?.archived = true;
                }
                tracing::info!(
                    %reading_id,
                    when = %reading.when,
                    sample_archived,
                    "reading resolved negative"
                );

                Ok(self.applied(
                    ReadingOutcome::Negative {
                        record,
                        sample_archived,
                    },
                    &[Collection::Readings, Collection::Ledger, Collection::Samples],
                ))
            }
            ReadingResult::Positive { colony_count } => {
                let identification = PendingIdentificationData {
                    id: RecordId::new(),
                    sample_id: sample.id,
                    reading_id: reading.id,
                    when: reading.when,
                    colony_count,
                    date: today,
                    status: IdentificationStatus::Pending,
                };
                self.state.identifications.push(identification.clone());
                tracing::info!(
                    %reading_id,
                    when = %reading.when,
                    colony_count,
                    "reading resolved positive, identification pending"
                );

                Ok(self.applied(
                    ReadingOutcome::Positive { identification },
                    &[Collection::Readings, Collection::Identifications],
                ))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Identifications
    // ------------------------------------------------------------------------

    pub fn identifications(&self, pending_only: bool) -> Vec<&PendingIdentificationData> {
        self.state
            .identifications
            .iter()
            .filter(|i| !pending_only || i.is_pending())
            .collect()
    }

    /// Completes a pending identification.
    ///
    /// The organism text is matched against the taxonomy. Below the acceptance floor the
    /// outcome is [`IdentificationOutcome::Unresolved`] and nothing changes. Otherwise the
    /// count is classified, the corrective checklist selected, a record appended, and the
    /// identification marked done. The sample is not archived.
    ///
    /// # Errors
    ///
    /// - [`SurveillanceError::InvalidInput`] if the organism text is blank.
    /// - [`SurveillanceError::NotFound`] if the identification or its sample does not exist.
    /// - [`SurveillanceError::InvalidTransition`] if the identification is already done.
    pub fn identify(
        &mut self,
        identification_id: RecordId,
        input: IdentificationInput,
    ) -> SurveillanceResult<Applied<IdentificationOutcome>> {
        let organism_text = input.organism_text.trim();
        if organism_text.is_empty() {
            return Err(SurveillanceError::InvalidInput(
                "organism name is required".into(),
            ));
        }
        let idx = self.identification_index(identification_id)?;
        let pending = self.state.identifications[idx].clone();
        if !pending.is_pending() {
            return Err(SurveillanceError::InvalidTransition(format!(
                "identification {identification_id} is already done"
            )));
        }
        let sample = self.sample(pending.sample_id)?.clone();

        let report = self.match_organism(organism_text);
        let organism = match report.candidate {
            Some(organism) if report.accepted => organism,
            candidate => {
                tracing::info!(
                    %identification_id,
                    query = organism_text,
                    score = report.score,
                    "identification unresolved"
                );
                return Ok(Applied {
                    value: IdentificationOutcome::Unresolved {
                        best_candidate: candidate.map(|o| o.name.into_inner()),
                        score: report.score,
                    },
                    save_error: None,
                });
            }
        };

        let classification = self.classify(organism.risk_tier, pending.colony_count);
        let corrective_action = measures::corrective_action(
            &self.state.measures,
            organism.origin(),
            organism.risk_tier,
            classification.status,
        );

        let record = SurveillanceRecordData {
            id: RecordId::new(),
            date: pending.date,
            sample_label: sample.label().to_string(),
            entered_text: organism_text.to_string(),
            matched_name: Some(organism.name.to_string()),
            match_confidence: Some(report.score),
            colony_count: pending.colony_count,
            risk_tier: Some(organism.risk_tier),
            alert_threshold: Some(classification.profile.alert_count),
            action_threshold: Some(classification.profile.action_count),
            status: classification.status,
            operator: operator_or(&input.operator, &sample),
            remark: input.remark.trim().to_string(),
            sample_id: Some(sample.id),
            reading_id: Some(pending.reading_id),
        };
        self.state.ledger.push(record.clone());
        self.state.identifications[idx].status = IdentificationStatus::Done;

        tracing::info!(
            %identification_id,
            organism = %organism.name,
            score = report.score,
            status = %classification.status,
            "identification recorded"
        );

        Ok(self.applied(
            IdentificationOutcome::Recorded {
                record,
                organism,
                classification,
                corrective_action,
            },
            &[Collection::Ledger, Collection::Identifications],
        ))
    }

    /// Reverts an identification: it is removed, its reading returns to pending, and an
    /// archived sample is un-archived. Ledger records are left as they are.
    pub fn reopen_identification(
        &mut self,
        identification_id: RecordId,
    ) -> SurveillanceResult<Applied<ScheduledReadingData>> {
        let idx = self.identification_index(identification_id)?;
        let reading_id = self.state.identifications[idx].reading_id;
        let sample_id = self.state.identifications[idx].sample_id;
        let reading_idx = self
            .state
            .readings
            .iter()
            .position(|r| r.id == reading_id)
            .ok_or_else(|| SurveillanceError::NotFound(format!("reading {reading_id}")))?;
        let sample = self.sample_mut(sample_id)?;

        sample.archived = false;
        self.state.identifications.remove(idx);
        self.state.readings[reading_idx].status = ReadingStatus::Pending;
        let reading = self.state.readings[reading_idx].clone();

        tracing::info!(%identification_id, %reading_id, "identification reopened");
        Ok(self.applied(
            reading,
            &[
                Collection::Identifications,
                Collection::Readings,
                Collection::Samples,
            ],
        ))
    }

    /// Removes an identification. Its reading stays done.
    pub fn discard_identification(
        &mut self,
        identification_id: RecordId,
    ) -> SurveillanceResult<Applied<PendingIdentificationData>> {
        let idx = self.identification_index(identification_id)?;
        let removed = self.state.identifications.remove(idx);
        tracing::info!(%identification_id, "identification discarded");
        Ok(self.applied(removed, &[Collection::Identifications]))
    }

    // ------------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------------

    pub fn ledger(&self) -> &[SurveillanceRecordData] {
        &self.state.ledger
    }

    pub fn ledger_rows(&self) -> Vec<LedgerRow> {
        self.state.ledger.iter().map(|r| r.to_row()).collect()
    }

    pub fn recent_records(&self, limit: usize) -> Vec<&SurveillanceRecordData> {
        ledger::recent(&self.state.ledger, limit)
    }

    pub fn ledger_stats(&self) -> LedgerStats {
        ledger::stats(&self.state.ledger)
    }

    pub fn delete_record(
        &mut self,
        id: RecordId,
    ) -> SurveillanceResult<Applied<SurveillanceRecordData>> {
        let removed = ledger::delete_record(&mut self.state.ledger, id)?;
        tracing::info!(%id, "ledger record deleted");
        Ok(self.applied(removed, &[Collection::Ledger]))
    }

    /// Removes every ledger record and returns how many were removed.
    pub fn clear_ledger(&mut self) -> Applied<usize> {
        let removed = self.state.ledger.len();
        self.state.ledger.clear();
        tracing::info!(removed, "ledger cleared");
        self.applied(removed, &[Collection::Ledger])
    }

    // ------------------------------------------------------------------------
    // Helpers (internal)
    // ------------------------------------------------------------------------

    fn sample(&self, id: RecordId) -> SurveillanceResult<&SampleData> {
        self.state
            .samples
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| SurveillanceError::NotFound(format!("sample {id}")))
    }

    fn sample_mut(&mut self, id: RecordId) -> SurveillanceResult<&mut SampleData> {
        self.state
            .samples
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SurveillanceError::NotFound(format!("sample {id}")))
    }

    fn identification_index(&self, id: RecordId) -> SurveillanceResult<usize> {
        self.state
            .identifications
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| SurveillanceError::NotFound(format!("identification {id}")))
    }

    fn applied<T>(&self, value: T, collections: &[Collection]) -> Applied<T> {
        Applied {
            value,
            save_error: self.persist(collections),
        }
    }

    /// Saves each collection, continuing past failures. Returns the joined error messages.
    fn persist(&self, collections: &[Collection]) -> Option<String> {
        let errors: Vec<String> = collections
            .iter()
            .filter_map(|collection| {
                let result = match collection {
                    Collection::Organisms => self.store.save_organisms(&self.state.organisms),
                    Collection::Thresholds => self
                        .store
                        .save_thresholds(self.state.thresholds.configured()),
                    Collection::Measures => self.store.save_measures(&self.state.measures),
                    Collection::Points => self.store.save_collection_points(&self.state.points),
                    Collection::Samples => self.store.save_samples(&self.state.samples),
                    Collection::Readings => self.store.save_schedules(&self.state.readings),
                    Collection::Identifications => self
                        .store
                        .save_identifications(&self.state.identifications),
                    Collection::Ledger => self.store.save_ledger(&self.state.ledger),
                };
                result.err().map(|e| {
                    tracing::error!(?collection, error = %e, "failed to save collection");
                    format!("{collection:?}: {e}")
                })
            })
            .collect();

        (!errors.is_empty()).then(|| errors.join("; "))
    }
}

fn or_fallback<T>(
    what: &str,
    loaded: SurveillanceResult<Option<T>>,
    fallback: impl FnOnce() -> T,
) -> T {
    match loaded {
        Ok(Some(value)) => value,
        Ok(None) => fallback(),
        Err(e) => {
            tracing::warn!(collection = what, error = %e, "failed to load collection, using fallback");
            fallback()
        }
    }
}

fn operator_or(operator: &str, sample: &SampleData) -> String {
    match operator.trim() {
        "" => sample.operator.clone(),
        given => given.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CORRUPT_SUFFIX, LEDGER_FILENAME, ORGANISMS_FILENAME};
    use std::path::Path;
    use tempfile::TempDir;
    use urc_records::{NonEmptyText, RiskFilter, SampleType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn tier(v: i64) -> RiskTier {
        RiskTier::new(v).expect("valid tier")
    }

    fn test_cfg(data_dir: &Path) -> Arc<CoreConfig> {
        Arc::new(CoreConfig::with_data_dir(data_dir.to_path_buf()).expect("config"))
    }

    fn open(data_dir: &Path) -> SurveillanceService<FileStore> {
        SurveillanceService::open_data_dir(test_cfg(data_dir)).expect("open service")
    }

    fn point(label: &str) -> CollectionPoint {
        CollectionPoint {
            label: NonEmptyText::new(label).expect("label"),
            sample_type: SampleType::Air,
            room_class: "A".into(),
            growth_medium: "TSA".into(),
        }
    }

    /// Collects a sample on 2026-03-02 at a fresh point. J2 is due 03-04, J7 03-09.
    fn collected(service: &mut SurveillanceService<FileStore>) -> CollectedSample {
        service
            .add_collection_point(point("Isolateur 1"))
            .expect("add point");
        service
            .collect_sample("Isolateur 1", "Marie", date(2026, 3, 2))
            .expect("collect")
            .value
    }

    #[test]
    fn test_open_empty_dir_uses_seed() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let service = open(temp_dir.path());

        assert_eq!(service.organisms().len(), 51);
        assert_eq!(service.measures().len(), 52);
        assert!(service.ledger().is_empty());
        assert_eq!(service.thresholds()[0], (tier(5), ThresholdProfile::new(1, 1)));
    }

    #[test]
    fn test_open_falls_back_on_corrupt_collection() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join(ORGANISMS_FILENAME), "organisms: {").expect("write");
        std::fs::write(temp_dir.path().join(LEDGER_FILENAME), "nonsense: true").expect("write");

        let service = open(temp_dir.path());
        assert_eq!(service.organisms().len(), 51);
        assert!(service.ledger().is_empty());

        let aside = temp_dir.path().join(format!("{LEDGER_FILENAME}{CORRUPT_SUFFIX}"));
        assert_eq!(std::fs::read_to_string(aside).expect("kept aside"), "nonsense: true");
    }

    #[test]
    fn test_collect_persists_sample_and_readings() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        let collected = collected(&mut service);

        assert_eq!(collected.readings[0].due_date, date(2026, 3, 4));
        assert_eq!(collected.readings[1].due_date, date(2026, 3, 9));

        let reopened = open(temp_dir.path());
        assert_eq!(reopened.samples(false).len(), 1);
        assert_eq!(reopened.state().readings, collected.readings.to_vec());
        assert_eq!(reopened.collection_points().len(), 1);
    }

    #[test]
    fn test_collect_at_unknown_point_is_rejected_without_change() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        let err = service
            .collect_sample("Nowhere", "Marie", date(2026, 3, 2))
            .expect_err("unknown point");
        assert!(matches!(err, SurveillanceError::NotFound(_)));
        assert!(service.samples(true).is_empty());
        assert!(service.state().readings.is_empty());
    }

    #[test]
    fn test_duplicate_point_label_is_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        service.add_collection_point(point("P1")).expect("first");
        let err = service.add_collection_point(point("P1")).expect_err("duplicate");
        assert!(err.is_validation());
        assert_eq!(service.collection_points().len(), 1);
    }

    #[test]
    fn test_j7_not_eligible_while_j2_pending() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        collected(&mut service);

        let due = service.eligible_readings(date(2026, 3, 20));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].reading.when, urc_records::ReadingMilestone::J2);
        assert_eq!(due[0].sample.label(), "Isolateur 1");
    }

    #[test]
    fn test_scenario_a_abbreviated_name_triggers_action_checklist() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        let collected = collected(&mut service);
        let j2 = collected.readings[0].id;

        let outcome = service
            .resolve_reading(
                j2,
                ReadingResult::from_colony_count(30),
                date(2026, 3, 4),
                "",
                "",
            )
            .expect("resolve positive")
            .value;
        let ReadingOutcome::Positive { identification } = outcome else {
            panic!("expected a pending identification");
        };
        assert_eq!(identification.colony_count, 30);
        assert!(!service.samples(true)[0].archived);

        let applied = service
            .identify(
                identification.id,
                IdentificationInput {
                    organism_text: "E.coli".into(),
                    operator: String::new(),
                    remark: "Poste A".into(),
                },
            )
            .expect("identify");
        assert!(applied.is_saved());

        match applied.value {
            IdentificationOutcome::Recorded {
                record,
                organism,
                classification,
                corrective_action,
            } => {
                assert_eq!(organism.name.as_str(), "Escherichia coli");
                assert_eq!(classification.status, RecordStatus::Action);
                assert_eq!(record.alert_threshold, Some(10));
                assert_eq!(record.action_threshold, Some(25));
                assert_eq!(record.operator, "Marie");
                assert_eq!(record.to_row().confidence, "45%");

                let CorrectiveAction::Measures(measures) = corrective_action else {
                    panic!("expected measures");
                };
                let ids: Vec<&str> = measures.iter().map(|m| m.id.as_str()).collect();
                assert_eq!(
                    ids,
                    vec!["m010", "m011", "m012", "m013", "m014", "m015", "m062", "m063", "m064"]
                );
            }
            other => panic!("expected a recorded identification, got {other:?}"),
        }

        assert!(service.identifications(true).is_empty());
        assert!(!service.samples(true)[0].archived);
        assert_eq!(service.ledger_stats().actions, 1);
    }

    #[test]
    fn test_scenario_b_zero_count_is_conforming_without_measures() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        let collected = collected(&mut service);

        let classification = service.classify(tier(4), 0);
        assert_eq!(classification.status, RecordStatus::Ok);
        assert_eq!(
            measures::corrective_action(service.measures(), "Flore fécale", tier(4), RecordStatus::Ok),
            CorrectiveAction::NotRequired
        );

        let outcome = service
            .resolve_reading(
                collected.readings[0].id,
                ReadingResult::from_colony_count(0),
                date(2026, 3, 4),
                "Paul",
                "",
            )
            .expect("resolve")
            .value;
        match outcome {
            ReadingOutcome::Negative { record, .. } => {
                assert_eq!(record.status, RecordStatus::Ok);
                assert_eq!(record.operator, "Paul");
                assert_eq!(record.matched_name, None);
            }
            other => panic!("expected negative outcome, got {other:?}"),
        }
        assert!(service.identifications(false).is_empty());
    }

    #[test]
    fn test_scenario_c_archive_only_after_terminal_negative() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        let collected = collected(&mut service);
        let [j2, j7] = collected.readings;

        let outcome = service
            .resolve_reading(j2.id, ReadingResult::Negative, date(2026, 3, 4), "", "")
            .expect("J2 negative")
            .value;
        assert!(matches!(
            outcome,
            ReadingOutcome::Negative {
                sample_archived: false,
                ..
            }
        ));
        assert!(!service.samples(true)[0].archived);

        let due = service.eligible_readings(date(2026, 3, 9));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].reading.id, j7.id);

        let outcome = service
            .resolve_reading(j7.id, ReadingResult::Negative, date(2026, 3, 9), "", "")
            .expect("J7 negative")
            .value;
        assert!(matches!(
            outcome,
            ReadingOutcome::Negative {
                sample_archived: true,
                ..
            }
        ));
        assert!(service.samples(true)[0].archived);
        assert!(service.samples(false).is_empty());
        assert_eq!(service.ledger_stats().conforming, 2);
    }

    #[test]
    fn test_scenario_d_empty_taxonomy_leaves_identification_unresolved() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        FileStore::new(temp_dir.path())
            .save_organisms(&[])
            .expect("save empty taxonomy");
        let mut service = open(temp_dir.path());
        assert!(service.organisms().is_empty());

        let report = service.match_organism("Escherichia coli");
        assert!(report.candidate.is_none());
        assert_eq!(report.score, 0.0);
        assert!(!report.accepted);

        let collected = collected(&mut service);
        let ReadingOutcome::Positive { identification } = service
            .resolve_reading(
                collected.readings[0].id,
                ReadingResult::Positive { colony_count: 4 },
                date(2026, 3, 4),
                "",
                "",
            )
            .expect("positive")
            .value
        else {
            panic!("expected pending identification");
        };

        let outcome = service
            .identify(
                identification.id,
                IdentificationInput {
                    organism_text: "Escherichia coli".into(),
                    ..IdentificationInput::default()
                },
            )
            .expect("identify")
            .value;
        assert_eq!(
            outcome,
            IdentificationOutcome::Unresolved {
                best_candidate: None,
                score: 0.0
            }
        );
        assert!(service.ledger().is_empty());
        assert_eq!(service.identifications(true).len(), 1);
    }

    #[test]
    fn test_resolve_rejects_early_and_repeated_resolution() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        let collected = collected(&mut service);
        let j2 = collected.readings[0].id;

        let err = service
            .resolve_reading(j2, ReadingResult::Negative, date(2026, 3, 3), "", "")
            .expect_err("not due");
        assert!(matches!(err, SurveillanceError::InvalidTransition(_)));
        assert!(service.ledger().is_empty());

        service
            .resolve_reading(j2, ReadingResult::Negative, date(2026, 3, 4), "", "")
            .expect("due");
        let err = service
            .resolve_reading(j2, ReadingResult::Negative, date(2026, 3, 4), "", "")
            .expect_err("already done");
        assert!(matches!(err, SurveillanceError::InvalidTransition(_)));
        assert_eq!(service.ledger().len(), 1);
    }

    #[test]
    fn test_reopen_restores_reading_and_unarchives_sample() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        let collected = collected(&mut service);
        let [j2, j7] = collected.readings;

        service
            .resolve_reading(j2.id, ReadingResult::Negative, date(2026, 3, 4), "", "")
            .expect("J2 negative");
        let ReadingOutcome::Positive { identification } = service
            .resolve_reading(
                j7.id,
                ReadingResult::Positive { colony_count: 2 },
                date(2026, 3, 9),
                "",
                "",
            )
            .expect("J7 positive")
            .value
        else {
            panic!("expected pending identification");
        };
        service
            .identify(
                identification.id,
                IdentificationInput {
                    organism_text: "Candida albicans".into(),
                    ..IdentificationInput::default()
                },
            )
            .expect("identify");
        service
            .archive_sample(collected.sample.id)
            .expect("operator archive");
        assert!(service.eligible_readings(date(2026, 3, 20)).is_empty());

        let reading = service
            .reopen_identification(identification.id)
            .expect("reopen")
            .value;
        assert_eq!(reading.id, j7.id);
        assert_eq!(reading.status, ReadingStatus::Pending);
        assert!(service.identifications(false).is_empty());
        assert!(!service.samples(true)[0].archived);
        assert_eq!(service.eligible_readings(date(2026, 3, 20)).len(), 1);
        // The ledger keeps both records.
        assert_eq!(service.ledger().len(), 2);
    }

    #[test]
    fn test_discard_keeps_reading_done() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        let collected = collected(&mut service);

        let ReadingOutcome::Positive { identification } = service
            .resolve_reading(
                collected.readings[0].id,
                ReadingResult::Positive { colony_count: 1 },
                date(2026, 3, 4),
                "",
                "",
            )
            .expect("positive")
            .value
        else {
            panic!("expected pending identification");
        };

        service
            .discard_identification(identification.id)
            .expect("discard");
        assert!(service.identifications(false).is_empty());
        assert_eq!(service.state().readings[0].status, ReadingStatus::Done);
    }

    #[test]
    fn test_failed_save_keeps_transition() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let blocker = temp_dir.path().join("data");
        std::fs::write(&blocker, "not a directory").expect("write");
        let mut service = open(&blocker);

        let applied = service
            .add_collection_point(point("Isolateur 1"))
            .expect("validation passes");
        assert!(applied.save_error.is_some());
        assert_eq!(service.collection_points().len(), 1);
    }

    #[test]
    fn test_threshold_set_and_reset_persist() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());

        let applied = service.set_threshold(tier(3), ThresholdProfile::new(50, 30));
        assert!(applied.is_saved());
        assert_eq!(service.classify(tier(3), 30).status, RecordStatus::Action);

        let reopened = open(temp_dir.path());
        assert_eq!(
            reopened.thresholds()[2],
            (tier(3), ThresholdProfile::new(50, 30))
        );

        service.reset_thresholds();
        assert_eq!(service.thresholds()[2], (tier(3), ThresholdProfile::new(25, 40)));
    }

    #[test]
    fn test_ledger_delete_and_clear() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        let collected = collected(&mut service);
        let [j2, j7] = collected.readings;
        service
            .resolve_reading(j2.id, ReadingResult::Negative, date(2026, 3, 4), "", "")
            .expect("J2");
        service
            .resolve_reading(j7.id, ReadingResult::Negative, date(2026, 3, 9), "", "")
            .expect("J7");

        let newest = service.recent_records(1)[0].id;
        assert_eq!(service.ledger()[1].id, newest);

        service.delete_record(newest).expect("delete");
        assert_eq!(service.ledger_rows().len(), 1);

        assert_eq!(service.clear_ledger().value, 1);
        assert!(open(temp_dir.path()).ledger().is_empty());
    }

    #[test]
    fn test_organism_admin_persists() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        service.delete_organism("Mucorales").expect("delete");

        let reopened = open(temp_dir.path());
        assert_eq!(reopened.organisms().len(), 50);
        assert!(reopened.match_organism("Mucorales").candidate.map_or(true, |o| o.name.as_str() != "Mucorales"));
    }

    #[test]
    fn test_zero_count_positive_is_rejected_before_mutation() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());
        let first = collected(&mut service);
        service
            .add_collection_point(point("Isolateur 2"))
            .expect("add point");
        let second = service
            .collect_sample("Isolateur 2", "Marie", date(2026, 3, 2))
            .expect("collect")
            .value;

        service
            .resolve_reading(
                first.readings[0].id,
                ReadingResult::Positive { colony_count: 5 },
                date(2026, 3, 4),
                "",
                "",
            )
            .expect("positive");
        let err = service
            .resolve_reading(
                second.readings[0].id,
                ReadingResult::Positive { colony_count: 0 },
                date(2026, 3, 4),
                "",
                "",
            )
            .expect_err("zero count");
        assert!(matches!(err, SurveillanceError::InvalidInput(_)));

        let untouched = service
            .state()
            .readings
            .iter()
            .find(|r| r.id == second.readings[0].id)
            .expect("reading");
        assert_eq!(untouched.status, ReadingStatus::Pending);
        assert_eq!(service.identifications(false).len(), 1);

        let reopened = open(temp_dir.path());
        assert_eq!(reopened.state().identifications, service.state().identifications);
    }

    #[test]
    fn test_every_collection_survives_reopen_after_admin_and_workflow() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut service = open(temp_dir.path());

        let organism = OrganismDraft {
            name: "Ralstonia pickettii".into(),
            family: "Bactéries".into(),
            source: "Environnemental".into(),
            origin: "Humidité".into(),
            risk_tier: tier(2),
            pathogenicity: String::new(),
            surfa_safe: urc_records::SurfaSafeSensitivity::Sensitive,
            apa: urc_records::ApaSensitivity::Sensitive,
            note: " ".into(),
            long_comment: "Eau de rinçage".into(),
        };
        assert!(service.add_organism(organism).expect("organism").is_saved());
        assert!(service
            .set_threshold(tier(3), ThresholdProfile::new(50, 30))
            .is_saved());

        let tiers = RiskFilter::from_tiers([tier(3), tier(5)]).expect("tiers");
        let added = service
            .add_measure(MeasureDraft {
                text: "Renforcer le bionettoyage".into(),
                scope: MeasureScope::parse("Humidité").expect("scope"),
                risk: tiers,
                measure_type: MeasureType::Both,
            })
            .expect("add measure");
        assert!(added.is_saved());
        service
            .edit_measure(
                "m001",
                MeasureDraft {
                    text: "Documenter dans le registre".into(),
                    scope: MeasureScope::All,
                    risk: RiskFilter::Single(tier(4)),
                    measure_type: MeasureType::Alert,
                },
            )
            .expect("edit measure");

        let first = collected(&mut service);
        let mut surface = point("Plan de travail");
        surface.sample_type = SampleType::Surface;
        service.add_collection_point(surface).expect("add point");
        let second = service
            .collect_sample("Plan de travail", "Paul", date(2026, 3, 3))
            .expect("collect")
            .value;

        let positive = service
            .resolve_reading(
                first.readings[0].id,
                ReadingResult::from_colony_count(12),
                date(2026, 3, 4),
                "",
                "",
            )
            .expect("positive")
            .value;
        let ReadingOutcome::Positive { identification } = positive else {
            panic!("expected a pending identification");
        };
        service
            .identify(
                identification.id,
                IdentificationInput {
                    organism_text: "E.coli".into(),
                    operator: "Lea".into(),
                    remark: "Gant droit".into(),
                },
            )
            .expect("identify");
        for (reading, day) in [(second.readings[0].id, 5), (second.readings[1].id, 10)] {
            service
                .resolve_reading(reading, ReadingResult::Negative, date(2026, 3, day), "", "")
                .expect("negative");
        }
        assert!(service.samples(true).iter().any(|s| s.archived));

        let reopened = open(temp_dir.path());
        let (saved, loaded) = (service.state(), reopened.state());
        assert_eq!(loaded.organisms, saved.organisms);
        assert_eq!(loaded.thresholds.configured(), saved.thresholds.configured());
        assert_eq!(reopened.thresholds(), service.thresholds());
        assert_eq!(loaded.measures, saved.measures);
        assert_eq!(loaded.points, saved.points);
        assert_eq!(loaded.samples, saved.samples);
        assert_eq!(loaded.readings, saved.readings);
        assert_eq!(loaded.identifications, saved.identifications);
        assert_eq!(loaded.ledger, saved.ledger);
        assert_eq!(loaded.ledger.len(), 3);
    }
}
