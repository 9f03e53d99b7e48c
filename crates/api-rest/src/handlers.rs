//! HTTP handlers, one per service operation.

use crate::dto::*;
use crate::error::{ApiError, ApiResult, ErrorRes};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use urc_core::{IdentificationInput, IdentificationOutcome, ReadingOutcome, ReadingResult};
use urc_records::{confidence_percent, MeasureType, RecordId, ThresholdProfile};

fn record_id(raw: &str) -> Result<RecordId, ApiError> {
    Ok(RecordId::parse(raw)?)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "URC surveillance API is alive".into(),
    })
}

// ============================================================================
// Organisms
// ============================================================================

#[utoipa::path(
    get,
    path = "/organisms",
    responses((status = 200, description = "Taxonomy in stored order", body = OrganismListRes))
)]
pub async fn list_organisms(State(state): State<AppState>) -> Json<OrganismListRes> {
    let service = state.service.lock().await;
    Json(OrganismListRes {
        organisms: service.organisms().iter().map(OrganismDto::from).collect(),
    })
}

#[utoipa::path(
    get,
    path = "/organisms/by-tier",
    responses((status = 200, description = "Organisms grouped by risk tier, most critical first", body = OrganismsByTierRes))
)]
pub async fn organisms_by_tier(State(state): State<AppState>) -> Json<OrganismsByTierRes> {
    let service = state.service.lock().await;
    let groups = service
        .organisms_by_tier()
        .into_iter()
        .map(|(tier, members)| OrganismTierGroup {
            risk_tier: tier.value(),
            risk_label: tier.label().to_string(),
            organisms: members.into_iter().map(OrganismDto::from).collect(),
        })
        .collect();
    Json(OrganismsByTierRes { groups })
}

#[utoipa::path(
    get,
    path = "/organisms/origins",
    responses((status = 200, description = "Distinct origin leaves in first-seen order", body = OriginsRes))
)]
pub async fn list_origins(State(state): State<AppState>) -> Json<OriginsRes> {
    let service = state.service.lock().await;
    Json(OriginsRes {
        origins: service.origins(),
    })
}

#[utoipa::path(
    post,
    path = "/organisms",
    request_body = OrganismReq,
    responses(
        (status = 200, description = "Organism added", body = OrganismRes),
        (status = 400, description = "Invalid organism", body = ErrorRes)
    )
)]
pub async fn add_organism(
    State(state): State<AppState>,
    Json(req): Json<OrganismReq>,
) -> ApiResult<OrganismRes> {
    let draft = req.into_draft()?;
    let applied = state.service.lock().await.add_organism(draft)?;
    Ok(Json(OrganismRes {
        organism: OrganismDto::from(&applied.value),
        save_error: applied.save_error,
    }))
}

#[utoipa::path(
    put,
    path = "/organisms/{name}",
    params(("name" = String, Path, description = "Current organism name")),
    request_body = OrganismReq,
    responses(
        (status = 200, description = "Organism updated", body = OrganismRes),
        (status = 400, description = "Invalid organism", body = ErrorRes),
        (status = 404, description = "Unknown organism", body = ErrorRes)
    )
)]
pub async fn edit_organism(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<OrganismReq>,
) -> ApiResult<OrganismRes> {
    let draft = req.into_draft()?;
    let applied = state.service.lock().await.edit_organism(&name, draft)?;
    Ok(Json(OrganismRes {
        organism: OrganismDto::from(&applied.value),
        save_error: applied.save_error,
    }))
}

#[utoipa::path(
    delete,
    path = "/organisms/{name}",
    params(("name" = String, Path, description = "Organism name")),
    responses(
        (status = 200, description = "Organism deleted", body = OrganismRes),
        (status = 404, description = "Unknown organism", body = ErrorRes)
    )
)]
pub async fn delete_organism(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<OrganismRes> {
    let applied = state.service.lock().await.delete_organism(&name)?;
    Ok(Json(OrganismRes {
        organism: OrganismDto::from(&applied.value),
        save_error: applied.save_error,
    }))
}

#[utoipa::path(
    post,
    path = "/match",
    request_body = MatchReq,
    responses((status = 200, description = "Best candidate and whether it clears the acceptance floor", body = MatchRes))
)]
pub async fn match_organism(
    State(state): State<AppState>,
    Json(req): Json<MatchReq>,
) -> Json<MatchRes> {
    let report = state.service.lock().await.match_organism(&req.query);
    Json(MatchRes {
        risk_tier: report.candidate.as_ref().map(|o| o.risk_tier.value()),
        candidate: report.candidate.map(|o| o.name.into_inner()),
        score: report.score,
        confidence: confidence_percent(report.score),
        accepted: report.accepted,
    })
}

// ============================================================================
// Thresholds
// ============================================================================

#[utoipa::path(
    get,
    path = "/thresholds",
    responses((status = 200, description = "Effective profile for every tier", body = ThresholdListRes))
)]
pub async fn list_thresholds(State(state): State<AppState>) -> Json<ThresholdListRes> {
    let service = state.service.lock().await;
    Json(ThresholdListRes {
        profiles: service
            .thresholds()
            .into_iter()
            .map(|(tier, profile)| ThresholdDto::new(tier, profile))
            .collect(),
    })
}

#[utoipa::path(
    put,
    path = "/thresholds/{tier}",
    params(("tier" = u8, Path, description = "Risk tier 1-5")),
    request_body = ThresholdReq,
    responses(
        (status = 200, description = "Profile set", body = ThresholdRes),
        (status = 400, description = "Invalid tier", body = ErrorRes)
    )
)]
pub async fn set_threshold(
    State(state): State<AppState>,
    Path(tier_value): Path<u8>,
    Json(req): Json<ThresholdReq>,
) -> ApiResult<ThresholdRes> {
    let tier = tier(tier_value)?;
    let profile = ThresholdProfile::new(req.alert_count, req.action_count);
    let applied = state.service.lock().await.set_threshold(tier, profile);
    let warning = profile.is_inverted().then(|| {
        format!(
            "action count {} is below alert count {}",
            profile.action_count, profile.alert_count
        )
    });
    Ok(Json(ThresholdRes {
        profile: ThresholdDto::new(tier, applied.value),
        warning,
        save_error: applied.save_error,
    }))
}

#[utoipa::path(
    post,
    path = "/thresholds/reset",
    responses((status = 200, description = "Profiles reset to defaults", body = ThresholdResetRes))
)]
pub async fn reset_thresholds(State(state): State<AppState>) -> Json<ThresholdResetRes> {
    let applied = state.service.lock().await.reset_thresholds();
    Json(ThresholdResetRes {
        profiles: applied
            .value
            .into_iter()
            .map(|(tier, profile)| ThresholdDto::new(tier, profile))
            .collect(),
        save_error: applied.save_error,
    })
}

// ============================================================================
// Measures
// ============================================================================

#[utoipa::path(
    get,
    path = "/measures",
    params(MeasureQuery),
    responses(
        (status = 200, description = "Measures matching every given criterion", body = MeasureListRes),
        (status = 400, description = "Invalid filter", body = ErrorRes)
    )
)]
pub async fn list_measures(
    State(state): State<AppState>,
    Query(query): Query<MeasureQuery>,
) -> ApiResult<MeasureListRes> {
    let filter = query.into_filter()?;
    let service = state.service.lock().await;
    Ok(Json(MeasureListRes {
        measures: service
            .filter_measures(&filter)
            .into_iter()
            .map(MeasureDto::from)
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/measures/by-scope",
    responses((status = 200, description = "Measures grouped by scope, catalog-wide first", body = MeasureGroupsRes))
)]
pub async fn measures_by_scope(State(state): State<AppState>) -> Json<MeasureGroupsRes> {
    let service = state.service.lock().await;
    let groups = service
        .measures_by_scope()
        .into_iter()
        .map(|(scope, members)| MeasureGroup {
            scope: scope.as_str().to_string(),
            measures: members.into_iter().map(MeasureDto::from).collect(),
        })
        .collect();
    Json(MeasureGroupsRes { groups })
}

#[utoipa::path(
    post,
    path = "/measures",
    request_body = MeasureReq,
    responses(
        (status = 200, description = "Measure added", body = MeasureRes),
        (status = 400, description = "Invalid measure", body = ErrorRes)
    )
)]
pub async fn add_measure(
    State(state): State<AppState>,
    Json(req): Json<MeasureReq>,
) -> ApiResult<MeasureRes> {
    let draft = req.into_draft()?;
    let applied = state.service.lock().await.add_measure(draft)?;
    Ok(Json(MeasureRes {
        measure: MeasureDto::from(&applied.value),
        save_error: applied.save_error,
    }))
}

#[utoipa::path(
    put,
    path = "/measures/{id}",
    params(("id" = String, Path, description = "Measure id")),
    request_body = MeasureReq,
    responses(
        (status = 200, description = "Measure updated", body = MeasureRes),
        (status = 400, description = "Invalid measure", body = ErrorRes),
        (status = 404, description = "Unknown measure", body = ErrorRes)
    )
)]
pub async fn edit_measure(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MeasureReq>,
) -> ApiResult<MeasureRes> {
    let draft = req.into_draft()?;
    let applied = state.service.lock().await.edit_measure(&id, draft)?;
    Ok(Json(MeasureRes {
        measure: MeasureDto::from(&applied.value),
        save_error: applied.save_error,
    }))
}

#[utoipa::path(
    delete,
    path = "/measures/{id}",
    params(("id" = String, Path, description = "Measure id")),
    responses(
        (status = 200, description = "Measure deleted", body = MeasureRes),
        (status = 404, description = "Unknown measure", body = ErrorRes)
    )
)]
pub async fn delete_measure(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MeasureRes> {
    let applied = state.service.lock().await.delete_measure(&id)?;
    Ok(Json(MeasureRes {
        measure: MeasureDto::from(&applied.value),
        save_error: applied.save_error,
    }))
}

#[utoipa::path(
    post,
    path = "/measures/select",
    request_body = SelectReq,
    responses(
        (status = 200, description = "Checklist for the situation", body = ChecklistDto),
        (status = 400, description = "Invalid tier or type", body = ErrorRes)
    )
)]
pub async fn select_measures(
    State(state): State<AppState>,
    Json(req): Json<SelectReq>,
) -> ApiResult<ChecklistDto> {
    let tier = tier(req.risk_tier)?;
    let triggered = MeasureType::parse(&req.triggered)?;
    let action = state
        .service
        .lock()
        .await
        .select_measures(req.origin.trim(), tier, triggered);
    Ok(Json(ChecklistDto::from(&action)))
}

// ============================================================================
// Collection points and samples
// ============================================================================

#[utoipa::path(
    get,
    path = "/points",
    responses((status = 200, description = "Registered collection points", body = PointListRes))
)]
pub async fn list_points(State(state): State<AppState>) -> Json<PointListRes> {
    let service = state.service.lock().await;
    Json(PointListRes {
        points: service.collection_points().iter().map(PointDto::from).collect(),
    })
}

#[utoipa::path(
    post,
    path = "/points",
    request_body = PointDto,
    responses(
        (status = 200, description = "Collection point registered", body = PointRes),
        (status = 400, description = "Invalid or duplicate point", body = ErrorRes)
    )
)]
pub async fn add_point(
    State(state): State<AppState>,
    Json(req): Json<PointDto>,
) -> ApiResult<PointRes> {
    let point = req.into_point()?;
    let applied = state.service.lock().await.add_collection_point(point)?;
    Ok(Json(PointRes {
        point: PointDto::from(&applied.value),
        save_error: applied.save_error,
    }))
}

#[utoipa::path(
    get,
    path = "/samples",
    params(SampleQuery),
    responses((status = 200, description = "Samples in collection order", body = SampleListRes))
)]
pub async fn list_samples(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> Json<SampleListRes> {
    let service = state.service.lock().await;
    Json(SampleListRes {
        samples: service
            .samples(query.include_archived)
            .into_iter()
            .map(SampleDto::from)
            .collect(),
    })
}

#[utoipa::path(
    post,
    path = "/samples",
    request_body = CollectReq,
    responses(
        (status = 200, description = "Sample collected with J2 and J7 scheduled", body = CollectRes),
        (status = 400, description = "Invalid date", body = ErrorRes),
        (status = 404, description = "Unknown collection point", body = ErrorRes)
    )
)]
pub async fn collect_sample(
    State(state): State<AppState>,
    Json(req): Json<CollectReq>,
) -> ApiResult<CollectRes> {
    let collection_date = date_or_today(req.collection_date.as_deref())?;
    let applied =
        state
            .service
            .lock()
            .await
            .collect_sample(&req.point_label, &req.operator, collection_date)?;
    Ok(Json(CollectRes {
        sample: SampleDto::from(&applied.value.sample),
        readings: applied.value.readings.iter().map(ReadingDto::from).collect(),
        save_error: applied.save_error,
    }))
}

#[utoipa::path(
    post,
    path = "/samples/{id}/archive",
    params(("id" = String, Path, description = "Sample id")),
    responses(
        (status = 200, description = "Sample archived", body = SampleRes),
        (status = 400, description = "Already archived", body = ErrorRes),
        (status = 404, description = "Unknown sample", body = ErrorRes)
    )
)]
pub async fn archive_sample(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<SampleRes> {
    let id = record_id(&id)?;
    let applied = state.service.lock().await.archive_sample(id)?;
    Ok(Json(SampleRes {
        sample: SampleDto::from(&applied.value),
        save_error: applied.save_error,
    }))
}

// ============================================================================
// Readings
// ============================================================================

#[utoipa::path(
    get,
    path = "/readings/due",
    params(DueQuery),
    responses(
        (status = 200, description = "Readings that can be resolved on the given day", body = DueListRes),
        (status = 400, description = "Invalid date", body = ErrorRes)
    )
)]
pub async fn due_readings(
    State(state): State<AppState>,
    Query(query): Query<DueQuery>,
) -> ApiResult<DueListRes> {
    let today = date_or_today(query.today.as_deref())?;
    let service = state.service.lock().await;
    Ok(Json(DueListRes {
        readings: service
            .eligible_readings(today)
            .iter()
            .map(|due| DueReadingDto {
                reading: ReadingDto::from(&due.reading),
                sample: SampleDto::from(&due.sample),
            })
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/readings/{id}/resolve",
    params(("id" = String, Path, description = "Reading id")),
    request_body = ResolveReq,
    responses(
        (status = 200, description = "Reading resolved", body = ResolveRes),
        (status = 400, description = "Reading done, blocked or not yet due", body = ErrorRes),
        (status = 404, description = "Unknown reading", body = ErrorRes)
    )
)]
pub async fn resolve_reading(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ResolveReq>,
) -> ApiResult<ResolveRes> {
    let id = record_id(&id)?;
    let today = date_or_today(req.today.as_deref())?;
    let applied = state.service.lock().await.resolve_reading(
        id,
        ReadingResult::from_colony_count(req.colony_count),
        today,
        &req.operator,
        &req.remark,
    )?;

    let res = match &applied.value {
        ReadingOutcome::Negative {
            record,
            sample_archived,
        } => ResolveRes {
            outcome: "negative".into(),
            record: Some(LedgerRecordDto::from(record)),
            sample_archived: *sample_archived,
            identification: None,
            save_error: applied.save_error.clone(),
        },
        ReadingOutcome::Positive { identification } => ResolveRes {
            outcome: "positive".into(),
            record: None,
            sample_archived: false,
            identification: Some(IdentificationDto::from(identification)),
            save_error: applied.save_error.clone(),
        },
    };
    Ok(Json(res))
}

// ============================================================================
// Identifications
// ============================================================================

#[utoipa::path(
    get,
    path = "/identifications",
    params(IdentificationQuery),
    responses((status = 200, description = "Identifications", body = IdentificationListRes))
)]
pub async fn list_identifications(
    State(state): State<AppState>,
    Query(query): Query<IdentificationQuery>,
) -> Json<IdentificationListRes> {
    let service = state.service.lock().await;
    Json(IdentificationListRes {
        identifications: service
            .identifications(query.pending_only)
            .into_iter()
            .map(IdentificationDto::from)
            .collect(),
    })
}

#[utoipa::path(
    post,
    path = "/identifications/{id}/identify",
    params(("id" = String, Path, description = "Identification id")),
    request_body = IdentifyReq,
    responses(
        (status = 200, description = "Identification recorded, or unresolved with the best candidate", body = IdentifyRes),
        (status = 400, description = "Blank name or identification already done", body = ErrorRes),
        (status = 404, description = "Unknown identification", body = ErrorRes)
    )
)]
pub async fn identify(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<IdentifyReq>,
) -> ApiResult<IdentifyRes> {
    let id = record_id(&id)?;
    let applied = state.service.lock().await.identify(
        id,
        IdentificationInput {
            organism_text: req.organism,
            operator: req.operator,
            remark: req.remark,
        },
    )?;

    let res = match applied.value {
        IdentificationOutcome::Unresolved {
            best_candidate,
            score,
        } => IdentifyRes {
            resolved: false,
            best_candidate,
            score,
            organism: None,
            record: None,
            checklist: None,
            save_error: applied.save_error,
        },
        IdentificationOutcome::Recorded {
            record,
            organism,
            corrective_action,
            ..
        } => IdentifyRes {
            resolved: true,
            best_candidate: Some(organism.name.to_string()),
            score: record.match_confidence.unwrap_or_default(),
            organism: Some(OrganismDto::from(&organism)),
            record: Some(LedgerRecordDto::from(&record)),
            checklist: Some(ChecklistDto::from(&corrective_action)),
            save_error: applied.save_error,
        },
    };
    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/identifications/{id}/reopen",
    params(("id" = String, Path, description = "Identification id")),
    responses(
        (status = 200, description = "Identification removed and its reading pending again", body = ReopenRes),
        (status = 404, description = "Unknown identification", body = ErrorRes)
    )
)]
pub async fn reopen_identification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ReopenRes> {
    let id = record_id(&id)?;
    let applied = state.service.lock().await.reopen_identification(id)?;
    Ok(Json(ReopenRes {
        reading: ReadingDto::from(&applied.value),
        save_error: applied.save_error,
    }))
}

#[utoipa::path(
    delete,
    path = "/identifications/{id}",
    params(("id" = String, Path, description = "Identification id")),
    responses(
        (status = 200, description = "Identification discarded", body = DiscardRes),
        (status = 404, description = "Unknown identification", body = ErrorRes)
    )
)]
pub async fn discard_identification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DiscardRes> {
    let id = record_id(&id)?;
    let applied = state.service.lock().await.discard_identification(id)?;
    Ok(Json(DiscardRes {
        identification: IdentificationDto::from(&applied.value),
        save_error: applied.save_error,
    }))
}

// ============================================================================
// Ledger
// ============================================================================

#[utoipa::path(
    get,
    path = "/ledger",
    params(LedgerQuery),
    responses((status = 200, description = "Ledger records", body = LedgerListRes))
)]
pub async fn list_ledger(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> Json<LedgerListRes> {
    let service = state.service.lock().await;
    let records = match query.limit {
        Some(limit) => service
            .recent_records(limit)
            .into_iter()
            .map(LedgerRecordDto::from)
            .collect(),
        None => service.ledger().iter().map(LedgerRecordDto::from).collect(),
    };
    Json(LedgerListRes { records })
}

#[utoipa::path(
    get,
    path = "/ledger/stats",
    responses((status = 200, description = "Counts by outcome", body = LedgerStatsRes))
)]
pub async fn ledger_stats(State(state): State<AppState>) -> Json<LedgerStatsRes> {
    let stats = state.service.lock().await.ledger_stats();
    Json(LedgerStatsRes {
        total: stats.total,
        conforming: stats.conforming,
        alerts: stats.alerts,
        actions: stats.actions,
    })
}

#[utoipa::path(
    delete,
    path = "/ledger/{id}",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Record deleted", body = DeleteRecordRes),
        (status = 404, description = "Unknown record", body = ErrorRes)
    )
)]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteRecordRes> {
    let id = record_id(&id)?;
    let applied = state.service.lock().await.delete_record(id)?;
    Ok(Json(DeleteRecordRes {
        record: LedgerRecordDto::from(&applied.value),
        save_error: applied.save_error,
    }))
}

#[utoipa::path(
    delete,
    path = "/ledger",
    responses((status = 200, description = "Ledger cleared", body = ClearLedgerRes))
)]
pub async fn clear_ledger(State(state): State<AppState>) -> Json<ClearLedgerRes> {
    let applied = state.service.lock().await.clear_ledger();
    Json(ClearLedgerRes {
        removed: applied.value,
        save_error: applied.save_error,
    })
}
