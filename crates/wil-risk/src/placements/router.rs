use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{PlacementId, PlacementSnapshot};
use super::governance::{GovernanceError, GovernanceStore, TransitionContext};
use super::roster::{CsvRosterProvider, InlineRoster};
use super::service::{PlacementReviewService, ReviewServiceError};

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub placements: Vec<PlacementSnapshot>,
    #[serde(default)]
    pub roster_csv: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConsentRequest {
    pub consented: bool,
    pub actor: String,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct OptOutRequest {
    pub opted_out: bool,
    #[serde(default)]
    pub reason: Option<String>,
    pub actor: String,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AppealRequest {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
    pub actor: String,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

fn context(actor: String, expected_version: Option<u64>) -> TransitionContext {
    let ctx = TransitionContext::new(actor);
    match expected_version {
        Some(version) => ctx.expecting(version),
        None => ctx,
    }
}

/// Router builder exposing the staff review and governance endpoints.
pub fn placement_router<S>(service: Arc<PlacementReviewService<S>>) -> Router
where
    S: GovernanceStore + 'static,
{
    Router::new()
        .route("/api/v1/placements/review", post(review_handler::<S>))
        .route(
            "/api/v1/placements/:placement_id/governance",
            get(governance_handler::<S>),
        )
        .route(
            "/api/v1/placements/:placement_id/governance/consent",
            put(consent_handler::<S>),
        )
        .route(
            "/api/v1/placements/:placement_id/governance/opt-out",
            put(opt_out_handler::<S>),
        )
        .route(
            "/api/v1/placements/:placement_id/governance/appeal",
            put(appeal_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn review_handler<S>(
    State(service): State<Arc<PlacementReviewService<S>>>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    S: GovernanceStore + 'static,
{
    let result = match request.roster_csv {
        Some(csv) => service.review(&CsvRosterProvider::from_string(csv)),
        None => service.review(&InlineRoster(request.placements)),
    };

    match result {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(ReviewServiceError::Roster(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(ReviewServiceError::Governance(error)) => governance_error_response(error),
    }
}

pub(crate) async fn governance_handler<S>(
    State(service): State<Arc<PlacementReviewService<S>>>,
    Path(placement_id): Path<String>,
) -> Response
where
    S: GovernanceStore + 'static,
{
    match service.gate().record(&PlacementId(placement_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => governance_error_response(error),
    }
}

pub(crate) async fn consent_handler<S>(
    State(service): State<Arc<PlacementReviewService<S>>>,
    Path(placement_id): Path<String>,
    axum::Json(request): axum::Json<ConsentRequest>,
) -> Response
where
    S: GovernanceStore + 'static,
{
    let ctx = context(request.actor, request.expected_version);
    match service
        .gate()
        .set_consent(&PlacementId(placement_id), request.consented, &ctx)
    {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => governance_error_response(error),
    }
}

pub(crate) async fn opt_out_handler<S>(
    State(service): State<Arc<PlacementReviewService<S>>>,
    Path(placement_id): Path<String>,
    axum::Json(request): axum::Json<OptOutRequest>,
) -> Response
where
    S: GovernanceStore + 'static,
{
    let ctx = context(request.actor, request.expected_version);
    match service.gate().set_opt_out(
        &PlacementId(placement_id),
        request.opted_out,
        request.reason.as_deref(),
        &ctx,
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => governance_error_response(error),
    }
}

pub(crate) async fn appeal_handler<S>(
    State(service): State<Arc<PlacementReviewService<S>>>,
    Path(placement_id): Path<String>,
    axum::Json(request): axum::Json<AppealRequest>,
) -> Response
where
    S: GovernanceStore + 'static,
{
    let ctx = context(request.actor, request.expected_version);
    match service.gate().apply_appeal_input(
        &PlacementId(placement_id),
        &request.status,
        request.note.as_deref(),
        &ctx,
    ) {
        Ok(outcome) => {
            let payload = json!({
                "applied": outcome.applied(),
                "record": outcome.record(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => governance_error_response(error),
    }
}

fn governance_error_response(error: GovernanceError) -> Response {
    let status = match error {
        GovernanceError::Conflict { .. } => StatusCode::CONFLICT,
        GovernanceError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
