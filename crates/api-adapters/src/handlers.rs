//! # Handlers
//!
//! Thin glue between axum extractors and [`services::PollService`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use domains::{Ballot, DomainError, NewPoll};

use crate::dto::{CreatedResponse, HealthStatus, PollListResponse, VoteAccepted};
use crate::error::{ApiError, VoteError};
use crate::state::AppState;

const OPENMETRICS: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// `POST /polls`. Re-creating an existing id is a no-op that still reports success.
pub async fn create_poll(
    State(state): State<AppState>,
    payload: Result<Json<NewPoll>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(request) = payload?;
    let id = request.id.clone();

    if state.service.create_poll(request).await? {
        state.metrics.poll_created();
    }

    Ok((StatusCode::CREATED, Json(CreatedResponse { ok: true, id })))
}

pub async fn list_polls(State(state): State<AppState>) -> Result<Json<PollListResponse>, ApiError> {
    let polls = state.service.list_polls().await?;
    Ok(Json(PollListResponse { polls }))
}

pub async fn get_poll(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.service.get_poll(&id).await?;
    Ok(Json(snapshot))
}

/// `POST /polls/{id}`
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Ballot>, JsonRejection>,
) -> Result<Json<VoteAccepted>, VoteError> {
    let Json(ballot) = payload.inspect_err(|_| state.metrics.vote("invalid_payload"))?;

    match state.service.cast_vote(&id, ballot).await {
        Ok(snapshot) => {
            state.metrics.vote("accepted");
            Ok(Json(VoteAccepted::new(snapshot)))
        }
        Err(err) => {
            state.metrics.vote(outcome_label(&err));
            Err(err.into())
        }
    }
}

pub async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .render()
        .map_err(|err| DomainError::Storage(err.to_string()))?;
    Ok(([(header::CONTENT_TYPE, OPENMETRICS)], body))
}

fn outcome_label(err: &DomainError) -> &'static str {
    match err {
        DomainError::InvalidPayload(_) => "invalid_payload",
        DomainError::NotFound(_) => "not_found",
        DomainError::Conflict(_) => "conflict",
        DomainError::InvalidOption(_) => "invalid_option",
        DomainError::Storage(_) | DomainError::Network(_) => "error",
    }
}
