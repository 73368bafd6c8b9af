use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::candidate_dto::{
        AddNotePayload, CandidatePatch, CandidateQuery, CreateCandidatePayload,
        MoveStagePayload, MoveStageResponse,
    },
    error::{Error, Result},
    AppState,
};

#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<CandidateQuery>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.pipeline.query(&query)))
}

#[axum::debug_handler]
pub async fn create_candidate(
    State(state): State<AppState>,
    Json(payload): Json<CreateCandidatePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate = state.pipeline.apply(payload).await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

#[axum::debug_handler]
pub async fn update_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<CandidatePatch>,
) -> Result<impl IntoResponse> {
    let candidate = state.pipeline.update(id, patch).await?;
    Ok(Json(candidate))
}

#[axum::debug_handler]
pub async fn move_candidate_stage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MoveStagePayload>,
) -> Result<impl IntoResponse> {
    let response = match state.pipeline.move_candidate(id, payload.stage).await? {
        Some(candidate) => MoveStageResponse {
            changed: true,
            candidate,
        },
        None => MoveStageResponse {
            changed: false,
            candidate: state
                .pipeline
                .candidate(id)
                .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))?,
        },
    };
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn add_candidate_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddNotePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate = state.pipeline.add_note(id, payload).await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

#[axum::debug_handler]
pub async fn candidate_timeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let events = state.pipeline.timeline(id).await?;
    Ok(Json(events))
}

/// Kanban columns over the locally loaded candidates.
#[axum::debug_handler]
pub async fn pipeline_board(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.pipeline.by_stage()))
}
