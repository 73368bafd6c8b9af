use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::assessment_dto::{SaveAssessmentPayload, SubmitAssessmentPayload},
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn get_assessment(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let assessment = state.assessments.get(job_id).await?;
    Ok(Json(assessment))
}

#[axum::debug_handler]
pub async fn save_assessment(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(payload): Json<SaveAssessmentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let assessment = state.assessments.save(job_id, payload).await?;
    Ok(Json(assessment))
}

#[axum::debug_handler]
pub async fn submit_assessment(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(payload): Json<SubmitAssessmentPayload>,
) -> Result<impl IntoResponse> {
    let response = state.assessments.submit(job_id, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
