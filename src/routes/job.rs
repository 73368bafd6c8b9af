use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{CreateJobPayload, JobListQuery, JobPatch, JobQuery, ReorderPayload},
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let page = state.jobs.query(&JobQuery {
        filters: query.filters(),
        page: query.page,
        page_size: query.page_size,
    });
    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.jobs.create(payload).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[axum::debug_handler]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JobPatch>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.jobs.update(id, payload).await?;
    Ok(Json(job))
}

/// Returns the full ordered collection after the move.
#[axum::debug_handler]
pub async fn reorder_jobs(
    State(state): State<AppState>,
    Json(payload): Json<ReorderPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .jobs
        .reorder(payload.from_order, payload.to_order)
        .await?;
    Ok(Json(state.jobs.snapshot().jobs))
}

#[axum::debug_handler]
pub async fn archive_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.jobs.archive(id).await?;
    Ok(Json(job))
}

#[axum::debug_handler]
pub async fn activate_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.jobs.activate(id).await?;
    Ok(Json(job))
}
