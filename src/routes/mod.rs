pub mod assessment;
pub mod candidate_routes;
pub mod health;
pub mod job;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/api/jobs", get(job::list_jobs).post(job::create_job))
        .route("/api/jobs/reorder", patch(job::reorder_jobs))
        .route("/api/jobs/:id", patch(job::update_job))
        .route("/api/jobs/:id/archive", post(job::archive_job))
        .route("/api/jobs/:id/activate", post(job::activate_job))
        .route(
            "/api/candidates",
            get(candidate_routes::list_candidates).post(candidate_routes::create_candidate),
        )
        .route(
            "/api/candidates/:id",
            patch(candidate_routes::update_candidate),
        )
        .route(
            "/api/candidates/:id/stage",
            patch(candidate_routes::move_candidate_stage),
        )
        .route(
            "/api/candidates/:id/notes",
            post(candidate_routes::add_candidate_note),
        )
        .route(
            "/api/candidates/:id/timeline",
            get(candidate_routes::candidate_timeline),
        )
        .route("/api/pipeline", get(candidate_routes::pipeline_board))
        .route(
            "/api/assessments/:job_id",
            get(assessment::get_assessment).put(assessment::save_assessment),
        )
        .route(
            "/api/assessments/:job_id/submit",
            post(assessment::submit_assessment),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
