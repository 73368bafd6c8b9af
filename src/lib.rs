pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use crate::services::{
    assessment_service::AssessmentService, gateway::PersistenceGateway,
    jobs_service::JobBoardController, pipeline_service::PipelineController,
};

/// Controllers shared by every handler. All of them talk to the same
/// gateway.
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobBoardController,
    pub pipeline: PipelineController,
    pub assessments: AssessmentService,
}

impl AppState {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, default_page_size: i64) -> Self {
        let jobs = JobBoardController::new(Arc::clone(&gateway), default_page_size);
        let pipeline = PipelineController::new(Arc::clone(&gateway));
        let assessments = AssessmentService::new(gateway);

        Self {
            jobs,
            pipeline,
            assessments,
        }
    }
}
