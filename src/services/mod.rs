pub mod assessment_service;
pub mod gateway;
pub mod jobs_service;
pub mod optimistic;
pub mod ordering;
pub mod pipeline_service;
pub mod record_store;
pub mod simulator;
