use async_trait::async_trait;
use uuid::Uuid;

use crate::dto::candidate_dto::{CandidatePatch, CandidateQuery, CreateCandidatePayload};
use crate::dto::job_dto::{CreateJobPayload, JobPatch, JobQuery};
use crate::dto::page::Page;
use crate::error::Result;
use crate::models::assessment::{Assessment, AssessmentResponse};
use crate::models::candidate::{Candidate, Note, TimelineEvent};
use crate::models::job::Job;

/// Authoritative record store behind the controllers.
///
/// Every call is asynchronous and may fail; callers must not assume it is
/// fast or that it succeeds.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn fetch_jobs(&self, query: JobQuery) -> Result<Page<Job>>;

    async fn create_job(&self, payload: CreateJobPayload) -> Result<Job>;

    async fn update_job(&self, id: Uuid, patch: JobPatch) -> Result<Job>;

    /// Moves the job at `from_order` to `to_order` and returns the full
    /// collection in its new order.
    async fn reorder_jobs(&self, from_order: i64, to_order: i64) -> Result<Vec<Job>>;

    async fn fetch_candidates(&self, query: CandidateQuery) -> Result<Page<Candidate>>;

    async fn create_candidate(&self, payload: CreateCandidatePayload) -> Result<Candidate>;

    async fn update_candidate(&self, id: Uuid, patch: CandidatePatch) -> Result<Candidate>;

    async fn add_note(&self, candidate_id: Uuid, note: Note) -> Result<Candidate>;

    async fn candidate_timeline(&self, candidate_id: Uuid) -> Result<Vec<TimelineEvent>>;

    async fn get_assessment(&self, job_id: Uuid) -> Result<Assessment>;

    /// Inserts or replaces the assessment attached to `assessment.job_id`.
    async fn save_assessment(&self, assessment: Assessment) -> Result<Assessment>;

    async fn submit_response(&self, response: AssessmentResponse) -> Result<AssessmentResponse>;
}
