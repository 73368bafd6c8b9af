use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dto::candidate_dto::{CandidatePatch, CandidateQuery, CreateCandidatePayload};
use crate::dto::job_dto::{CreateJobPayload, JobPatch, JobQuery};
use crate::dto::page::Page;
use crate::error::{Error, Result};
use crate::models::assessment::{Assessment, AssessmentResponse};
use crate::models::candidate::{Candidate, Note, TimelineEvent};
use crate::models::job::Job;
use crate::services::gateway::PersistenceGateway;

/// Latency and failure behaviour of the simulated network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationProfile {
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub read_failure_rate: f64,
    pub write_failure_rate: f64,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            min_latency_ms: 200,
            max_latency_ms: 1200,
            read_failure_rate: 0.05,
            write_failure_rate: 0.10,
        }
    }
}

impl SimulationProfile {
    /// No delay and no injected failures.
    pub fn instant() -> Self {
        Self {
            min_latency_ms: 0,
            max_latency_ms: 0,
            read_failure_rate: 0.0,
            write_failure_rate: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_latency_ms > self.max_latency_ms {
            return Err(Error::Config(format!(
                "min latency {}ms exceeds max latency {}ms",
                self.min_latency_ms, self.max_latency_ms
            )));
        }
        for (name, rate) in [
            ("read failure rate", self.read_failure_rate),
            ("write failure rate", self.write_failure_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(Error::Config(format!(
                    "{} must be within 0..=1, got {}",
                    name, rate
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Read,
    Write,
}

/// Wraps a gateway with random latency and random transient failures.
///
/// Injected failures happen before the inner gateway is called, so a failed
/// write never reaches the store.
pub struct SimulatedGateway<G> {
    inner: G,
    profile: RwLock<SimulationProfile>,
}

impl<G: PersistenceGateway> SimulatedGateway<G> {
    pub fn new(inner: G, profile: SimulationProfile) -> Self {
        Self {
            inner,
            profile: RwLock::new(profile),
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn profile(&self) -> SimulationProfile {
        match self.profile.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set_profile(&self, profile: SimulationProfile) -> Result<()> {
        profile.validate()?;
        match self.profile.write() {
            Ok(mut guard) => *guard = profile,
            Err(poisoned) => *poisoned.into_inner() = profile,
        }
        Ok(())
    }

    async fn simulate(&self, operation: &'static str, kind: CallKind) -> Result<()> {
        let profile = self.profile();
        let (delay_ms, fail) = {
            let mut rng = rand::thread_rng();
            let delay_ms = if profile.max_latency_ms > profile.min_latency_ms {
                rng.gen_range(profile.min_latency_ms..=profile.max_latency_ms)
            } else {
                profile.min_latency_ms
            };
            let rate = match kind {
                CallKind::Read => profile.read_failure_rate,
                CallKind::Write => profile.write_failure_rate,
            };
            (delay_ms, rng.gen_bool(rate.clamp(0.0, 1.0)))
        };

        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        debug!(operation, delay_ms, "simulated network call");

        if fail {
            warn!(operation, "injecting simulated failure");
            return Err(Error::Transient(format!("{} failed, please retry", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl<G: PersistenceGateway> PersistenceGateway for SimulatedGateway<G> {
    async fn fetch_jobs(&self, query: JobQuery) -> Result<Page<Job>> {
        self.simulate("fetch jobs", CallKind::Read).await?;
        self.inner.fetch_jobs(query).await
    }

    async fn create_job(&self, payload: CreateJobPayload) -> Result<Job> {
        self.simulate("create job", CallKind::Write).await?;
        self.inner.create_job(payload).await
    }

    async fn update_job(&self, id: Uuid, patch: JobPatch) -> Result<Job> {
        self.simulate("update job", CallKind::Write).await?;
        self.inner.update_job(id, patch).await
    }

    async fn reorder_jobs(&self, from_order: i64, to_order: i64) -> Result<Vec<Job>> {
        self.simulate("reorder jobs", CallKind::Write).await?;
        self.inner.reorder_jobs(from_order, to_order).await
    }

    async fn fetch_candidates(&self, query: CandidateQuery) -> Result<Page<Candidate>> {
        self.simulate("fetch candidates", CallKind::Read).await?;
        self.inner.fetch_candidates(query).await
    }

    async fn create_candidate(&self, payload: CreateCandidatePayload) -> Result<Candidate> {
        self.simulate("create candidate", CallKind::Write).await?;
        self.inner.create_candidate(payload).await
    }

    async fn update_candidate(&self, id: Uuid, patch: CandidatePatch) -> Result<Candidate> {
        self.simulate("update candidate", CallKind::Write).await?;
        self.inner.update_candidate(id, patch).await
    }

    async fn add_note(&self, candidate_id: Uuid, note: Note) -> Result<Candidate> {
        self.simulate("add note", CallKind::Write).await?;
        self.inner.add_note(candidate_id, note).await
    }

    async fn candidate_timeline(&self, candidate_id: Uuid) -> Result<Vec<TimelineEvent>> {
        self.simulate("fetch timeline", CallKind::Read).await?;
        self.inner.candidate_timeline(candidate_id).await
    }

    async fn get_assessment(&self, job_id: Uuid) -> Result<Assessment> {
        self.simulate("fetch assessment", CallKind::Read).await?;
        self.inner.get_assessment(job_id).await
    }

    async fn save_assessment(&self, assessment: Assessment) -> Result<Assessment> {
        self.simulate("save assessment", CallKind::Write).await?;
        self.inner.save_assessment(assessment).await
    }

    async fn submit_response(&self, response: AssessmentResponse) -> Result<AssessmentResponse> {
        self.simulate("submit assessment", CallKind::Write).await?;
        self.inner.submit_response(response).await
    }
}
