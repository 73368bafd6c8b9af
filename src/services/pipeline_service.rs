use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::dto::candidate_dto::{
    AddNotePayload, CandidatePatch, CandidateQuery, CreateCandidatePayload, StageColumn,
};
use crate::dto::page::{paginate, Page};
use crate::error::{Error, Result};
use crate::models::candidate::{extract_mentions, Candidate, Note, Stage, TimelineEvent};
use crate::services::gateway::PersistenceGateway;
use crate::services::optimistic::{Compensation, ErrorSlot, Prepared, StateStore};

/// Published state of the candidate pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateBoard {
    pub candidates: Vec<Candidate>,
    pub total: i64,
    pub loading: bool,
    pub error: Option<String>,
}

impl CandidateBoard {
    pub fn find(&self, id: Uuid) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    fn find_mut(&mut self, id: Uuid) -> Option<&mut Candidate> {
        self.candidates.iter_mut().find(|c| c.id == id)
    }

    fn insert(&mut self, candidate: &Candidate) {
        match self.find_mut(candidate.id) {
            Some(existing) => *existing = candidate.clone(),
            None => {
                self.candidates.push(candidate.clone());
                self.total += 1;
            }
        }
    }

    /// Swaps in the authoritative record. A candidate that has left the
    /// collection in the meantime is not brought back.
    fn replace(&mut self, candidate: &Candidate) {
        if let Some(existing) = self.find_mut(candidate.id) {
            *existing = candidate.clone();
        }
    }

    /// Filtered, paged projection of the collection.
    pub fn project(&self, query: &CandidateQuery) -> Page<Candidate> {
        let visible = self
            .candidates
            .iter()
            .filter(|candidate| query.matches(candidate))
            .cloned()
            .collect();
        paginate(visible, query.page, query.page_size)
    }
}

impl ErrorSlot for CandidateBoard {
    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

/// Moves candidates between pipeline stages with optimistic updates.
#[derive(Clone)]
pub struct PipelineController {
    gateway: Arc<dyn PersistenceGateway>,
    store: StateStore<CandidateBoard>,
}

impl PipelineController {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            gateway,
            store: StateStore::new(CandidateBoard::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CandidateBoard> {
        self.store.subscribe()
    }

    pub fn snapshot(&self) -> CandidateBoard {
        self.store.snapshot()
    }

    pub fn candidate(&self, id: Uuid) -> Option<Candidate> {
        self.store.read(|board| board.find(id).cloned())
    }

    pub fn clear_error(&self) {
        self.store.clear_error();
    }

    /// Moves a candidate to `target`.
    ///
    /// Returns `Ok(None)` when the candidate already sits in `target`; no
    /// request is made in that case. The stage graph is fully connected,
    /// `Hired` and `Rejected` included.
    #[instrument(skip(self))]
    pub async fn move_candidate(&self, candidate_id: Uuid, target: Stage) -> Result<Option<Candidate>> {
        let gateway = Arc::clone(&self.gateway);
        let moved = self
            .store
            .run_optimistic(
                |board| {
                    let candidate = board.find_mut(candidate_id).ok_or_else(|| {
                        Error::NotFound(format!("Candidate {} not found", candidate_id))
                    })?;
                    if candidate.stage == target {
                        return Ok(Prepared::Unchanged);
                    }
                    let previous = candidate.stage;
                    candidate.stage = target;
                    Ok(Prepared::Applied(Compensation::new(
                        move |board: &mut CandidateBoard| {
                            if let Some(candidate) = board.find_mut(candidate_id) {
                                candidate.stage = previous;
                            }
                        },
                    )))
                },
                move || async move {
                    gateway
                        .update_candidate(candidate_id, CandidatePatch::stage(target))
                        .await
                },
                |board, updated: &Candidate| board.replace(updated),
            )
            .await?;

        if let Some(candidate) = &moved {
            info!(candidate_id = %candidate.id, stage = %candidate.stage, "candidate moved");
        }
        Ok(moved)
    }

    /// Applies a partial profile update optimistically. The previous record
    /// comes back if the store rejects the change.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, candidate_id: Uuid, patch: CandidatePatch) -> Result<Candidate> {
        patch.validate()?;
        let gateway = Arc::clone(&self.gateway);
        let local_patch = patch.clone();
        let updated = self
            .store
            .run_optimistic(
                |board| {
                    let candidate = board.find_mut(candidate_id).ok_or_else(|| {
                        Error::NotFound(format!("Candidate {} not found", candidate_id))
                    })?;
                    let previous = candidate.clone();
                    local_patch.apply_to(candidate);
                    Ok(Prepared::Applied(Compensation::new(
                        move |board: &mut CandidateBoard| {
                            if let Some(candidate) = board.find_mut(candidate_id) {
                                *candidate = previous;
                            }
                        },
                    )))
                },
                move || async move { gateway.update_candidate(candidate_id, patch).await },
                |board, candidate: &Candidate| board.replace(candidate),
            )
            .await?;

        updated.ok_or_else(|| {
            Error::Internal(format!("Update of candidate {} was skipped", candidate_id))
        })
    }

    /// Projection for a one-off query over the local collection.
    pub fn query(&self, query: &CandidateQuery) -> Page<Candidate> {
        self.store.read(|board| board.project(query))
    }

    /// Fetches every candidate into the local collection.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<Candidate>> {
        self.store.update(|board| board.loading = true);
        match self.gateway.fetch_candidates(CandidateQuery::default()).await {
            Ok(page) => {
                self.store.update(|board| {
                    board.candidates = page.items.clone();
                    board.total = page.total;
                    board.loading = false;
                });
                Ok(page.items)
            }
            Err(e) => {
                error!(error = ?e, "Failed to load candidates");
                let message = e.to_string();
                self.store.update(|board| {
                    board.loading = false;
                    board.error = Some(message);
                });
                Err(e)
            }
        }
    }

    #[instrument(skip(self, payload))]
    pub async fn apply(&self, payload: CreateCandidatePayload) -> Result<Candidate> {
        payload.validate()?;
        match self.gateway.create_candidate(payload).await {
            Ok(candidate) => {
                self.store.update(|board| board.insert(&candidate));
                info!(candidate_id = %candidate.id, "application received");
                Ok(candidate)
            }
            Err(e) => {
                self.store.record_failure(&e);
                Err(e)
            }
        }
    }

    #[instrument(skip(self, payload))]
    pub async fn add_note(&self, candidate_id: Uuid, payload: AddNotePayload) -> Result<Candidate> {
        payload.validate()?;
        let mentions = payload
            .mentions
            .unwrap_or_else(|| extract_mentions(&payload.content));
        let note = Note {
            id: Uuid::new_v4(),
            author: payload.author,
            content: payload.content,
            mentions,
            created_at: Utc::now(),
        };

        match self.gateway.add_note(candidate_id, note).await {
            Ok(candidate) => {
                self.store.update(|board| {
                    if let Some(existing) = board.find_mut(candidate.id) {
                        *existing = candidate.clone();
                    }
                });
                Ok(candidate)
            }
            Err(e) => {
                self.store.record_failure(&e);
                Err(e)
            }
        }
    }

    pub async fn timeline(&self, candidate_id: Uuid) -> Result<Vec<TimelineEvent>> {
        self.gateway.candidate_timeline(candidate_id).await
    }

    /// Kanban columns in stage order, each keeping the local collection order.
    pub fn by_stage(&self) -> Vec<StageColumn> {
        self.store.read(|board| {
            Stage::ALL
                .into_iter()
                .map(|stage| StageColumn {
                    stage,
                    candidates: board
                        .candidates
                        .iter()
                        .filter(|c| c.stage == stage)
                        .cloned()
                        .collect(),
                })
                .collect()
        })
    }
}
