use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::dto::job_dto::{CreateJobPayload, JobFilters, JobPatch, JobQuery};
use crate::dto::page::{paginate, Page};
use crate::error::{Error, Result};
use crate::models::job::{Job, JobStatus};
use crate::services::gateway::PersistenceGateway;
use crate::services::optimistic::{Compensation, ErrorSlot, Prepared, StateStore};
use crate::services::ordering;

/// Published state of the job board.
///
/// `jobs` is always the full collection sorted by `order`. Filters and
/// paging only shape [`JobBoardController::view`].
#[derive(Debug, Clone, PartialEq)]
pub struct JobBoard {
    pub jobs: Vec<Job>,
    pub filters: JobFilters,
    pub page: i64,
    pub page_size: i64,
    pub loading: bool,
    pub error: Option<String>,
}

impl JobBoard {
    pub fn new(page_size: i64) -> Self {
        Self {
            jobs: Vec::new(),
            filters: JobFilters::default(),
            page: 1,
            page_size,
            loading: false,
            error: None,
        }
    }

    pub fn find(&self, id: Uuid) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    fn find_mut(&mut self, id: Uuid) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    fn upsert(&mut self, job: &Job) {
        match self.find_mut(job.id) {
            Some(existing) => *existing = job.clone(),
            None => self.jobs.push(job.clone()),
        }
        self.jobs.sort_by_key(|j| j.order);
    }

    pub fn view(&self) -> Page<Job> {
        self.project(&self.filters, Some(self.page), Some(self.page_size))
    }

    /// Filtered, paged projection of the ordered collection.
    pub fn project(&self, filters: &JobFilters, page: Option<i64>, page_size: Option<i64>) -> Page<Job> {
        let visible = self
            .jobs
            .iter()
            .filter(|job| filters.matches(job))
            .cloned()
            .collect();
        paginate(visible, page, page_size)
    }
}

impl ErrorSlot for JobBoard {
    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

#[derive(Clone)]
pub struct JobBoardController {
    gateway: Arc<dyn PersistenceGateway>,
    store: StateStore<JobBoard>,
}

impl JobBoardController {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, page_size: i64) -> Self {
        Self {
            gateway,
            store: StateStore::new(JobBoard::new(page_size)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<JobBoard> {
        self.store.subscribe()
    }

    pub fn snapshot(&self) -> JobBoard {
        self.store.snapshot()
    }

    pub fn clear_error(&self) {
        self.store.clear_error();
    }

    pub fn view(&self) -> Page<Job> {
        self.store.read(JobBoard::view)
    }

    /// Projection for a one-off query; the board's own filters and page are
    /// left alone. Falls back to the board's page size.
    pub fn query(&self, query: &JobQuery) -> Page<Job> {
        self.store.read(|board| {
            let page_size = query.page_size.or(Some(board.page_size));
            board.project(&query.filters, query.page, page_size)
        })
    }

    /// Replaces the filters and goes back to the first page.
    pub fn set_filters(&self, filters: JobFilters) {
        self.store.update(|board| {
            board.filters = filters;
            board.page = 1;
        });
    }

    pub fn set_page(&self, page: i64, page_size: Option<i64>) {
        self.store.update(|board| {
            board.page = page.max(1);
            if let Some(size) = page_size {
                board.page_size = size.max(1);
            }
        });
    }

    /// Fetches the full ordered collection.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<Job>> {
        self.store.update(|board| board.loading = true);
        match self.gateway.fetch_jobs(JobQuery::all()).await {
            Ok(page) => {
                self.store.update(|board| {
                    board.jobs = page.items.clone();
                    board.loading = false;
                });
                Ok(page.items)
            }
            Err(e) => {
                error!(error = ?e, "Failed to load jobs");
                let message = e.to_string();
                self.store.update(|board| {
                    board.loading = false;
                    board.error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Moves the job at `from_order` to `to_order`.
    ///
    /// The local collection is reordered before the request is sent and is
    /// restored wholesale if the request fails. Returns `Ok(None)` for a
    /// move onto the same position.
    #[instrument(skip(self))]
    pub async fn reorder(&self, from_order: i64, to_order: i64) -> Result<Option<Vec<Job>>> {
        let gateway = Arc::clone(&self.gateway);
        let reordered = self
            .store
            .run_optimistic(
                |board| {
                    let snapshot = board.jobs.clone();
                    if !ordering::move_by_order(&mut board.jobs, from_order, to_order)? {
                        return Ok(Prepared::Unchanged);
                    }
                    Ok(Prepared::Applied(Compensation::new(
                        move |board: &mut JobBoard| board.jobs = snapshot,
                    )))
                },
                move || async move { gateway.reorder_jobs(from_order, to_order).await },
                |board, authoritative: &Vec<Job>| board.jobs = authoritative.clone(),
            )
            .await?;

        if reordered.is_some() {
            info!(from_order, to_order, "job board reordered");
        }
        Ok(reordered)
    }

    #[instrument(skip(self, payload))]
    pub async fn create(&self, payload: CreateJobPayload) -> Result<Job> {
        payload.validate()?;
        match self.gateway.create_job(payload).await {
            Ok(job) => {
                self.store.update(|board| board.upsert(&job));
                Ok(job)
            }
            Err(e) => {
                self.store.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Applies `patch` locally, then persists it. A rejected patch (for
    /// example a slug conflict) puts the previous job back.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: JobPatch) -> Result<Job> {
        patch.validate()?;
        let gateway = Arc::clone(&self.gateway);
        let local_patch = patch.clone();
        let updated = self
            .store
            .run_optimistic(
                |board| {
                    let job = board
                        .find_mut(id)
                        .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))?;
                    let previous = job.clone();
                    local_patch.apply_to(job);
                    Ok(Prepared::Applied(Compensation::new(
                        move |board: &mut JobBoard| {
                            if let Some(job) = board.find_mut(id) {
                                *job = previous;
                            }
                        },
                    )))
                },
                move || async move { gateway.update_job(id, patch).await },
                |board, job: &Job| board.upsert(job),
            )
            .await?;

        updated.ok_or_else(|| Error::Internal(format!("Update of job {} was skipped", id)))
    }

    pub async fn archive(&self, id: Uuid) -> Result<Job> {
        self.update(id, JobPatch::status(JobStatus::Archived)).await
    }

    pub async fn activate(&self, id: Uuid) -> Result<Job> {
        self.update(id, JobPatch::status(JobStatus::Active)).await
    }
}
