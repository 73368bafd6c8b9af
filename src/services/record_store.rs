use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::dto::candidate_dto::{CandidatePatch, CandidateQuery, CreateCandidatePayload};
use crate::dto::job_dto::{CreateJobPayload, JobPatch, JobQuery};
use crate::dto::page::{paginate, Page, MAX_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::models::assessment::{Assessment, AssessmentResponse, Section};
use crate::models::candidate::{Candidate, Note, Stage, TimelineEvent, TimelineEventKind};
use crate::models::job::Job;
use crate::services::gateway::PersistenceGateway;
use crate::services::ordering;

const JOB_COLUMNS: &str =
    "id, title, slug, description, location, salary, status, tags, sort_order, created_at, updated_at";

const CANDIDATE_COLUMNS: &str = "id, job_id, name, email, phone, location, experience, skills, resume, cover_letter, stage, notes, applied_at";

#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    title: String,
    slug: String,
    description: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    status: String,
    tags: Json<Vec<String>>,
    sort_order: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = Error;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(Job {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            location: row.location,
            salary: row.salary,
            status: row
                .status
                .parse()
                .map_err(|_| Error::Internal(format!("Job {} has invalid status {}", row.id, row.status)))?,
            tags: row.tags.0,
            order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CandidateRow {
    id: Uuid,
    job_id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    location: Option<String>,
    experience: Option<String>,
    skills: Json<Vec<String>>,
    resume: Option<String>,
    cover_letter: Option<String>,
    stage: String,
    notes: Json<Vec<Note>>,
    applied_at: DateTime<Utc>,
}

impl TryFrom<CandidateRow> for Candidate {
    type Error = Error;

    fn try_from(row: CandidateRow) -> Result<Self> {
        let stage: Stage = row.stage.parse().map_err(|_| {
            Error::Internal(format!("Candidate {} has invalid stage {}", row.id, row.stage))
        })?;
        Ok(Candidate {
            id: row.id,
            job_id: row.job_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            location: row.location,
            experience: row.experience,
            skills: row.skills.0,
            resume: row.resume,
            cover_letter: row.cover_letter,
            stage,
            notes: row.notes.0,
            applied_at: row.applied_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    kind: String,
    stage: Option<String>,
    description: String,
    author: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for TimelineEvent {
    type Error = Error;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(TimelineEvent {
            kind: row.kind.parse()?,
            stage: row.stage.as_deref().map(str::parse).transpose()?,
            description: row.description,
            author: row.author,
            at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AssessmentRow {
    id: Uuid,
    job_id: Uuid,
    title: String,
    description: String,
    sections: Json<Vec<Section>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AssessmentRow> for Assessment {
    fn from(row: AssessmentRow) -> Self {
        Assessment {
            id: row.id,
            job_id: row.job_id,
            title: row.title,
            description: row.description,
            sections: row.sections.0,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

/// Local transactional record store on SQLite. Every mutation runs in its
/// own transaction.
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_job(conn: &mut SqliteConnection, id: Uuid) -> Result<Job> {
        let row = sqlx::query_as::<_, JobRow>(&format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))?;
        Job::try_from(row)
    }

    async fn load_ordered_jobs(conn: &mut SqliteConnection) -> Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM jobs ORDER BY sort_order ASC",
            JOB_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    async fn load_candidate(conn: &mut SqliteConnection, id: Uuid) -> Result<Candidate> {
        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {} FROM candidates WHERE id = ?",
            CANDIDATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))?;
        Candidate::try_from(row)
    }

    async fn ensure_slug_free(conn: &mut SqliteConnection, slug: &str, except: Option<Uuid>) -> Result<()> {
        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM jobs WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await?;
        match existing {
            Some(id) if Some(id) != except => Err(Error::Conflict(
                "Job with this slug already exists".to_string(),
            )),
            _ => Ok(()),
        }
    }

    async fn record_event(
        conn: &mut SqliteConnection,
        candidate_id: Uuid,
        kind: TimelineEventKind,
        stage: Option<Stage>,
        description: &str,
        author: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO candidate_events (candidate_id, kind, stage, description, author, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(candidate_id)
        .bind(kind.as_str())
        .bind(stage.map(|s| s.as_str()))
        .bind(description)
        .bind(author)
        .bind(at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    fn push_candidate_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &CandidateQuery) {
        qb.push(" WHERE 1 = 1");
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            qb.push(" AND (lower(name) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR lower(email) LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(stage) = query.stage {
            qb.push(" AND stage = ").push_bind(stage.as_str());
        }
        if let Some(job_id) = query.job_id {
            qb.push(" AND job_id = ").push_bind(job_id);
        }
    }
}

#[async_trait]
impl PersistenceGateway for RecordStore {
    async fn fetch_jobs(&self, query: JobQuery) -> Result<Page<Job>> {
        let mut conn = self.pool.acquire().await?;
        let jobs = Self::load_ordered_jobs(&mut conn).await?;
        let visible: Vec<Job> = jobs
            .into_iter()
            .filter(|job| query.filters.matches(job))
            .collect();
        Ok(paginate(visible, query.page, query.page_size))
    }

    async fn create_job(&self, payload: CreateJobPayload) -> Result<Job> {
        payload.validate()?;
        let slug = payload.resolved_slug();
        if slug.is_empty() {
            return Err(Error::BadRequest(
                "A slug cannot be derived from this title".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        Self::ensure_slug_free(&mut tx, &slug, None).await?;
        let max_order: Option<i64> = sqlx::query_scalar("SELECT MAX(sort_order) FROM jobs")
            .fetch_one(&mut *tx)
            .await?;

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            title: payload.title,
            slug,
            description: payload.description,
            location: payload.location,
            salary: payload.salary,
            status: payload.status.unwrap_or(crate::models::job::JobStatus::Active),
            tags: payload.tags,
            order: max_order.unwrap_or(0) + 1,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(&format!(
            "INSERT INTO jobs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            JOB_COLUMNS
        ))
        .bind(job.id)
        .bind(&job.title)
        .bind(&job.slug)
        .bind(job.description.as_deref())
        .bind(job.location.as_deref())
        .bind(job.salary.as_deref())
        .bind(job.status.as_str())
        .bind(Json(&job.tags))
        .bind(job.order)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(job_id = %job.id, order = job.order, "job created");
        Ok(job)
    }

    async fn update_job(&self, id: Uuid, patch: JobPatch) -> Result<Job> {
        patch.validate()?;
        let mut tx = self.pool.begin().await?;
        let mut job = Self::load_job(&mut tx, id).await?;

        if let Some(slug) = patch.slug.as_deref() {
            if slug != job.slug {
                Self::ensure_slug_free(&mut tx, slug, Some(id)).await?;
            }
        }
        patch.apply_to(&mut job);
        job.updated_at = Utc::now();

        sqlx::query(
            "UPDATE jobs SET title = ?, slug = ?, description = ?, location = ?, salary = ?, status = ?, tags = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&job.title)
        .bind(&job.slug)
        .bind(job.description.as_deref())
        .bind(job.location.as_deref())
        .bind(job.salary.as_deref())
        .bind(job.status.as_str())
        .bind(Json(&job.tags))
        .bind(job.updated_at)
        .bind(job.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(job)
    }

    async fn reorder_jobs(&self, from_order: i64, to_order: i64) -> Result<Vec<Job>> {
        let mut tx = self.pool.begin().await?;
        let mut jobs = Self::load_ordered_jobs(&mut tx).await?;
        let previous: HashMap<Uuid, i64> = jobs.iter().map(|j| (j.id, j.order)).collect();

        if !ordering::move_by_order(&mut jobs, from_order, to_order)? {
            return Ok(jobs);
        }

        let now = Utc::now();
        for job in jobs.iter_mut() {
            if previous.get(&job.id) == Some(&job.order) {
                continue;
            }
            job.updated_at = now;
            sqlx::query("UPDATE jobs SET sort_order = ?, updated_at = ? WHERE id = ?")
                .bind(job.order)
                .bind(job.updated_at)
                .bind(job.id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(from_order, to_order, "jobs reordered");
        Ok(jobs)
    }

    async fn fetch_candidates(&self, query: CandidateQuery) -> Result<Page<Candidate>> {
        let page = query.page.unwrap_or(1).max(1);

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM candidates");
        Self::push_candidate_filters(&mut count, &query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM candidates", CANDIDATE_COLUMNS));
        Self::push_candidate_filters(&mut select, &query);
        select.push(" ORDER BY applied_at ASC, rowid ASC");
        let page_size = match query.page_size {
            Some(size) => {
                let size = size.clamp(1, MAX_PAGE_SIZE);
                select
                    .push(" LIMIT ")
                    .push_bind(size)
                    .push(" OFFSET ")
                    .push_bind((page - 1).saturating_mul(size));
                size
            }
            None => total.max(1),
        };

        let rows: Vec<CandidateRow> = select.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(Candidate::try_from)
            .collect::<Result<Vec<_>>>()?;
        let total_pages = ((total as f64) / (page_size as f64)).ceil() as i64;

        Ok(Page {
            items,
            total,
            page,
            page_size,
            total_pages,
        })
    }

    async fn create_candidate(&self, payload: CreateCandidatePayload) -> Result<Candidate> {
        payload.validate()?;
        let mut tx = self.pool.begin().await?;
        Self::load_job(&mut tx, payload.job_id).await?;

        let duplicate: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM candidates WHERE job_id = ? AND lower(email) = lower(?)")
                .bind(payload.job_id)
                .bind(&payload.email)
                .fetch_optional(&mut *tx)
                .await?;
        if duplicate.is_some() {
            return Err(Error::Conflict(
                "This email has already applied to this job".to_string(),
            ));
        }

        let candidate = Candidate {
            id: Uuid::new_v4(),
            job_id: payload.job_id,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            location: payload.location,
            experience: payload.experience,
            skills: payload.skills,
            resume: payload.resume,
            cover_letter: payload.cover_letter,
            stage: Stage::Applied,
            notes: Vec::new(),
            applied_at: Utc::now(),
        };

        sqlx::query(&format!(
            "INSERT INTO candidates ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            CANDIDATE_COLUMNS
        ))
        .bind(candidate.id)
        .bind(candidate.job_id)
        .bind(&candidate.name)
        .bind(&candidate.email)
        .bind(candidate.phone.as_deref())
        .bind(candidate.location.as_deref())
        .bind(candidate.experience.as_deref())
        .bind(Json(&candidate.skills))
        .bind(candidate.resume.as_deref())
        .bind(candidate.cover_letter.as_deref())
        .bind(candidate.stage.as_str())
        .bind(Json(&candidate.notes))
        .bind(candidate.applied_at)
        .execute(&mut *tx)
        .await?;

        Self::record_event(
            &mut tx,
            candidate.id,
            TimelineEventKind::StageChange,
            Some(Stage::Applied),
            "Applied for position",
            None,
            candidate.applied_at,
        )
        .await?;
        tx.commit().await?;

        info!(candidate_id = %candidate.id, job_id = %candidate.job_id, "candidate applied");
        Ok(candidate)
    }

    async fn update_candidate(&self, id: Uuid, patch: CandidatePatch) -> Result<Candidate> {
        patch.validate()?;
        let mut tx = self.pool.begin().await?;
        let mut candidate = Self::load_candidate(&mut tx, id).await?;
        let previous_stage = candidate.stage;
        patch.apply_to(&mut candidate);

        sqlx::query(
            "UPDATE candidates SET name = ?, email = ?, phone = ?, location = ?, experience = ?, skills = ?, resume = ?, stage = ? WHERE id = ?",
        )
        .bind(&candidate.name)
        .bind(&candidate.email)
        .bind(candidate.phone.as_deref())
        .bind(candidate.location.as_deref())
        .bind(candidate.experience.as_deref())
        .bind(Json(&candidate.skills))
        .bind(candidate.resume.as_deref())
        .bind(candidate.stage.as_str())
        .bind(candidate.id)
        .execute(&mut *tx)
        .await?;

        if candidate.stage != previous_stage {
            let description = format!("Moved from {} to {}", previous_stage, candidate.stage);
            Self::record_event(
                &mut tx,
                candidate.id,
                TimelineEventKind::StageChange,
                Some(candidate.stage),
                &description,
                None,
                Utc::now(),
            )
            .await?;
        }
        tx.commit().await?;

        Ok(candidate)
    }

    async fn add_note(&self, candidate_id: Uuid, note: Note) -> Result<Candidate> {
        let mut tx = self.pool.begin().await?;
        let mut candidate = Self::load_candidate(&mut tx, candidate_id).await?;

        Self::record_event(
            &mut tx,
            candidate_id,
            TimelineEventKind::Note,
            None,
            &note.content,
            Some(&note.author),
            note.created_at,
        )
        .await?;
        candidate.notes.push(note);

        sqlx::query("UPDATE candidates SET notes = ? WHERE id = ?")
            .bind(Json(&candidate.notes))
            .bind(candidate_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(candidate)
    }

    async fn candidate_timeline(&self, candidate_id: Uuid) -> Result<Vec<TimelineEvent>> {
        let mut conn = self.pool.acquire().await?;
        Self::load_candidate(&mut conn, candidate_id).await?;

        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT kind, stage, description, author, created_at FROM candidate_events WHERE candidate_id = ? ORDER BY id ASC",
        )
        .bind(candidate_id)
        .fetch_all(&mut *conn)
        .await?;
        rows.into_iter().map(TimelineEvent::try_from).collect()
    }

    async fn get_assessment(&self, job_id: Uuid) -> Result<Assessment> {
        let row = sqlx::query_as::<_, AssessmentRow>(
            "SELECT id, job_id, title, description, sections, created_at, updated_at FROM assessments WHERE job_id = ?",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Assessment for job {} not found", job_id)))?;
        Ok(row.into())
    }

    async fn save_assessment(&self, assessment: Assessment) -> Result<Assessment> {
        let mut tx = self.pool.begin().await?;
        Self::load_job(&mut tx, assessment.job_id).await?;

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO assessments (job_id, id, title, description, sections, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (job_id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                sections = excluded.sections,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(assessment.job_id)
        .bind(assessment.id)
        .bind(&assessment.title)
        .bind(&assessment.description)
        .bind(Json(&assessment.sections))
        .bind(assessment.created_at.unwrap_or(now))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, AssessmentRow>(
            "SELECT id, job_id, title, description, sections, created_at, updated_at FROM assessments WHERE job_id = ?",
        )
        .bind(assessment.job_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row.into())
    }

    async fn submit_response(&self, response: AssessmentResponse) -> Result<AssessmentResponse> {
        let mut tx = self.pool.begin().await?;
        let candidate = Self::load_candidate(&mut tx, response.candidate_id).await?;
        if candidate.job_id != response.job_id {
            return Err(Error::NotFound(format!(
                "Candidate {} has not applied to job {}",
                candidate.id, response.job_id
            )));
        }

        sqlx::query(
            "INSERT INTO assessment_responses (id, assessment_id, job_id, candidate_id, answers, submitted_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(response.id)
        .bind(response.assessment_id)
        .bind(response.job_id)
        .bind(response.candidate_id)
        .bind(Json(&response.answers))
        .bind(response.submitted_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(response_id = %response.id, candidate_id = %response.candidate_id, "assessment submitted");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::pool::{create_pool, run_migrations};
    use crate::models::job::JobStatus;

    async fn store() -> RecordStore {
        let pool = create_pool("sqlite::memory:").await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        RecordStore::new(pool)
    }

    fn job_payload(title: &str) -> CreateJobPayload {
        CreateJobPayload {
            title: title.to_string(),
            slug: None,
            description: None,
            location: Some("Remote".into()),
            salary: None,
            status: None,
            tags: vec!["engineering".into()],
        }
    }

    fn candidate_payload(job_id: Uuid, name: &str) -> CreateCandidatePayload {
        CreateCandidatePayload {
            job_id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: None,
            location: None,
            experience: None,
            skills: vec![],
            resume: None,
            cover_letter: None,
        }
    }

    #[tokio::test]
    async fn jobs_are_appended_with_dense_orders() {
        let store = store().await;
        for title in ["Alpha", "Beta", "Gamma"] {
            store.create_job(job_payload(title)).await.unwrap();
        }

        let page = store.fetch_jobs(JobQuery::all()).await.unwrap();
        let orders: Vec<i64> = page.items.iter().map(|j| j.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(page.items[2].slug, "gamma");
        assert_eq!(page.items[0].status, JobStatus::Active);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let store = store().await;
        store.create_job(job_payload("Platform Engineer")).await.unwrap();
        let err = store
            .create_job(job_payload("Platform  Engineer"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let other = store.create_job(job_payload("SRE")).await.unwrap();
        let err = store
            .update_job(
                other.id,
                JobPatch {
                    slug: Some("platform-engineer".into()),
                    ..JobPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn reorder_persists_splice_semantics() {
        let store = store().await;
        let mut ids = Vec::new();
        for title in ["One", "Two", "Three", "Four", "Five"] {
            ids.push(store.create_job(job_payload(title)).await.unwrap().id);
        }

        let returned = store.reorder_jobs(2, 4).await.unwrap();
        let persisted = store.fetch_jobs(JobQuery::all()).await.unwrap().items;
        let returned_ids: Vec<(Uuid, i64)> = returned.iter().map(|j| (j.id, j.order)).collect();
        let persisted_ids: Vec<(Uuid, i64)> = persisted.iter().map(|j| (j.id, j.order)).collect();
        assert_eq!(returned_ids, persisted_ids);

        let order_by_id: Vec<Uuid> = persisted.iter().map(|j| j.id).collect();
        assert_eq!(order_by_id, vec![ids[0], ids[2], ids[3], ids[1], ids[4]]);
        assert!(ordering::is_dense(&persisted));
    }

    #[tokio::test]
    async fn reorder_out_of_range_changes_nothing() {
        let store = store().await;
        for title in ["One", "Two"] {
            store.create_job(job_payload(title)).await.unwrap();
        }
        let before: Vec<Uuid> = store
            .fetch_jobs(JobQuery::all())
            .await
            .unwrap()
            .items
            .iter()
            .map(|j| j.id)
            .collect();

        let err = store.reorder_jobs(1, 3).await.unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        let after: Vec<Uuid> = store
            .fetch_jobs(JobQuery::all())
            .await
            .unwrap()
            .items
            .iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn stage_changes_are_recorded_on_the_timeline() {
        let store = store().await;
        let job = store.create_job(job_payload("Data Engineer")).await.unwrap();
        let candidate = store
            .create_candidate(candidate_payload(job.id, "Ada"))
            .await
            .unwrap();
        assert_eq!(candidate.stage, Stage::Applied);

        let updated = store
            .update_candidate(candidate.id, CandidatePatch::stage(Stage::Tech))
            .await
            .unwrap();
        assert_eq!(updated.stage, Stage::Tech);

        let timeline = store.candidate_timeline(candidate.id).await.unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].description, "Applied for position");
        assert_eq!(timeline[1].stage, Some(Stage::Tech));
        assert_eq!(timeline[1].description, "Moved from applied to tech");
    }

    #[tokio::test]
    async fn candidate_filters_and_pagination() {
        let store = store().await;
        let job = store.create_job(job_payload("QA")).await.unwrap();
        for name in ["Ada", "Grace", "Linus", "Barbara"] {
            store.create_candidate(candidate_payload(job.id, name)).await.unwrap();
        }
        let grace = store
            .fetch_candidates(CandidateQuery {
                search: Some("GRACE".into()),
                ..CandidateQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(grace.total, 1);
        store
            .update_candidate(grace.items[0].id, CandidatePatch::stage(Stage::Offer))
            .await
            .unwrap();

        let offers = store
            .fetch_candidates(CandidateQuery {
                stage: Some(Stage::Offer),
                ..CandidateQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(offers.items.len(), 1);
        assert_eq!(offers.items[0].name, "Grace");

        let second = store
            .fetch_candidates(CandidateQuery {
                page: Some(2),
                page_size: Some(3),
                ..CandidateQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(second.total, 4);
        assert_eq!(second.total_pages, 2);
        assert_eq!(second.items.len(), 1);

        let beyond = store
            .fetch_candidates(CandidateQuery {
                page: Some(i64::MAX),
                page_size: Some(10),
                ..CandidateQuery::default()
            })
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 4);
    }

    #[tokio::test]
    async fn unknown_job_and_duplicate_application_are_rejected() {
        let store = store().await;
        let err = store
            .create_candidate(candidate_payload(Uuid::new_v4(), "Ada"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let job = store.create_job(job_payload("Support")).await.unwrap();
        store.create_candidate(candidate_payload(job.id, "Ada")).await.unwrap();
        let err = store
            .create_candidate(candidate_payload(job.id, "ADA"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn responses_require_a_candidate_of_that_job() {
        let store = store().await;
        let job = store.create_job(job_payload("Analyst")).await.unwrap();
        let other = store.create_job(job_payload("Recruiter")).await.unwrap();
        let candidate = store.create_candidate(candidate_payload(job.id, "Ada")).await.unwrap();
        let response = |job_id: Uuid, candidate_id: Uuid| AssessmentResponse {
            id: Uuid::new_v4(),
            assessment_id: Uuid::new_v4(),
            job_id,
            candidate_id,
            answers: Default::default(),
            submitted_at: Utc::now(),
        };

        let err = store
            .submit_response(response(job.id, Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = store
            .submit_response(response(other.id, candidate.id))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let stored = store.submit_response(response(job.id, candidate.id)).await.unwrap();
        assert_eq!(stored.candidate_id, candidate.id);
    }
}
