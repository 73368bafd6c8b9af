use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::candidate::{Candidate, Stage};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCandidatePayload {
    pub job_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub resume: Option<String>,
    pub cover_letter: Option<String>,
}

/// Partial candidate update sent to the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CandidatePatch {
    pub stage: Option<Stage>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub experience: Option<String>,
    pub skills: Option<Vec<String>>,
    pub resume: Option<String>,
}

impl CandidatePatch {
    pub fn stage(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, candidate: &mut Candidate) {
        if let Some(stage) = self.stage {
            candidate.stage = stage;
        }
        if let Some(name) = &self.name {
            candidate.name = name.clone();
        }
        if let Some(email) = &self.email {
            candidate.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            candidate.phone = Some(phone.clone());
        }
        if let Some(location) = &self.location {
            candidate.location = Some(location.clone());
        }
        if let Some(experience) = &self.experience {
            candidate.experience = Some(experience.clone());
        }
        if let Some(skills) = &self.skills {
            candidate.skills = skills.clone();
        }
        if let Some(resume) = &self.resume {
            candidate.resume = Some(resume.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateQuery {
    /// Matches name or email, case-insensitive.
    pub search: Option<String>,
    pub stage: Option<Stage>,
    pub job_id: Option<Uuid>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl CandidateQuery {
    pub fn matches(&self, candidate: &Candidate) -> bool {
        if self.stage.is_some_and(|stage| stage != candidate.stage) {
            return false;
        }
        if self.job_id.is_some_and(|job_id| job_id != candidate.job_id) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(search) => {
                let needle = search.to_lowercase();
                candidate.name.to_lowercase().contains(&needle)
                    || candidate.email.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MoveStagePayload {
    pub stage: Stage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveStageResponse {
    pub changed: bool,
    pub candidate: Candidate,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddNotePayload {
    #[validate(length(min = 1, max = 200))]
    pub author: String,
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
    /// Extracted from `@handle` tokens in the content when omitted.
    pub mentions: Option<Vec<String>>,
}

/// One kanban column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageColumn {
    pub stage: Stage,
    pub candidates: Vec<Candidate>,
}
