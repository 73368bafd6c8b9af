use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::job::{Job, JobStatus};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Derived from the title when omitted.
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateJobPayload {
    pub fn resolved_slug(&self) -> String {
        self.slug
            .clone()
            .unwrap_or_else(|| slugify(&self.title))
    }
}

/// Partial update. `order` is deliberately absent: positions only change
/// through a reorder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct JobPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub status: Option<JobStatus>,
    pub tags: Option<Vec<String>>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, job: &mut Job) {
        if let Some(title) = &self.title {
            job.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            job.slug = slug.clone();
        }
        if let Some(description) = &self.description {
            job.description = Some(description.clone());
        }
        if let Some(location) = &self.location {
            job.location = Some(location.clone());
        }
        if let Some(salary) = &self.salary {
            job.salary = Some(salary.clone());
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(tags) = &self.tags {
            job.tags = tags.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ReorderPayload {
    #[validate(range(min = 1))]
    pub from_order: i64,
    #[validate(range(min = 1))]
    pub to_order: i64,
}

/// Presentation filters over the job board. They select which jobs are shown
/// and never influence `order`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilters {
    pub search: Option<String>,
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl JobFilters {
    pub fn matches(&self, job: &Job) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let in_title = job.title.to_lowercase().contains(&needle);
            let in_tags = job.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            if !in_title && !in_tags {
                return false;
            }
        }
        if let Some(status) = self.status {
            if job.status != status {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| job.tags.contains(t)) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobQuery {
    pub filters: JobFilters,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl JobQuery {
    /// The whole ordered collection, unfiltered and on one page.
    pub fn all() -> Self {
        Self::default()
    }
}

/// Query string accepted by `GET /api/jobs`; `tags` is comma separated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobListQuery {
    pub search: Option<String>,
    pub status: Option<JobStatus>,
    pub tags: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl JobListQuery {
    pub fn filters(&self) -> JobFilters {
        let tags = self
            .tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        JobFilters {
            search: self.search.clone(),
            status: self.status,
            tags,
        }
    }
}

pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let well_formed = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("slug"))
    }
}
