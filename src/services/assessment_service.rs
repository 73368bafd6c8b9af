use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use regex_lite::Regex;
use serde_json::Value as JsonValue;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::assessment_dto::{SaveAssessmentPayload, SubmitAssessmentPayload};
use crate::error::{Error, Result};
use crate::models::assessment::{
    Assessment, AssessmentResponse, Condition, ConditionalLogic, Question, QuestionKind, RuleKind,
    ValidationRule,
};
use crate::services::gateway::PersistenceGateway;

#[derive(Clone)]
pub struct AssessmentService {
    gateway: Arc<dyn PersistenceGateway>,
}

impl AssessmentService {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self { gateway }
    }

    pub async fn get(&self, job_id: Uuid) -> Result<Assessment> {
        self.gateway.get_assessment(job_id).await
    }

    /// Creates or replaces the assessment of a job.
    #[instrument(skip(self, payload))]
    pub async fn save(&self, job_id: Uuid, payload: SaveAssessmentPayload) -> Result<Assessment> {
        payload.validate()?;
        let assessment = Assessment {
            id: Uuid::new_v4(),
            job_id,
            title: payload.title,
            description: payload.description,
            sections: payload.sections,
            created_at: None,
            updated_at: None,
        };
        check_structure(&assessment)?;

        let saved = self.gateway.save_assessment(assessment).await?;
        info!(job_id = %job_id, questions = saved.questions().count(), "assessment saved");
        Ok(saved)
    }

    /// Validates the visible answers and stores the response. Answers to
    /// hidden or unknown questions are dropped.
    #[instrument(skip(self, payload))]
    pub async fn submit(&self, job_id: Uuid, payload: SubmitAssessmentPayload) -> Result<AssessmentResponse> {
        let assessment = self.gateway.get_assessment(job_id).await?;

        let errors = validate_answers(&assessment, &payload.answers);
        if !errors.is_empty() {
            return Err(Error::InvalidResponse(errors));
        }

        let answers = visible_questions(&assessment, &payload.answers)
            .into_iter()
            .filter_map(|q| {
                payload
                    .answers
                    .get(&q.id)
                    .map(|answer| (q.id.clone(), answer.clone()))
            })
            .collect();

        let response = AssessmentResponse {
            id: Uuid::new_v4(),
            assessment_id: assessment.id,
            job_id,
            candidate_id: payload.candidate_id,
            answers,
            submitted_at: Utc::now(),
        };
        self.gateway.submit_response(response).await
    }
}

/// Rejects duplicate question ids, conditions on unknown or self questions
/// and patterns that do not compile.
fn check_structure(assessment: &Assessment) -> Result<()> {
    let mut seen = HashSet::new();
    for question in assessment.questions() {
        if !seen.insert(question.id.as_str()) {
            return Err(Error::BadRequest(format!(
                "Duplicate question id: {}",
                question.id
            )));
        }
    }

    for question in assessment.questions() {
        if let Some(logic) = &question.condition {
            if logic.depends_on == question.id || !seen.contains(logic.depends_on.as_str()) {
                return Err(Error::BadRequest(format!(
                    "Question {} depends on unknown question {}",
                    question.id, logic.depends_on
                )));
            }
        }
        for rule in question.rules.iter().filter(|r| r.kind == RuleKind::Pattern) {
            let pattern = rule.value.as_ref().and_then(JsonValue::as_str).unwrap_or_default();
            Regex::new(pattern).map_err(|e| {
                Error::BadRequest(format!("Invalid pattern on question {}: {}", question.id, e))
            })?;
        }
    }
    Ok(())
}

/// Questions shown for the given answers, in display order.
pub fn visible_questions<'a>(
    assessment: &'a Assessment,
    answers: &BTreeMap<String, JsonValue>,
) -> Vec<&'a Question> {
    let by_id: HashMap<&str, &Question> =
        assessment.questions().map(|q| (q.id.as_str(), q)).collect();
    assessment
        .questions()
        .filter(|&q| is_visible(q, &by_id, answers, &mut HashSet::new()))
        .collect()
}

/// First failing check per visible question, keyed by question id.
pub fn validate_answers(
    assessment: &Assessment,
    answers: &BTreeMap<String, JsonValue>,
) -> BTreeMap<String, String> {
    visible_questions(assessment, answers)
        .into_iter()
        .filter_map(|question| {
            let answer = answers.get(&question.id).unwrap_or(&JsonValue::Null);
            validate_question(question, answer).map(|message| (question.id.clone(), message))
        })
        .collect()
}

fn is_visible<'a>(
    question: &'a Question,
    by_id: &HashMap<&str, &'a Question>,
    answers: &BTreeMap<String, JsonValue>,
    visiting: &mut HashSet<&'a str>,
) -> bool {
    let Some(logic) = &question.condition else {
        return true;
    };
    if !visiting.insert(question.id.as_str()) {
        return false;
    }
    let Some(&dependency) = by_id.get(logic.depends_on.as_str()) else {
        return false;
    };
    if !is_visible(dependency, by_id, answers, visiting) {
        return false;
    }
    match answers.get(&logic.depends_on) {
        Some(answer) if !is_empty(answer) => condition_holds(logic, answer),
        _ => false,
    }
}

fn condition_holds(logic: &ConditionalLogic, answer: &JsonValue) -> bool {
    match logic.condition {
        Condition::Equals => loose_eq(answer, &logic.value),
        Condition::NotEquals => !loose_eq(answer, &logic.value),
        Condition::Contains => match answer {
            JsonValue::Array(items) => items.iter().any(|item| loose_eq(item, &logic.value)),
            JsonValue::String(text) => text.contains(&display(&logic.value)),
            _ => false,
        },
        Condition::GreaterThan => match (as_number(answer), as_number(&logic.value)) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        Condition::LessThan => match (as_number(answer), as_number(&logic.value)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
    }
}

fn validate_question(question: &Question, answer: &JsonValue) -> Option<String> {
    if is_empty(answer) {
        if question.required {
            return Some("This field is required".to_string());
        }
        return question
            .rules
            .iter()
            .find(|rule| rule.kind == RuleKind::Required)
            .map(|rule| rule.message.clone());
    }

    let builtin = match question.kind {
        QuestionKind::Numeric => match as_number(answer) {
            None => Some("Please enter a valid number".to_string()),
            Some(n) => match (question.min, question.max) {
                (Some(min), _) if n < min => Some(format!("Value must be at least {}", display_number(min))),
                (_, Some(max)) if n > max => Some(format!("Value must be at most {}", display_number(max))),
                _ => None,
            },
        },
        QuestionKind::ShortText | QuestionKind::LongText => match (answer.as_str(), question.max_length) {
            (Some(text), Some(limit)) if text.chars().count() > limit => {
                Some(format!("Text must be less than {} characters", limit))
            }
            _ => None,
        },
        QuestionKind::SingleChoice => match answer.as_str() {
            Some(choice) if question.options.iter().any(|o| o == choice) => None,
            _ => Some("Please select a valid option".to_string()),
        },
        QuestionKind::MultiChoice => {
            let valid = match answer {
                JsonValue::Array(items) => items.iter().all(|item| {
                    item.as_str()
                        .is_some_and(|choice| question.options.iter().any(|o| o == choice))
                }),
                _ => false,
            };
            (!valid).then(|| "Please select a valid option".to_string())
        }
        QuestionKind::File => None,
    };

    builtin.or_else(|| {
        question
            .rules
            .iter()
            .find(|rule| !rule_passes(rule, answer))
            .map(|rule| rule.message.clone())
    })
}

fn rule_passes(rule: &ValidationRule, answer: &JsonValue) -> bool {
    let limit = rule.value.as_ref().and_then(as_number);
    let length = || match answer {
        JsonValue::Array(items) => items.len(),
        other => display(other).chars().count(),
    };
    match rule.kind {
        RuleKind::Required => !is_empty(answer),
        RuleKind::MinLength => limit.map_or(true, |min| length() as f64 >= min),
        RuleKind::MaxLength => limit.map_or(true, |max| length() as f64 <= max),
        RuleKind::Min => match (as_number(answer), limit) {
            (Some(n), Some(min)) => n >= min,
            _ => true,
        },
        RuleKind::Max => match (as_number(answer), limit) {
            (Some(n), Some(max)) => n <= max,
            _ => true,
        },
        RuleKind::Pattern => {
            let pattern = rule.value.as_ref().and_then(JsonValue::as_str).unwrap_or_default();
            match Regex::new(pattern) {
                Ok(re) => re.is_match(&display(answer)),
                Err(e) => {
                    warn!(error = %e, pattern, "skipping invalid pattern rule");
                    true
                }
            }
        }
    }
}

fn is_empty(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn loose_eq(a: &JsonValue, b: &JsonValue) -> bool {
    if a == b {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => display(a) == display(b),
    }
}

fn display(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn display_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
