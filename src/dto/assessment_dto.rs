use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use crate::models::assessment::Section;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveAssessmentPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAssessmentPayload {
    pub candidate_id: Uuid,
    #[serde(default)]
    pub answers: BTreeMap<String, JsonValue>,
}
