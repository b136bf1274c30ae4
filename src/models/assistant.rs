use serde::{Deserialize, Serialize};
use super::ProductResponse;

pub const UNVERIFIED_RELEVANCY_REASON: &str = "Could not verify query relevance";

/// Outcome of the relevancy gate
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct Relevancy {
    pub relevant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Relevancy {
    /// Verdict used whenever the model reply cannot be obtained or parsed.
    pub fn unverified() -> Self {
        Self {
            relevant: false,
            reason: Some(UNVERIFIED_RELEVANCY_REASON.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, utoipa::ToSchema)]
pub struct Recommendation {
    pub name: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AiSearchResponse {
    pub keywords: Vec<String>,
    pub products: Vec<ProductResponse>,
    #[serde(rename = "rawIntent")]
    pub raw_intent: Option<String>,
    pub relevancy: Relevancy,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub q: Option<String>,
}

/// Chat reply. `recommendations` holds whatever JSON the model returned
/// (normally a list of `Recommendation`). It is absent when the reply was not
/// valid JSON, in which case `recommendationsText` carries the cleaned text.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ChatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Recommendation>>)]
    pub recommendations: Option<serde_json::Value>,
    pub raw: Option<String>,
    #[serde(rename = "recommendationsText", skip_serializing_if = "Option::is_none")]
    pub recommendations_text: Option<String>,
    pub relevancy: Relevancy,
}

impl ChatResponse {
    pub fn empty(relevancy: Relevancy) -> Self {
        Self {
            recommendations: Some(serde_json::json!([])),
            raw: None,
            recommendations_text: None,
            relevancy,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SymptomCheckRequest {
    #[serde(default)]
    pub symptoms: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SymptomCheckResponse {
    #[serde(rename = "matchedSymptoms")]
    pub matched_symptoms: Vec<String>,
    pub keywords: Vec<String>,
    pub products: Vec<ProductResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Recommendation>>)]
    pub recommendations: Option<serde_json::Value>,
    pub raw: Option<String>,
    #[serde(rename = "recommendationsText", skip_serializing_if = "Option::is_none")]
    pub recommendations_text: Option<String>,
    pub relevancy: Relevancy,
}
