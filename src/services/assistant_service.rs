//! AI-assisted product matching.
//!
//! Every operation follows the same shape: a relevancy gate, a prompt built
//! from the query (and, for recommendations, the inventory), then a
//! best-effort parse of the model reply. Model and parse failures never
//! surface as errors; they degrade to the fallback payloads in `models::assistant`.

use crate::{
    models::{
        AiSearchResponse, ChatResponse, Product, ProductResponse, Relevancy,
    },
    services::{gemini_service::TextModel, product_service::ProductCatalog},
    utils::{
        text::{parse_model_json, split_keywords, strip_code_fences},
        AppError,
    },
};

/// Inventory rows embedded in the chat prompt
pub const CHAT_INVENTORY_LIMIT: u64 = 100;
pub const MAX_RECOMMENDATIONS: usize = 5;

pub const PRODUCT_SCOPE: &str =
    "healthcare supplements, vitamins, or products in the inventory";

const EMPTY_INVENTORY: &str = "No products found in inventory.";

const SCHEMA_REFERENCE: &str = r#"Product Schema:
{
  "name": "string",
  "category": "string",
  "brand": "string",
  "description": "string",
  "price": "string",
  "ingredients": "string",
  "dosage": "string"
}"#;

pub fn relevancy_prompt(query: &str, scope: &str) -> String {
    format!(
        r#"Pre Task Instructions:
Normalize the text if it has any typos or grammatical errors.
Task: Check if the following user query is related to {scope}.
Query: "{query}"

Respond only in strict JSON:
{{
  "relevant": true|false,
  "reason": "<short reason why>"
}}"#
    )
}

pub fn intent_prompt(query: &str) -> String {
    format!(
        r#"Pre Task Instructions:
Normalize the text if it has any typos or grammatical errors.

Role:
You are an intent extraction engine for a healthcare product search system.

User query: "{query}"

Task Context:
Extract exact concise intent as comma-separated keywords (e.g., "calcium, vitamin D, joint"). If a user asks about joint health issues the intent is supplements for joints, not general health.
Task:
 - Identify the user's exact intent and extract the most relevant keywords.
 - Keywords must match product attributes: ingredients (e.g., "calcium", "vitamin D"), health goals (e.g., "joint support", "immune boost") or product type (e.g., "protein powder", "multivitamin").
 - Do not add unrelated words or explanations.
 - Return keywords only, as a simple comma-separated list (no sentences, no extra text)."#
    )
}

/// Inventory block for recommendation prompts.
pub fn inventory_text(products: &[Product]) -> String {
    if products.is_empty() {
        return EMPTY_INVENTORY.to_string();
    }

    products
        .iter()
        .map(Product::inventory_summary)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn chat_prompt(query: &str, inventory: &str) -> String {
    format!(
        r#"Pre Task Instructions:
Normalize the text if it has any typos or grammatical errors.
You are a healthcare supplement recommendation assistant.

User query: "{query}"

Inventory:
{inventory}

Schema reference:
{SCHEMA_REFERENCE}

Rules:
- Only recommend products from the inventory.
- Do not hallucinate.
- Recommend up to {MAX_RECOMMENDATIONS} products with short reasons.
- If no relevant product found, return [].

Output JSON only:
[
  {{ "name": "<product name>", "reason": "<reason>" }}
]"#
    )
}

/// Relevancy gate. Blank queries get the unverified verdict without a model call.
pub async fn check_relevancy(model: &dyn TextModel, query: &str, scope: &str) -> Relevancy {
    if query.trim().is_empty() {
        return Relevancy::unverified();
    }

    let reply = match model.ask(&relevancy_prompt(query, scope)).await {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("❌ Relevancy check failed: {}", e);
            return Relevancy::unverified();
        }
    };

    match parse_model_json::<Relevancy>(&reply) {
        Ok(relevancy) => relevancy,
        Err(e) => {
            log::warn!("⚠️  Relevancy check parsing error: {}", e);
            Relevancy::unverified()
        }
    }
}

/// Any valid JSON reply is kept as-is; only unparsable text falls back to
/// the cleaned reply.
#[derive(Debug, PartialEq)]
pub enum Interpreted {
    Recommendations(serde_json::Value),
    Text(String),
}

pub fn interpret_recommendations(reply: &str) -> Interpreted {
    match parse_model_json::<serde_json::Value>(reply) {
        Ok(recommendations) => Interpreted::Recommendations(recommendations),
        Err(e) => {
            log::warn!("⚠️  Failed to parse recommendations JSON: {}", e);
            Interpreted::Text(strip_code_fences(reply))
        }
    }
}

fn to_responses(products: Vec<Product>) -> Vec<ProductResponse> {
    products.into_iter().map(ProductResponse::from).collect()
}

pub async fn ai_search(
    model: &dyn TextModel,
    catalog: &dyn ProductCatalog,
    query: &str,
) -> Result<AiSearchResponse, AppError> {
    let relevancy = check_relevancy(model, query, PRODUCT_SCOPE).await;
    if !relevancy.relevant {
        return Ok(AiSearchResponse {
            keywords: Vec::new(),
            products: Vec::new(),
            raw_intent: None,
            relevancy,
        });
    }

    let raw_intent = match model.ask(&intent_prompt(query)).await {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("❌ Intent extraction failed: {}", e);
            return Ok(AiSearchResponse {
                keywords: Vec::new(),
                products: Vec::new(),
                raw_intent: None,
                relevancy,
            });
        }
    };

    let keywords = split_keywords(&raw_intent);
    log::info!("🔑 Extracted {} keywords: {:?}", keywords.len(), keywords);

    let products = catalog.find_by_keywords(&keywords).await?;

    Ok(AiSearchResponse {
        keywords,
        products: to_responses(products),
        raw_intent: Some(raw_intent),
        relevancy,
    })
}

pub async fn chat(
    model: &dyn TextModel,
    catalog: &dyn ProductCatalog,
    query: &str,
) -> Result<ChatResponse, AppError> {
    let relevancy = check_relevancy(model, query, PRODUCT_SCOPE).await;
    if !relevancy.relevant {
        return Ok(ChatResponse::empty(relevancy));
    }

    let inventory = catalog.inventory(CHAT_INVENTORY_LIMIT).await?;
    let prompt = chat_prompt(query, &inventory_text(&inventory));

    let reply = match model.ask(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("❌ Chat completion failed: {}", e);
            return Ok(ChatResponse::empty(relevancy));
        }
    };

    Ok(match interpret_recommendations(&reply) {
        Interpreted::Recommendations(recommendations) => ChatResponse {
            recommendations: Some(recommendations),
            raw: Some(reply),
            recommendations_text: None,
            relevancy,
        },
        Interpreted::Text(text) => ChatResponse {
            recommendations: None,
            raw: Some(reply),
            recommendations_text: Some(text),
            relevancy,
        },
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory doubles for the model and the catalog.

    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies with queued answers in order and records every prompt.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, AppError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
            let replies = replies
                .into_iter()
                .map(|r| {
                    r.map(str::to_string)
                        .map_err(|e| AppError::UpstreamError(e.to_string()))
                })
                .collect();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextModel for ScriptedModel {
        async fn ask(&self, prompt: &str) -> Result<String, AppError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::UpstreamError("no scripted reply".into())))
        }
    }

    /// Case-insensitive substring matching over the same fields Mongo filters on.
    pub struct MemoryCatalog {
        pub products: Vec<Product>,
        pub keyword_queries: Mutex<Vec<Vec<String>>>,
    }

    impl MemoryCatalog {
        pub fn new(products: Vec<Product>) -> Self {
            Self {
                products,
                keyword_queries: Mutex::new(Vec::new()),
            }
        }
    }

    pub fn product(name: &str, category: &str, ingredients: &str) -> Product {
        Product {
            id: Some(mongodb::bson::oid::ObjectId::new()),
            name: name.to_string(),
            category: Some(category.to_string()),
            ingredients: Some(ingredients.to_string()),
            ..Default::default()
        }
    }

    #[async_trait]
    impl ProductCatalog for MemoryCatalog {
        async fn find_by_keywords(&self, keywords: &[String]) -> Result<Vec<Product>, AppError> {
            self.keyword_queries.lock().unwrap().push(keywords.to_vec());
            let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

            Ok(self
                .products
                .iter()
                .filter(|p| {
                    let haystack = [
                        Some(p.name.as_str()),
                        p.category.as_deref(),
                        p.ingredients.as_deref(),
                        p.description.as_deref(),
                    ]
                    .iter()
                    .flatten()
                    .map(|s| s.to_lowercase())
                    .collect::<Vec<_>>()
                    .join(" ");
                    keywords.iter().any(|k| haystack.contains(k.as_str()))
                })
                .take(50)
                .cloned()
                .collect())
        }

        async fn inventory(&self, limit: u64) -> Result<Vec<Product>, AppError> {
            Ok(self.products.iter().take(limit as usize).cloned().collect())
        }
    }
}
