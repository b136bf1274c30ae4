use crate::{
    models::{Product, ProductResponse, Relevancy, SymptomCheckResponse},
    services::{
        assistant_service::{
            check_relevancy, interpret_recommendations, inventory_text, Interpreted,
            MAX_RECOMMENDATIONS,
        },
        gemini_service::TextModel,
        product_service::ProductCatalog,
    },
    utils::AppError,
};
use lazy_static::lazy_static;

pub const SYMPTOM_SCOPE: &str =
    "health symptoms or wellness concerns that dietary supplements or vitamins may help with";

/// One row of the symptom lookup table
#[derive(Debug)]
pub struct SymptomEntry {
    pub symptom: &'static str,
    pub aliases: &'static [&'static str],
    pub keywords: &'static [&'static str],
}

impl SymptomEntry {
    /// Case-insensitive substring match of the symptom or any alias.
    /// `text` must already be lowercase.
    fn matches(&self, text: &str) -> bool {
        text.contains(self.symptom) || self.aliases.iter().any(|alias| text.contains(alias))
    }
}

lazy_static! {
    pub static ref SYMPTOM_TABLE: Vec<SymptomEntry> = vec![
        SymptomEntry {
            symptom: "joint pain",
            aliases: &["joint", "arthritis", "knee pain", "stiff"],
            keywords: &["glucosamine", "chondroitin", "turmeric", "joint"],
        },
        SymptomEntry {
            symptom: "fatigue",
            aliases: &["tired", "low energy", "exhaust", "weakness"],
            keywords: &["iron", "vitamin b12", "coq10", "energy"],
        },
        SymptomEntry {
            symptom: "insomnia",
            aliases: &["sleep", "restless night", "wake up at night"],
            keywords: &["melatonin", "magnesium", "valerian", "sleep"],
        },
        SymptomEntry {
            symptom: "stress",
            aliases: &["anxiety", "anxious", "nervous", "tension"],
            keywords: &["ashwagandha", "l-theanine", "magnesium", "stress"],
        },
        SymptomEntry {
            symptom: "cold",
            aliases: &["flu", "sore throat", "cough", "frequent infections", "immunity", "immune"],
            keywords: &["vitamin c", "zinc", "elderberry", "echinacea", "immune"],
        },
        SymptomEntry {
            symptom: "weak bones",
            aliases: &["osteoporosis", "bone density", "fracture", "bones"],
            keywords: &["calcium", "vitamin d", "vitamin k2", "bone"],
        },
        SymptomEntry {
            symptom: "digestive issues",
            aliases: &["bloating", "indigestion", "constipation", "gassy", "gut", "digestion"],
            keywords: &["probiotic", "fiber", "digestive enzyme", "digest"],
        },
        SymptomEntry {
            symptom: "hair loss",
            aliases: &["thinning hair", "brittle nails", "hair fall", "nails"],
            keywords: &["biotin", "collagen", "keratin", "hair"],
        },
        SymptomEntry {
            symptom: "muscle cramps",
            aliases: &["cramp", "muscle pain", "sore muscles", "spasm"],
            keywords: &["magnesium", "potassium", "electrolyte"],
        },
        SymptomEntry {
            symptom: "poor concentration",
            aliases: &["brain fog", "memory", "focus", "concentrat", "forgetful"],
            keywords: &["omega-3", "ginkgo", "vitamin b", "brain"],
        },
        SymptomEntry {
            symptom: "heart health",
            aliases: &["cholesterol", "blood pressure", "heart", "circulation"],
            keywords: &["omega-3", "fish oil", "coq10", "heart"],
        },
        SymptomEntry {
            symptom: "skin problems",
            aliases: &["acne", "dry skin", "eczema", "wrinkles", "skin"],
            keywords: &["vitamin e", "collagen", "zinc", "skin"],
        },
        SymptomEntry {
            symptom: "anemia",
            aliases: &["iron deficiency", "pale", "dizzy", "dizziness"],
            keywords: &["iron", "folic acid", "vitamin b12"],
        },
        SymptomEntry {
            symptom: "low mood",
            aliases: &["depress", "sadness", "mood swings", "feeling down"],
            keywords: &["vitamin d", "omega-3", "saffron", "mood"],
        },
        SymptomEntry {
            symptom: "eye strain",
            aliases: &["dry eyes", "blurry vision", "vision", "eyes"],
            keywords: &["lutein", "zeaxanthin", "vitamin a", "eye"],
        },
    ];
}

/// Symptoms found in free text and the supplement keywords they map to
#[derive(Debug, Default, PartialEq)]
pub struct SymptomMatch {
    pub symptoms: Vec<String>,
    pub keywords: Vec<String>,
}

/// Table order is preserved; keywords shared between symptoms appear once.
pub fn match_symptoms(text: &str) -> SymptomMatch {
    let text = text.to_lowercase();
    let mut result = SymptomMatch::default();

    for entry in SYMPTOM_TABLE.iter().filter(|entry| entry.matches(&text)) {
        result.symptoms.push(entry.symptom.to_string());
        for keyword in entry.keywords {
            if !result.keywords.iter().any(|k| k == keyword) {
                result.keywords.push(keyword.to_string());
            }
        }
    }

    result
}

pub fn symptom_prompt(symptoms: &str, matched: &[String], inventory: &str) -> String {
    format!(
        r#"Pre Task Instructions:
Normalize the text if it has any typos or grammatical errors.
You are a healthcare supplement assistant. You do not diagnose; you suggest supplements from the inventory that are commonly used for the described symptoms.

Described symptoms: "{symptoms}"
Recognised symptom categories: {matched}

Inventory:
{inventory}

Rules:
- Only recommend products from the inventory.
- Do not hallucinate.
- Recommend up to {MAX_RECOMMENDATIONS} products with short reasons tied to the symptoms.
- If no relevant product found, return [].

Output JSON only:
[
  {{ "name": "<product name>", "reason": "<reason>" }}
]"#,
        matched = matched.join(", ")
    )
}

fn empty_response(relevancy: Relevancy, matched: SymptomMatch) -> SymptomCheckResponse {
    SymptomCheckResponse {
        matched_symptoms: matched.symptoms,
        keywords: matched.keywords,
        products: Vec::new(),
        recommendations: Some(serde_json::json!([])),
        raw: None,
        recommendations_text: None,
        relevancy,
    }
}

fn to_responses(products: &[Product]) -> Vec<ProductResponse> {
    products.iter().cloned().map(ProductResponse::from).collect()
}

pub async fn symptom_check(
    model: &dyn TextModel,
    catalog: &dyn ProductCatalog,
    symptoms: &str,
) -> Result<SymptomCheckResponse, AppError> {
    if symptoms.trim().is_empty() {
        return Err(AppError::InvalidRequest("symptoms is required".to_string()));
    }

    let relevancy = check_relevancy(model, symptoms, SYMPTOM_SCOPE).await;
    if !relevancy.relevant {
        return Ok(empty_response(relevancy, SymptomMatch::default()));
    }

    let matched = match_symptoms(symptoms);
    log::info!("🩺 Matched symptoms: {:?}", matched.symptoms);

    if matched.keywords.is_empty() {
        return Ok(empty_response(relevancy, matched));
    }

    let products = catalog.find_by_keywords(&matched.keywords).await?;
    if products.is_empty() {
        return Ok(empty_response(relevancy, matched));
    }

    let prompt = symptom_prompt(symptoms, &matched.symptoms, &inventory_text(&products));
    let product_responses = to_responses(&products);

    let reply = match model.ask(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("❌ Symptom recommendation failed: {}", e);
            let mut response = empty_response(relevancy, matched);
            response.products = product_responses;
            return Ok(response);
        }
    };

    let (recommendations, recommendations_text) = match interpret_recommendations(&reply) {
        Interpreted::Recommendations(list) => (Some(list), None),
        Interpreted::Text(text) => (None, Some(text)),
    };

    Ok(SymptomCheckResponse {
        matched_symptoms: matched.symptoms,
        keywords: matched.keywords,
        products: product_responses,
        recommendations,
        raw: Some(reply),
        recommendations_text,
        relevancy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::assistant_service::testing::*;

    const RELEVANT: &str = "{\"relevant\": true, \"reason\": \"symptoms\"}";

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new(vec![
            product("Joint Flex", "Joint Support", "Glucosamine, Chondroitin"),
            product("Calm Night", "Sleep", "Melatonin, Magnesium"),
            product("Immune Shield", "Immunity", "Vitamin C, Zinc"),
        ])
    }

    #[test]
    fn test_match_is_case_insensitive_substring() {
        let matched = match_symptoms("My KNEES are stiff and I can't SLEEP");
        assert_eq!(matched.symptoms, vec!["joint pain", "insomnia"]);
        assert!(matched.keywords.contains(&"glucosamine".to_string()));
        assert!(matched.keywords.contains(&"melatonin".to_string()));
    }

    #[test]
    fn test_shared_keywords_are_deduplicated() {
        // magnesium appears in both insomnia and stress rows
        let matched = match_symptoms("stress and insomnia");
        let count = matched.keywords.iter().filter(|k| *k == "magnesium").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_no_match() {
        assert_eq!(match_symptoms("my bicycle squeaks"), SymptomMatch::default());
    }

    #[test]
    fn test_table_is_lowercase() {
        // matches() compares against lowercased input
        for entry in SYMPTOM_TABLE.iter() {
            assert_eq!(entry.symptom, entry.symptom.to_lowercase());
            for alias in entry.aliases {
                assert_eq!(*alias, alias.to_lowercase());
            }
            assert!(!entry.keywords.is_empty());
        }
    }

    #[tokio::test]
    async fn test_symptom_check_recommends_from_matches() {
        let reply = "[{\"name\": \"Calm Night\", \"reason\": \"melatonin supports sleep\"}]";
        let model = ScriptedModel::new(vec![Ok(RELEVANT), Ok(reply)]);
        let catalog = catalog();

        let response = symptom_check(&model, &catalog, "I have insomnia").await.unwrap();

        assert_eq!(response.matched_symptoms, vec!["insomnia"]);
        assert_eq!(response.products.len(), 1);
        assert_eq!(response.products[0].name, "Calm Night");
        assert_eq!(response.recommendations.unwrap()[0]["name"], "Calm Night");
        assert_eq!(response.raw.as_deref(), Some(reply));

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains(SYMPTOM_SCOPE));
        assert!(prompts[1].contains("Recognised symptom categories: insomnia"));
        assert!(!prompts[1].contains("Joint Flex"));
    }

    #[tokio::test]
    async fn test_symptom_check_without_table_match_skips_model() {
        let model = ScriptedModel::new(vec![Ok(RELEVANT)]);
        let response = symptom_check(&model, &catalog(), "strange tingling").await.unwrap();
        assert!(response.matched_symptoms.is_empty());
        assert!(response.products.is_empty());
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_symptom_check_unparsable_reply() {
        let model = ScriptedModel::new(vec![Ok(RELEVANT), Ok("Take Immune Shield daily.")]);
        let response = symptom_check(&model, &catalog(), "sore throat and cough").await.unwrap();
        assert!(response.recommendations.is_none());
        assert_eq!(
            response.recommendations_text.as_deref(),
            Some("Take Immune Shield daily.")
        );
        assert_eq!(response.products[0].name, "Immune Shield");
    }

    #[tokio::test]
    async fn test_symptom_check_keeps_any_valid_json() {
        let reply = r#"[{"name": "Immune Shield", "reason": null}]"#;
        let model = ScriptedModel::new(vec![Ok(RELEVANT), Ok(reply)]);
        let response = symptom_check(&model, &catalog(), "I keep catching a cold").await.unwrap();

        let recommendations = response.recommendations.unwrap();
        assert_eq!(recommendations[0]["name"], "Immune Shield");
        assert!(recommendations[0]["reason"].is_null());
        assert!(response.recommendations_text.is_none());
    }

    #[tokio::test]
    async fn test_blank_symptoms_rejected() {
        let model = ScriptedModel::new(vec![]);
        let result = symptom_check(&model, &catalog(), "  ").await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }
}
