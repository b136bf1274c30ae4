use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::{
    database::MongoDB,
    models::{
        AiSearchResponse, ChatRequest, ChatResponse, ProductBatch, ProductPage, ProductResponse,
        SymptomCheckRequest, SymptomCheckResponse,
    },
    services::{
        assistant_service, product_service, product_service::Pagination, symptom_service,
        ProductCatalog, TextModel,
    },
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub title: Option<String>,
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AiSearchQuery {
    #[serde(default)]
    pub q: String,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[utoipa::path(
    get,
    path = "/products",
    tag = "Products",
    params(
        ("title" = Option<String>, Query, description = "Case-insensitive match on product name"),
        ("q" = Option<String>, Query, description = "Case-insensitive match on name, description or ingredients (max 50)"),
        ("page" = Option<u64>, Query, description = "Page number, default 1"),
        ("limit" = Option<u64>, Query, description = "Page size, default 20, max 100")
    ),
    responses(
        (status = 200, description = "Products", body = ProductPage),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_products(
    db: web::Data<MongoDB>,
    query: web::Query<ListQuery>,
) -> HttpResponse {
    let result = if let Some(title) = non_blank(&query.title) {
        log::info!("📦 GET /products?title={}", title);
        product_service::find_by_title(&db, title).await
    } else if let Some(q) = non_blank(&query.q) {
        log::info!("📦 GET /products?q={}", q);
        product_service::search_by_text(&db, q).await
    } else {
        let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref());
        log::info!("📦 GET /products page={} limit={}", pagination.page, pagination.limit);
        product_service::find_all(&db, pagination).await
    };

    match result {
        Ok(page) => {
            log::info!("✅ Returned {} of {} products", page.items.len(), page.total);
            HttpResponse::Ok().json(page)
        }
        Err(e) => {
            log::error!("❌ Failed to list products: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "Products",
    params(
        ("id" = String, Path, description = "Product id (hex)")
    ),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 400, description = "Invalid id"),
        (status = 404, description = "Product not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_product(db: web::Data<MongoDB>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    log::info!("📦 GET /products/{}", id);

    match product_service::find_by_id(&db, &id).await {
        Ok(product) => HttpResponse::Ok().json(product),
        Err(e) => {
            log::warn!("⚠️ Product {} not returned: {}", id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/products/import",
    tag = "Products",
    request_body = ProductBatch,
    responses(
        (status = 201, description = "Products inserted"),
        (status = 400, description = "Empty batch or product without name")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn import_products(
    db: web::Data<MongoDB>,
    request: web::Json<ProductBatch>,
) -> HttpResponse {
    let items = request.into_inner().into_items();
    log::info!("📥 POST /products/import - {} items", items.len());

    match product_service::create_many(&db, items).await {
        Ok(inserted) => {
            log::info!("✅ Imported {} products", inserted);
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "inserted": inserted
            }))
        }
        Err(e) => {
            log::error!("❌ Import failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/products/ai-search",
    tag = "AI",
    params(
        ("q" = String, Query, description = "Natural-language query")
    ),
    responses(
        (status = 200, description = "Keywords extracted by the model and matching products", body = AiSearchResponse)
    )
)]
pub async fn ai_search(
    model: web::Data<dyn TextModel>,
    catalog: web::Data<dyn ProductCatalog>,
    query: web::Query<AiSearchQuery>,
) -> HttpResponse {
    log::info!("🤖 GET /products/ai-search?q={}", query.q);

    match assistant_service::ai_search(model.get_ref(), catalog.get_ref(), &query.q).await {
        Ok(response) => {
            log::info!(
                "✅ AI search: relevant={} keywords={} products={}",
                response.relevancy.relevant,
                response.keywords.len(),
                response.products.len()
            );
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::error!("❌ AI search failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/products/chat",
    tag = "AI",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Recommendations, or the raw model text when it could not be parsed", body = ChatResponse)
    )
)]
pub async fn chat(
    model: web::Data<dyn TextModel>,
    catalog: web::Data<dyn ProductCatalog>,
    request: web::Json<ChatRequest>,
) -> HttpResponse {
    let q = request.q.clone().unwrap_or_default();
    log::info!("💬 POST /products/chat - q: {}", q);

    match assistant_service::chat(model.get_ref(), catalog.get_ref(), &q).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::error!("❌ Chat failed: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/products/symptom-checker",
    tag = "AI",
    request_body = SymptomCheckRequest,
    responses(
        (status = 200, description = "Matched symptoms and suggested products", body = SymptomCheckResponse),
        (status = 400, description = "No symptoms provided")
    )
)]
pub async fn symptom_checker(
    model: web::Data<dyn TextModel>,
    catalog: web::Data<dyn ProductCatalog>,
    request: web::Json<SymptomCheckRequest>,
) -> HttpResponse {
    let symptoms = request.symptoms.clone().unwrap_or_default();
    log::info!("🩺 POST /products/symptom-checker - symptoms: {}", symptoms);

    match symptom_service::symptom_check(model.get_ref(), catalog.get_ref(), &symptoms).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("❌ Symptom check failed: {}", e);
            e.error_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::assistant_service::testing::{product, MemoryCatalog, ScriptedModel};
    use actix_web::{http::StatusCode, test as actix_test, App};
    use std::sync::Arc;

    const RELEVANT: &str = "{\"relevant\": true, \"reason\": \"ok\"}";

    fn app_data(
        replies: Vec<Result<&str, &str>>,
    ) -> (web::Data<dyn TextModel>, web::Data<dyn ProductCatalog>) {
        let model: Arc<dyn TextModel> = Arc::new(ScriptedModel::new(replies));
        let catalog: Arc<dyn ProductCatalog> = Arc::new(MemoryCatalog::new(vec![
            product("Joint Flex", "Joint Support", "Glucosamine"),
            product("Immune Shield", "Immunity", "Vitamin C, Zinc"),
        ]));
        (web::Data::from(model), web::Data::from(catalog))
    }

    #[actix_web::test]
    async fn test_ai_search_endpoint() {
        let (model, catalog) = app_data(vec![Ok(RELEVANT), Ok("zinc, vitamin c")]);
        let app = actix_test::init_service(
            App::new()
                .app_data(model)
                .app_data(catalog)
                .route("/products/ai-search", web::get().to(ai_search)),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/products/ai-search?q=immune%20boost")
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["keywords"], serde_json::json!(["zinc", "vitamin c"]));
        assert_eq!(body["products"][0]["name"], "Immune Shield");
        assert_eq!(body["rawIntent"], "zinc, vitamin c");
        assert_eq!(body["relevancy"]["relevant"], true);
    }

    #[actix_web::test]
    async fn test_chat_endpoint_missing_q_is_not_relevant() {
        let (model, catalog) = app_data(vec![]);
        let app = actix_test::init_service(
            App::new()
                .app_data(model)
                .app_data(catalog)
                .route("/products/chat", web::post().to(chat)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/products/chat")
            .set_json(serde_json::json!({}))
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["recommendations"], serde_json::json!([]));
        assert!(body["raw"].is_null());
        assert_eq!(body["relevancy"]["relevant"], false);
    }

    #[actix_web::test]
    async fn test_chat_endpoint_fallback_text() {
        let (model, catalog) = app_data(vec![Ok(RELEVANT), Ok("Joint Flex is great")]);
        let app = actix_test::init_service(
            App::new()
                .app_data(model)
                .app_data(catalog)
                .route("/products/chat", web::post().to(chat)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/products/chat")
            .set_json(serde_json::json!({ "q": "knee pain" }))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: serde_json::Value = actix_test::read_body_json(res).await;
        assert_eq!(body["recommendationsText"], "Joint Flex is great");
        assert_eq!(body["raw"], "Joint Flex is great");
        assert!(body.get("recommendations").is_none());
    }

    #[actix_web::test]
    async fn test_symptom_checker_requires_symptoms() {
        let (model, catalog) = app_data(vec![]);
        let app = actix_test::init_service(
            App::new()
                .app_data(model)
                .app_data(catalog)
                .route("/products/symptom-checker", web::post().to(symptom_checker)),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/products/symptom-checker")
            .set_json(serde_json::json!({ "symptoms": "" }))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_import_body_shapes() {
        let bare: ProductBatch = serde_json::from_str(r#"[{"name": "A"}, {"name": "B"}]"#).unwrap();
        assert_eq!(bare.into_items().len(), 2);

        let wrapped: ProductBatch =
            serde_json::from_str(r#"{"products": [{"name": "A", "dossage": "1/day"}]}"#).unwrap();
        let items = wrapped.into_items();
        assert_eq!(items[0].dosage.as_deref(), Some("1/day"));
    }
}
