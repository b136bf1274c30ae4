use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Supplement Catalog API",
        version = "1.0.0",
        description = "Supplement catalog with JWT authentication and AI-assisted product discovery.\n\n**Authentication:** product listing, lookup and import require a JWT Bearer token obtained from `/auth/signup` or `/auth/login`.\n\n**AI endpoints** gate every query with a relevancy check before searching the catalog."
    ),
    paths(
        // Auth
        crate::api::auth::signup,
        crate::api::auth::login,
        crate::api::auth::get_me,

        // Health
        crate::api::health::health_check,

        // Products
        crate::api::products::list_products,
        crate::api::products::get_product,
        crate::api::products::import_products,

        // AI
        crate::api::products::ai_search,
        crate::api::products::chat,
        crate::api::products::symptom_checker,

        // Speech
        crate::api::speech::speech_to_text,
    ),
    components(
        schemas(
            crate::services::auth_service::SignupRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::TokenResponse,
            crate::models::UserInfo,
            crate::api::health::HealthResponse,
            crate::models::ProductResponse,
            crate::models::ProductPage,
            crate::models::NewProduct,
            crate::models::ProductBatch,
            crate::models::Relevancy,
            crate::models::Recommendation,
            crate::models::AiSearchResponse,
            crate::models::ChatRequest,
            crate::models::ChatResponse,
            crate::models::SymptomCheckRequest,
            crate::models::SymptomCheckResponse,
            crate::api::speech::AudioUpload,
            crate::api::speech::TranscriptionResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Email/password signup and login issuing JWT access tokens."),
        (name = "Health", description = "Liveness and database connectivity."),
        (name = "Products", description = "Catalog listing, title and text search, lookup by id, bulk import."),
        (name = "AI", description = "Natural-language search, chat recommendations and symptom checker."),
        (name = "Speech", description = "Audio upload transcribed to text."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/signup",
            "/auth/login",
            "/products",
            "/products/{id}",
            "/products/ai-search",
            "/products/symptom-checker",
            "/speech/speech-to-text",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
