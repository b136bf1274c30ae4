mod api;
mod database;
mod middleware;
mod models;
mod seeds;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::auth::AuthMiddleware;
use crate::services::{
    auth_service::JwtKeys, gemini_service::GeminiClient, speech_service::WhisperClient,
    ProductCatalog, TextModel, Transcriber,
};
use crate::utils::{AppConfig, AppError};

/// JSON bodies up to the upload limit so bulk imports fit.
const JSON_BODY_LIMIT: usize = 10 * 1024 * 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    log::info!("🚀 Starting Supplement Catalog...");
    log::info!("📊 Database: {}", config.mongodb_database);

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&config.mongodb_uri, &config.mongodb_database)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to connect to MongoDB: {}", e)))?;

    log::info!("✅ MongoDB connected successfully");

    // 🌱 Seed the catalog on first boot
    seeds::products_seed::seed_products(&db, config.products_seed_file.as_deref()).await;

    let db_data = web::Data::new(db);
    let catalog: Arc<dyn ProductCatalog> = db_data.clone().into_inner();
    let catalog_data: web::Data<dyn ProductCatalog> = web::Data::from(catalog);

    let model: Arc<dyn TextModel> = Arc::new(GeminiClient::from_config(&config));
    let model_data: web::Data<dyn TextModel> = web::Data::from(model);

    let transcriber = WhisperClient::from_config(&config)
        .map(|client| Arc::new(client) as Arc<dyn Transcriber>);
    let speech_data = web::Data::new(api::speech::SpeechState {
        transcriber,
        upload_dir: PathBuf::from(&config.upload_dir),
    });

    let jwt_data = web::Data::new(JwtKeys::from_config(&config));

    let host = config.host.clone();
    let port = config.port;

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI document at: http://{}:{}/api-docs/openapi.json", host, port);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let json_config = web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into());

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(db_data.clone())
            .app_data(jwt_data.clone())
            .app_data(catalog_data.clone())
            .app_data(model_data.clone())
            .app_data(speech_data.clone())
            .app_data(json_config)
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))
            // Auth endpoints
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(api::auth::signup))
                    .route("/login", web::post().to(api::auth::login))
                    .service(
                        web::resource("/me")
                            .wrap(AuthMiddleware)
                            .route(web::get().to(api::auth::get_me))
                    )
            )
            // Products: AI endpoints are public, catalog access requires JWT
            .service(
                web::scope("/products")
                    .route("/ai-search", web::get().to(api::products::ai_search))
                    .route("/chat", web::post().to(api::products::chat))
                    .route("/symptom-checker", web::post().to(api::products::symptom_checker))
                    .service(
                        web::resource("")
                            .wrap(AuthMiddleware)
                            .route(web::get().to(api::products::list_products))
                    )
                    .service(
                        web::resource("/import")
                            .wrap(AuthMiddleware)
                            .route(web::post().to(api::products::import_products))
                    )
                    // Must stay last (catch-all)
                    .service(
                        web::resource("/{id}")
                            .wrap(AuthMiddleware)
                            .route(web::get().to(api::products::get_product))
                    )
            )
            // Speech
            .service(
                web::scope("/speech")
                    .route("/speech-to-text", web::post().to(api::speech::speech_to_text))
            )
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
