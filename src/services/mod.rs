pub mod assistant_service;
pub mod auth_service;
pub mod gemini_service;
pub mod product_service;
pub mod speech_service;
pub mod symptom_service;

pub use gemini_service::TextModel;
pub use product_service::ProductCatalog;
pub use speech_service::Transcriber;
