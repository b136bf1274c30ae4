use std::path::Path;

use crate::database::MongoDB;
use crate::models::{NewProduct, ProductBatch};
use crate::services::product_service;

/// Seeds the catalog from a JSON file (bare array or `{ "products": [...] }`).
/// Only runs when the products collection is empty.
pub async fn seed_products(db: &MongoDB, seed_file: Option<&str>) {
    let Some(seed_file) = seed_file else {
        log::info!("📋 Products: PRODUCTS_SEED_FILE not set - skipping seed");
        return;
    };

    let count = match product_service::count(db).await {
        Ok(count) => count,
        Err(e) => {
            log::error!("   ❌ Failed to count products before seeding: {}", e);
            return;
        }
    };

    if count > 0 {
        log::info!("📋 Products: {} already in DB - skipping seed", count);
        return;
    }

    let items = match load_seed_file(Path::new(seed_file)).await {
        Ok(items) => items,
        Err(e) => {
            log::error!("   ❌ Failed to read seed file {}: {}", seed_file, e);
            return;
        }
    };

    log::info!("📋 Products: seeding {} products from {}...", items.len(), seed_file);

    match product_service::create_many(db, items).await {
        Ok(inserted) => log::info!("   ✅ Inserted {} products into products collection", inserted),
        Err(e) => log::error!("   ❌ Failed to seed products: {}", e),
    }
}

async fn load_seed_file(path: &Path) -> Result<Vec<NewProduct>, String> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| e.to_string())?;
    let batch: ProductBatch = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
    Ok(batch.into_items())
}
