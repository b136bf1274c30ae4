use crate::{
    database::{MongoDB, PRODUCTS},
    models::{NewProduct, Product, ProductPage, ProductResponse},
    utils::{text::literal_pattern, AppError},
};
use async_trait::async_trait;
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use mongodb::Cursor;
use std::future::IntoFuture;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;
pub const MAX_LIMIT: u64 = 100;
pub const SEARCH_CAP: i64 = 50;

/// Fields matched by the free-text search
const TEXT_FIELDS: [&str; 3] = ["name", "description", "ingredients"];
/// Fields matched by keyword filters built from model output
const KEYWORD_FIELDS: [&str; 4] = ["ingredients", "category", "name", "description"];

/// Page/limit after defaulting and clamping raw query values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>, default: u64| {
            raw.and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };

        Self {
            page: parse(page, DEFAULT_PAGE),
            limit: parse(limit, DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Read side of the catalog used by the AI pipeline
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Products matching any keyword in any of the keyword fields, capped at 50.
    async fn find_by_keywords(&self, keywords: &[String]) -> Result<Vec<Product>, AppError>;

    /// First `limit` products, in natural order.
    async fn inventory(&self, limit: u64) -> Result<Vec<Product>, AppError>;
}

/// `{ field: { $regex: pattern, $options: "i" } }`
fn field_regex(field: &str, pattern: &str) -> Document {
    let mut clause = Document::new();
    clause.insert(field, doc! { "$regex": pattern, "$options": "i" });
    clause
}

pub fn title_filter(title: &str) -> Document {
    field_regex("name", &literal_pattern(title))
}

pub fn text_filter(q: &str) -> Document {
    let pattern = literal_pattern(q);
    let clauses: Vec<Document> = TEXT_FIELDS
        .iter()
        .map(|field| field_regex(field, &pattern))
        .collect();

    doc! { "$or": clauses }
}

/// `$or` of every (keyword, field) pair; None when there is nothing to match.
pub fn keyword_filter(keywords: &[String]) -> Option<Document> {
    let clauses: Vec<Document> = keywords
        .iter()
        .map(|k| literal_pattern(k))
        .filter(|k| !k.is_empty())
        .flat_map(|pattern| {
            KEYWORD_FIELDS
                .iter()
                .map(move |field| field_regex(field, &pattern))
        })
        .collect();

    if clauses.is_empty() {
        None
    } else {
        Some(doc! { "$or": clauses })
    }
}

async fn collect_products(mut cursor: Cursor<Product>) -> Vec<Product> {
    let mut products = Vec::new();

    while let Some(result) = cursor.next().await {
        match result {
            Ok(product) => products.push(product),
            Err(e) => log::error!("Error reading product: {}", e),
        }
    }

    products
}

fn to_responses(products: Vec<Product>) -> Vec<ProductResponse> {
    products.into_iter().map(ProductResponse::from).collect()
}

pub async fn find_by_filter(
    db: &MongoDB,
    filter: Document,
    limit: Option<i64>,
) -> Result<Vec<Product>, AppError> {
    let collection = db.collection::<Product>(PRODUCTS);

    let mut find = collection.find(filter);
    if let Some(limit) = limit {
        find = find.limit(limit);
    }

    let cursor = find.await?;
    Ok(collect_products(cursor).await)
}

pub async fn find_by_title(db: &MongoDB, title: &str) -> Result<ProductPage, AppError> {
    let products = find_by_filter(db, title_filter(title), None).await?;
    Ok(ProductPage::single(to_responses(products)))
}

pub async fn search_by_text(db: &MongoDB, q: &str) -> Result<ProductPage, AppError> {
    let products = find_by_filter(db, text_filter(q), Some(SEARCH_CAP)).await?;
    Ok(ProductPage::single(to_responses(products)))
}

/// Page query and total count run concurrently.
pub async fn find_all(db: &MongoDB, pagination: Pagination) -> Result<ProductPage, AppError> {
    let collection = db.collection::<Product>(PRODUCTS);

    let page_query = async {
        let cursor = collection
            .find(doc! {})
            .skip(pagination.skip())
            .limit(pagination.limit as i64)
            .await?;
        Ok::<_, mongodb::error::Error>(collect_products(cursor).await)
    };
    let count_query = collection.count_documents(doc! {}).into_future();

    let (products, total) = futures::try_join!(page_query, count_query)?;

    Ok(ProductPage {
        items: to_responses(products),
        total,
        page: pagination.page,
        limit: pagination.limit,
    })
}

pub async fn find_by_id(db: &MongoDB, id: &str) -> Result<ProductResponse, AppError> {
    let object_id = ObjectId::parse_str(id)
        .map_err(|_| AppError::InvalidRequest(format!("Invalid product id: {}", id)))?;

    db.collection::<Product>(PRODUCTS)
        .find_one(doc! { "_id": object_id })
        .await?
        .map(ProductResponse::from)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

/// Validates and inserts a batch of products. Returns the number inserted.
pub async fn create_many(db: &MongoDB, items: Vec<NewProduct>) -> Result<u64, AppError> {
    if items.is_empty() {
        return Err(AppError::InvalidRequest("No products provided".to_string()));
    }

    if let Some(position) = items.iter().position(|item| item.name.trim().is_empty()) {
        return Err(AppError::InvalidRequest(format!(
            "Product at index {} has no name",
            position
        )));
    }

    let now = BsonDateTime::now();
    let products: Vec<Product> = items.into_iter().map(|item| item.into_product(now)).collect();

    let result = db
        .collection::<Product>(PRODUCTS)
        .insert_many(&products)
        .await?;

    Ok(result.inserted_ids.len() as u64)
}

pub async fn count(db: &MongoDB) -> Result<u64, AppError> {
    Ok(db.collection::<Product>(PRODUCTS).count_documents(doc! {}).await?)
}

#[async_trait]
impl ProductCatalog for MongoDB {
    async fn find_by_keywords(&self, keywords: &[String]) -> Result<Vec<Product>, AppError> {
        match keyword_filter(keywords) {
            Some(filter) => find_by_filter(self, filter, Some(SEARCH_CAP)).await,
            None => Ok(Vec::new()),
        }
    }

    async fn inventory(&self, limit: u64) -> Result<Vec<Product>, AppError> {
        let cursor = self
            .collection::<Product>(PRODUCTS)
            .find(doc! {})
            .limit(limit as i64)
            .await?;
        Ok(collect_products(cursor).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(Pagination::from_query(None, None), Pagination { page: 1, limit: 20 });
        assert_eq!(
            Pagination::from_query(Some("abc"), Some("-5")),
            Pagination { page: 1, limit: 20 }
        );
        assert_eq!(
            Pagination::from_query(Some("0"), Some("0")),
            Pagination { page: 1, limit: 20 }
        );
    }

    #[test]
    fn test_pagination_skip_and_cap() {
        let p = Pagination::from_query(Some("3"), Some("10"));
        assert_eq!(p.skip(), 20);

        let p = Pagination::from_query(Some("2"), Some("1000"));
        assert_eq!(p.limit, MAX_LIMIT);
        assert_eq!(p.skip(), MAX_LIMIT);
    }

    #[test]
    fn test_title_filter_is_case_insensitive_literal() {
        let filter = title_filter("Vitamin C+");
        let name = filter.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), r"Vitamin C\+");
        assert_eq!(name.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_text_filter_covers_three_fields() {
        let filter = text_filter("zinc");
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 3);

        let fields: Vec<String> = clauses
            .iter()
            .map(|c| c.as_document().unwrap().keys().next().unwrap().clone())
            .collect();
        assert_eq!(fields, vec!["name", "description", "ingredients"]);
    }

    #[test]
    fn test_keyword_filter() {
        let keywords = vec!["calcium".to_string(), "  ".to_string(), "joint support".to_string()];
        let filter = keyword_filter(&keywords).unwrap();
        let clauses = filter.get_array("$or").unwrap();
        // Blank keywords are dropped; 2 keywords x 4 fields
        assert_eq!(clauses.len(), 8);

        let first = clauses[0].as_document().unwrap();
        let ingredients = first.get_document("ingredients").unwrap();
        assert_eq!(ingredients.get_str("$regex").unwrap(), "calcium");
        assert_eq!(ingredients.get_str("$options").unwrap(), "i");

        assert!(keyword_filter(&[]).is_none());
        assert!(keyword_filter(&["".to_string()]).is_none());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_pagination_total_matches_count() {
        dotenv::dotenv().ok();
        let config = crate::utils::AppConfig::from_env().unwrap();
        let db = MongoDB::new(&config.mongodb_uri, &config.mongodb_database).await.unwrap();

        let page = find_all(&db, Pagination { page: 1, limit: 5 }).await.unwrap();
        assert_eq!(page.total, count(&db).await.unwrap());
        assert!(page.items.len() as u64 <= 5);
    }
}
