use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, DateTime as BsonDateTime};

/// Document in the "products" collection
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Product {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub ingredients: Option<String>,
    // Older imports spell it "dossage"
    #[serde(default, alias = "dossage")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<BsonDateTime>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<BsonDateTime>,
}

/// Accepts strings, numbers and string arrays (joined with ", ").
fn deserialize_loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Bson::deserialize(deserializer)?;
    match value {
        Bson::Null | Bson::Undefined => Ok(None),
        Bson::String(s) => Ok(Some(s)),
        Bson::Double(n) => Ok(Some(n.to_string())),
        Bson::Int32(n) => Ok(Some(n.to_string())),
        Bson::Int64(n) => Ok(Some(n.to_string())),
        Bson::Array(items) => {
            let parts: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    Bson::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            Ok(Some(parts.join(", ")))
        }
        _ => Err(serde::de::Error::custom("Expected string, number or array of strings")),
    }
}

impl Product {
    /// Multi-line summary used to ground model prompts.
    pub fn inventory_summary(&self) -> String {
        format!(
            "Name: {}\nBrand: {}\nCategory: {}\nDescription: {}\nIngredients: {}\nDosage: {}\nPrice: {}",
            self.name,
            self.brand.as_deref().unwrap_or(""),
            self.category.as_deref().unwrap_or(""),
            self.description.as_deref().unwrap_or(""),
            self.ingredients.as_deref().unwrap_or(""),
            self.dosage.as_deref().unwrap_or(""),
            self.price.as_deref().unwrap_or(""),
        )
    }
}

/// Product as returned over HTTP (`_id` as hex string)
#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
pub struct ProductResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub ingredients: Option<String>,
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: product.name,
            category: product.category,
            brand: product.brand,
            description: product.description,
            price: product.price,
            ingredients: product.ingredients,
            dosage: product.dosage,
            created_at: product
                .created_at
                .and_then(|dt| dt.try_to_rfc3339_string().ok()),
        }
    }
}

/// Item accepted by the bulk import
#[derive(Debug, Deserialize, Clone, utoipa::ToSchema)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    #[schema(value_type = Option<String>)]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_string")]
    #[schema(value_type = Option<String>)]
    pub ingredients: Option<String>,
    #[serde(default, alias = "dossage")]
    pub dosage: Option<String>,
}

impl NewProduct {
    pub fn into_product(self, now: BsonDateTime) -> Product {
        Product {
            id: None,
            name: self.name.trim().to_string(),
            category: self.category,
            brand: self.brand,
            description: self.description,
            price: self.price,
            ingredients: self.ingredients,
            dosage: self.dosage,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Bulk payload: a bare array or `{ "products": [...] }`.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum ProductBatch {
    List(Vec<NewProduct>),
    Wrapped { products: Vec<NewProduct> },
}

impl ProductBatch {
    pub fn into_items(self) -> Vec<NewProduct> {
        match self {
            ProductBatch::List(items) => items,
            ProductBatch::Wrapped { products } => products,
        }
    }
}

/// Paginated or search listing
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProductPage {
    pub items: Vec<ProductResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl ProductPage {
    /// Shape used by title/text search: a single page holding every hit.
    pub fn single(items: Vec<ProductResponse>) -> Self {
        let count = items.len() as u64;
        Self {
            items,
            total: count,
            page: 1,
            limit: count,
        }
    }
}
