use std::env;

const DEFAULT_JWT_SECRET: &str = "default-secret-change-me";

/// Runtime configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub jwt_secret: String,
    pub jwt_expires_hours: i64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub upload_dir: String,
    pub products_seed_file: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mongodb_uri = get("MONGODB_URI").ok_or_else(|| "MONGODB_URI must be set".to_string())?;

        let port = match get("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|e| format!("Invalid PORT value '{}': {}", p, e))?,
            None => 4000,
        };

        let jwt_expires_hours = match get("JWT_EXPIRES_HOURS") {
            Some(h) => h
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| format!("Invalid JWT_EXPIRES_HOURS value '{}'", h))?,
            None => 24,
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            log::warn!("⚠️  JWT_SECRET not set, using insecure development default");
            DEFAULT_JWT_SECRET.to_string()
        });

        let mongodb_database = get("MONGODB_DATABASE")
            .or_else(|| database_from_uri(&mongodb_uri))
            .unwrap_or_else(|| "supplements".to_string());

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            mongodb_uri,
            mongodb_database,
            jwt_secret,
            jwt_expires_hours,
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            openai_api_key: get("OPENAI_API_KEY"),
            upload_dir: get("UPLOAD_DIR").unwrap_or_else(|| "/tmp/uploads".to_string()),
            products_seed_file: get("PRODUCTS_SEED_FILE"),
        })
    }
}

/// Extracts the database name from a `mongodb://host/dbname?opts` URI.
fn database_from_uri(uri: &str) -> Option<String> {
    let without_scheme = uri.split("://").nth(1)?;
    let path = without_scheme.split_once('/')?.1;
    let name = path.split('?').next()?;

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
