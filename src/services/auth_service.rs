use crate::{
    database::{MongoDB, USERS},
    models::{User, UserInfo},
    utils::{AppConfig, AppError},
};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

const BCRYPT_COST: u32 = 10;
const INVALID_CREDENTIALS: &str = "Invalid credentials";

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,           // user _id (hex)
    pub email: String,
    pub iat: usize,            // issued at
    pub exp: usize,            // expiration
}

/// Signing material shared by the token issuer and the auth middleware
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expires_hours: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, expires_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expires_hours,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_expires_hours)
    }
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
}

// Generate JWT token
pub fn generate_jwt(keys: &JwtKeys, user_id: &str, email: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(keys.expires_hours)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|e| AppError::UpstreamError(format!("Failed to generate token: {}", e)))
}

// Verify JWT token
pub fn verify_token(keys: &JwtKeys, token: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &keys.decoding, &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, BCRYPT_COST)
        .map_err(|e| AppError::UpstreamError(format!("Failed to hash password: {}", e)))
}

/// Constant-time bcrypt comparison; a malformed hash counts as a mismatch.
pub fn check_password(plain: &str, hashed: &str) -> bool {
    verify(plain, hashed).unwrap_or(false)
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidRequest("A valid email is required".to_string()));
    }
    Ok(email.to_string())
}

fn require_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::InvalidRequest("Password is required".to_string()));
    }
    Ok(())
}

pub async fn find_by_email(db: &MongoDB, email: &str) -> Result<Option<User>, AppError> {
    let collection = db.collection::<User>(USERS);
    Ok(collection.find_one(doc! { "email": email }).await?)
}

// User signup
pub async fn signup(
    db: &MongoDB,
    keys: &JwtKeys,
    request: &SignupRequest,
) -> Result<TokenResponse, AppError> {
    let email = normalize_email(&request.email)?;
    require_password(&request.password)?;

    if find_by_email(db, &email).await?.is_some() {
        return Err(AppError::Unauthorized("User already exists".to_string()));
    }

    let new_user = User {
        id: Some(ObjectId::new()),
        email: email.clone(),
        password: hash_password(&request.password)?,
        name: request.name.clone().filter(|n| !n.trim().is_empty()),
        created_at: Some(BsonDateTime::now()),
    };

    db.collection::<User>(USERS).insert_one(&new_user).await?;

    let user_id = new_user.id.map(|id| id.to_hex()).unwrap_or_default();
    log::info!("✅ User registered: {}", email);

    Ok(TokenResponse {
        access_token: generate_jwt(keys, &user_id, &email)?,
    })
}

// User login
pub async fn login(
    db: &MongoDB,
    keys: &JwtKeys,
    request: &LoginRequest,
) -> Result<TokenResponse, AppError> {
    let email = normalize_email(&request.email)?;
    require_password(&request.password)?;

    let user = find_by_email(db, &email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !check_password(&request.password, &user.password) {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let user_id = user.id.map(|id| id.to_hex()).unwrap_or_default();

    Ok(TokenResponse {
        access_token: generate_jwt(keys, &user_id, &user.email)?,
    })
}

// Get current user
pub async fn get_current_user(db: &MongoDB, user_id: &str) -> Result<UserInfo, AppError> {
    let object_id = ObjectId::parse_str(user_id)
        .map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;

    let user = db
        .collection::<User>(USERS)
        .find_one(doc! { "_id": object_id })
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(UserInfo::from(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new("test-secret", 1)
    }

    #[test]
    fn test_token_round_trip() {
        let token = generate_jwt(&keys(), "65f0c0ffee", "ana@example.com").unwrap();
        let claims = verify_token(&keys(), &token).unwrap();
        assert_eq!(claims.sub, "65f0c0ffee");
        assert_eq!(claims.email, "ana@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = generate_jwt(&JwtKeys::new("other", 1), "id", "a@b.c").unwrap();
        let err = verify_token(&keys(), &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Past the default 60s leeway
        let token = generate_jwt(&JwtKeys::new("test-secret", -1), "id", "a@b.c").unwrap();
        assert!(verify_token(&keys(), &token).is_err());
    }

    #[test]
    fn test_password_check() {
        let hashed = hash_password("s3cret").unwrap();
        assert_ne!(hashed, "s3cret");
        assert!(check_password("s3cret", &hashed));
        assert!(!check_password("wrong", &hashed));
        assert!(!check_password("s3cret", "not-a-bcrypt-hash"));
    }

    #[test]
    fn test_email_validation() {
        assert_eq!(normalize_email("  ana@example.com ").unwrap(), "ana@example.com");
        assert_eq!(normalize_email("Ana@Example.com").unwrap(), "Ana@Example.com");
        assert!(normalize_email("").is_err());
        assert!(normalize_email("no-at-sign").is_err());
        assert!(require_password("").is_err());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_signup_then_login() {
        dotenv::dotenv().ok();
        let config = AppConfig::from_env().unwrap();
        let db = MongoDB::new(&config.mongodb_uri, &config.mongodb_database).await.unwrap();
        let email = format!("{}@example.com", uuid::Uuid::new_v4());

        let signup_request = SignupRequest {
            email: email.clone(),
            password: "pw-123".into(),
            name: Some("Test".into()),
        };
        assert!(signup(&db, &keys(), &signup_request).await.is_ok());
        assert!(signup(&db, &keys(), &signup_request).await.is_err());

        let good = LoginRequest { email: email.clone(), password: "pw-123".into() };
        assert!(login(&db, &keys(), &good).await.is_ok());

        let bad = LoginRequest { email, password: "nope".into() };
        assert!(matches!(login(&db, &keys(), &bad).await, Err(AppError::Unauthorized(_))));
    }
}
