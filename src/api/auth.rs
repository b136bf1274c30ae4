use actix_web::{web, HttpResponse, ResponseError};
use crate::{database::MongoDB, middleware::auth::Claims, models::UserInfo, services::auth_service};
use crate::services::auth_service::{JwtKeys, LoginRequest, SignupRequest, TokenResponse};

#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "User created, token issued", body = TokenResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "User already exists")
    )
)]
pub async fn signup(
    db: web::Data<MongoDB>,
    keys: web::Data<JwtKeys>,
    request: web::Json<SignupRequest>,
) -> HttpResponse {
    log::info!("📝 POST /auth/signup - email: {}", request.email);

    match auth_service::signup(&db, &keys, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::warn!("❌ Signup failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    keys: web::Data<JwtKeys>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&db, &keys, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Missing or invalid token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(db: web::Data<MongoDB>, claims: web::ReqData<Claims>) -> HttpResponse {
    log::info!("👤 GET /auth/me - user: {}", claims.email);

    match auth_service::get_current_user(&db, &claims.sub).await {
        Ok(user) => HttpResponse::Ok().json(user),
        Err(e) => e.error_response(),
    }
}
