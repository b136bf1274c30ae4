use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::services::auth_service::{self, JwtKeys};
use crate::utils::AppError;

pub use crate::services::auth_service::Claims;

/// Requires a valid `Authorization: Bearer <jwt>`; verified claims are
/// available to handlers as `web::ReqData<Claims>`.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

/// Token part of a Bearer authorization header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let keys = match req.app_data::<web::Data<JwtKeys>>() {
            Some(keys) => keys.clone(),
            None => {
                log::error!("❌ JwtKeys missing from app data");
                return Box::pin(async move {
                    Err(AppError::Unavailable("Authentication not configured".to_string()).into())
                });
            }
        };

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string);

        let token = match token {
            Some(token) => token,
            None => {
                return Box::pin(async move {
                    Err(AppError::Unauthorized("Missing authorization token".to_string()).into())
                });
            }
        };

        match auth_service::verify_token(&keys, &token) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);

                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res)
                })
            }
            Err(e) => {
                log::warn!("❌ Rejected token on {}: {}", req.path(), e);
                Box::pin(async move {
                    Err(AppError::Unauthorized("Invalid or expired token".to_string()).into())
                })
            }
        }
    }
}
