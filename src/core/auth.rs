use std::sync::OnceLock;

use axum::{extract::Request, middleware::Next, response::Response};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::core::app_error::AppError;

/// Bearer-token claims issued by the directory's auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id (user or staff id), stringified per JWT convention.
    pub sub: String,
    pub role: Role,
    /// Branch assignment for staff; `None` means company-wide.
    pub branch_id: Option<i32>,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Staff,
}

fn decoding_key() -> &'static DecodingKey {
    static KEY: OnceLock<DecodingKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "dev-secret-change-in-production".to_string());
        DecodingKey::from_secret(secret.as_bytes())
    })
}

pub fn decode_token(token: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, decoding_key(), &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
}

fn bearer_claims(req: &Request) -> Result<Claims, AppError> {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    decode_token(token)
}

fn principal_id(claims: &Claims) -> Result<i32, AppError> {
    claims.sub.parse().map_err(|_| AppError::Unauthorized)
}

/// Route layer for customer-facing routes. Inserts the authenticated user id
/// as an `Extension<i32>`.
pub async fn customers_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let claims = bearer_claims(&req)?;
    if claims.role != Role::Customer {
        return Err(AppError::ForbiddenResource(
            "Customer account required".into(),
        ));
    }
    let user_id = principal_id(&claims)?;
    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

/// Route layer for staff-facing routes. Inserts the authenticated staff id
/// as an `Extension<i32>`.
pub async fn staff_authorization(mut req: Request, next: Next) -> Result<Response, AppError> {
    let claims = bearer_claims(&req)?;
    if claims.role != Role::Staff {
        return Err(AppError::ForbiddenResource("Staff account required".into()));
    }
    let staff_id = principal_id(&claims)?;
    req.extensions_mut().insert(staff_id);
    Ok(next.run(req).await)
}

/// Used by the notification channel, where the token arrives as a query
/// parameter instead of a header.
pub fn decode_staff_token(token: &str) -> Result<i32, AppError> {
    let claims = decode_token(token)?;
    if claims.role != Role::Staff {
        return Err(AppError::ForbiddenResource("Staff account required".into()));
    }
    principal_id(&claims)
}
