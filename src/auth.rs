//! Session authentication and the route gate.
//!
//! Handlers opt in by taking [`CurrentUser`] (any signed-in user) or
//! [`AdminUser`] as an argument. Rejections answer `/api/*` requests with
//! 401/403 and redirect page requests instead.

use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    http::{header, StatusCode},
    web, FromRequest, HttpRequest, HttpResponse, ResponseError,
};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use futures::future::LocalBoxFuture;
use rand::Rng;
use serde_json::json;
use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::domain::user::UserView;
use crate::infrastructure::user_repo::DieselUserRepository;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_TTL_DAYS: i64 = 30;

// ── Passwords and tokens ─────────────────────────────────────────────────────

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, DomainError> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| DomainError::Internal(format!("salt encoding failed: {e}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Opaque 256-bit session token, hex encoded.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

pub fn session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::days(SESSION_TTL_DAYS))
        .finish()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Session token from `Authorization: Bearer …` or the `session` cookie.
pub fn token_from_request(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    bearer.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
    })
}

// ── Extractors ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AuthRejection {
    #[error("Authentication required")]
    Unauthenticated { api: bool },

    #[error("Forbidden")]
    Forbidden { api: bool },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AuthRejection {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated { api: true } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { api: true } => StatusCode::FORBIDDEN,
            Self::Unauthenticated { api: false } | Self::Forbidden { api: false } => {
                StatusCode::FOUND
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::Unauthenticated { api: false } => HttpResponse::Found()
                .insert_header((header::LOCATION, "/login"))
                .finish(),
            Self::Forbidden { api: false } => HttpResponse::Found()
                .insert_header((header::LOCATION, "/"))
                .finish(),
            Self::Internal(msg) => {
                log::error!("Session lookup failed: {}", msg);
                HttpResponse::InternalServerError()
                    .json(json!({ "error": "Internal server error" }))
            }
            other => HttpResponse::build(other.status_code())
                .json(json!({ "error": other.to_string() })),
        }
    }
}

fn is_api(req: &HttpRequest) -> bool {
    req.path().starts_with("/api/")
}

/// Any user with a live session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserView);

/// A signed-in user with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserView);

async fn resolve_user(req: HttpRequest) -> Result<UserView, AuthRejection> {
    let api = is_api(&req);
    let token = token_from_request(&req).ok_or(AuthRejection::Unauthenticated { api })?;
    let repo = req
        .app_data::<web::Data<DieselUserRepository>>()
        .cloned()
        .ok_or_else(|| AuthRejection::Internal("user repository not registered".to_string()))?;

    let user = web::block(move || repo.find_session_user(&token, chrono::Utc::now()))
        .await
        .map_err(|e| AuthRejection::Internal(e.to_string()))?
        .map_err(|e| AuthRejection::Internal(e.to_string()))?;

    user.ok_or(AuthRejection::Unauthenticated { api })
}

impl FromRequest for CurrentUser {
    type Error = AuthRejection;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { resolve_user(req).await.map(CurrentUser) })
    }
}

impl FromRequest for AdminUser {
    type Error = AuthRejection;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let api = is_api(&req);
            let user = resolve_user(req).await?;
            if !user.is_admin() {
                return Err(AuthRejection::Forbidden { api });
            }
            Ok(AdminUser(user))
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("segredo123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("segredo123", &hash));
        assert!(!verify_password("errado", &hash));
        assert!(!verify_password("segredo123", "not-a-hash"));
    }

    #[test]
    fn session_tokens_are_random_hex() {
        let a = generate_session_token();
        let b = generate_session_token();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn token_prefers_bearer_then_cookie() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc"))
            .cookie(Cookie::new(SESSION_COOKIE, "from-cookie"))
            .to_http_request();
        assert_eq!(token_from_request(&req).as_deref(), Some("abc"));

        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "from-cookie"))
            .to_http_request();
        assert_eq!(token_from_request(&req).as_deref(), Some("from-cookie"));

        assert!(token_from_request(&TestRequest::default().to_http_request()).is_none());
    }

    #[test]
    fn api_rejections_use_status_codes() {
        let resp = AuthRejection::Unauthenticated { api: true }.error_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = AuthRejection::Forbidden { api: true }.error_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn page_rejections_redirect() {
        let resp = AuthRejection::Unauthenticated { api: false }.error_response();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");

        let resp = AuthRejection::Forbidden { api: false }.error_response();
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");
    }

    #[actix_web::test]
    async fn missing_token_is_rejected_before_touching_the_store() {
        let req = TestRequest::default().uri("/api/orders/mine").to_http_request();

        let err = CurrentUser::extract(&req).await.unwrap_err();

        assert!(matches!(err, AuthRejection::Unauthenticated { api: true }));
    }
}
