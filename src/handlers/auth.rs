use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{
    expired_session_cookie, generate_session_token, hash_password, session_cookie,
    token_from_request, verify_password, CurrentUser, SESSION_TTL_DAYS,
};
use crate::config::Config;
use crate::domain::errors::DomainError;
use crate::domain::user::{normalize_email, Role, UserView};
use crate::errors::AppError;
use crate::infrastructure::user_repo::DieselUserRepository;

pub type Users = web::Data<DieselUserRepository>;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// `CUSTOMER` or `ADMIN`
    pub role: String,
}

impl From<UserView> for UserResponse {
    fn from(u: UserView) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Same value as the `session` cookie, for `Authorization: Bearer` clients
    pub token: String,
    pub expires_at: String,
    pub user: UserResponse,
}

/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Missing name, bad e-mail or short password"),
        (status = 409, description = "E-mail already registered"),
    ),
    tag = "auth"
)]
pub async fn register(users: Users, body: web::Json<RegisterRequest>) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    let email = normalize_email(&body.email)?;
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must have at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user = web::block(move || {
        let hash = hash_password(&body.password)?;
        users.create(&name, &email, &hash, Role::Customer)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    log::info!("User {} registered", user.id);
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// POST /api/auth/login
///
/// Starts a session, returned both as the `session` cookie and in the body.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Unknown e-mail or wrong password"),
    ),
    tag = "auth"
)]
pub async fn login(
    users: Users,
    config: web::Data<Config>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let Ok(email) = normalize_email(&body.email) else {
        return Err(AppError::Unauthorized);
    };
    let token = generate_session_token();
    let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);

    let session_token = token.clone();
    let user = web::block(move || {
        let Some((user, hash)) = users.find_credentials(&email)? else {
            return Ok(None);
        };
        if !verify_password(&body.password, &hash) {
            return Ok(None);
        }
        users.create_session(&session_token, user.id, expires_at)?;
        Ok::<_, DomainError>(Some(user))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let Some(user) = user else {
        log::info!("Failed sign-in attempt");
        return Err(AppError::Unauthorized);
    };

    log::info!("User {} signed in", user.id);
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&token, config.secure_cookies))
        .json(LoginResponse {
            token,
            expires_at: expires_at.to_rfc3339(),
            user: UserResponse::from(user),
        }))
}

/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Session ended; cookie cleared")),
    tag = "auth"
)]
pub async fn logout(req: HttpRequest, users: Users) -> Result<HttpResponse, AppError> {
    if let Some(token) = token_from_request(&req) {
        web::block(move || users.delete_session(&token))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;
    }

    Ok(HttpResponse::NoContent()
        .cookie(expired_session_cookie())
        .finish())
}

/// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The signed-in user", body = UserResponse),
        (status = 401, description = "Not signed in"),
    ),
    tag = "auth"
)]
pub async fn me(user: CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse::from(user.0))
}
