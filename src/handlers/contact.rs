use actix_web::{http::header, web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::domain::contact::{subscribers_csv, ContactInput, SupportMessageView};
use crate::domain::user::normalize_email;
use crate::errors::AppError;
use crate::infrastructure::contact_repo::DieselContactRepository;

pub type Contacts = web::Data<DieselContactRepository>;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscribeResponse {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: String,
}

impl From<SupportMessageView> for MessageResponse {
    fn from(m: SupportMessageView) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            message: m.message,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

/// POST /api/newsletter
#[utoipa::path(
    post,
    path = "/api/newsletter",
    request_body = SubscribeRequest,
    responses(
        (status = 201, description = "Subscribed", body = SubscribeResponse),
        (status = 400, description = "Invalid e-mail"),
        (status = 409, description = "Already subscribed"),
    ),
    tag = "contact"
)]
pub async fn subscribe(
    contacts: Contacts,
    body: web::Json<SubscribeRequest>,
) -> Result<HttpResponse, AppError> {
    let email = normalize_email(&body.email)?;

    let subscriber = web::block(move || contacts.subscribe(&email))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(SubscribeResponse {
        id: subscriber.id,
        email: subscriber.email,
    }))
}

/// GET /api/admin/newsletter/export
#[utoipa::path(
    get,
    path = "/api/admin/newsletter/export",
    responses((status = 200, description = "Subscribers as CSV", content_type = "text/csv", body = String)),
    tag = "contact"
)]
pub async fn export_subscribers(
    _admin: AdminUser,
    contacts: Contacts,
) -> Result<HttpResponse, AppError> {
    let subscribers = web::block(move || contacts.list_subscribers())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"newsletter.csv\"",
        ))
        .body(subscribers_csv(&subscribers)))
}

/// POST /api/contact
#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message stored", body = MessageResponse),
        (status = 400, description = "Missing field or invalid e-mail"),
    ),
    tag = "contact"
)]
pub async fn send_message(
    contacts: Contacts,
    body: web::Json<ContactRequest>,
) -> Result<HttpResponse, AppError> {
    let input = ContactInput::new(&body.name, &body.email, &body.message)?;

    let message = web::block(move || contacts.create_message(&input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    log::info!("Support message {} received", message.id);
    Ok(HttpResponse::Created().json(MessageResponse::from(message)))
}

/// GET /api/admin/messages
#[utoipa::path(
    get,
    path = "/api/admin/messages",
    responses((status = 200, description = "Support messages, newest first", body = [MessageResponse])),
    tag = "contact"
)]
pub async fn list_messages(_admin: AdminUser, contacts: Contacts) -> Result<HttpResponse, AppError> {
    let messages = web::block(move || contacts.list_messages())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(
        messages
            .into_iter()
            .map(MessageResponse::from)
            .collect::<Vec<_>>(),
    ))
}
