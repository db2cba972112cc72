use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::user::normalize_email;

#[derive(Debug, Clone)]
pub struct SubscriberView {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SupportMessageView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A contact-form submission, validated.
#[derive(Debug, Clone)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactInput {
    pub fn new(name: &str, email: &str, message: &str) -> Result<Self, DomainError> {
        let name = name.trim();
        let message = message.trim();
        if name.is_empty() || message.is_empty() {
            return Err(DomainError::InvalidInput(
                "name and message are required".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            email: normalize_email(email)?,
            message: message.to_string(),
        })
    }
}

/// Newsletter export as CSV with an `email,subscribed_at` header.
pub fn subscribers_csv(subscribers: &[SubscriberView]) -> String {
    let mut out = String::from("email,subscribed_at\n");
    for s in subscribers {
        out.push_str(&csv_field(&s.email));
        out.push(',');
        out.push_str(&s.created_at.to_rfc3339());
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn contact_input_is_trimmed_and_validated() {
        let input = ContactInput::new(" Ana ", "ANA@example.com", " Olá! ").unwrap();
        assert_eq!(input.name, "Ana");
        assert_eq!(input.email, "ana@example.com");
        assert_eq!(input.message, "Olá!");

        assert!(ContactInput::new("", "ana@example.com", "oi").is_err());
        assert!(ContactInput::new("Ana", "not-an-email", "oi").is_err());
    }

    #[test]
    fn csv_has_header_and_escapes_fields() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let csv = subscribers_csv(&[
            SubscriberView {
                id: Uuid::new_v4(),
                email: "ana@example.com".to_string(),
                created_at: at,
            },
            SubscriberView {
                id: Uuid::new_v4(),
                email: "odd,\"name\"@example.com".to_string(),
                created_at: at,
            },
        ]);

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "email,subscribed_at");
        assert_eq!(lines[1], "ana@example.com,2026-03-01T12:00:00+00:00");
        assert!(lines[2].starts_with("\"odd,\"\"name\"\"@example.com\","));
    }
}
