use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::storage::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub session_ttl_hours: i64,
    pub uploads: UploadStore,
    pub max_upload_bytes: usize,
}

pub const ROLE_PATIENT: i16 = 0;
pub const ROLE_ADMIN: i16 = 1;

/* -------------------------
   Appointment status
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Declined,
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown appointment status: {0:?}")]
pub struct UnknownStatus(pub String);

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Approved,
        AppointmentStatus::Declined,
        AppointmentStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Approved => "Approved",
            AppointmentStatus::Declined => "Declined",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl TryFrom<String> for AppointmentStatus {
    type Error = UnknownStatus;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AppointmentRow {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub reason: String,
    #[sqlx(try_from = "String")]
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_picture: Option<String>,
    pub role: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SessionTokenRow {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/* -------------------------
   API DTOs
--------------------------*/

/// A user as the API exposes it. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserPublic {
    pub user_id: Uuid,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_picture: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for UserPublic {
    fn from(u: UserRow) -> Self {
        Self {
            user_id: u.user_id,
            name: display_name(&u.first_name, &u.last_name),
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            phone: u.phone,
            address: u.address,
            profile_picture: u.profile_picture,
            role: role_to_string(u.role),
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessMessage {
    pub success: bool,
    pub message: String,
}

impl SuccessMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/* -------------------------
   Helpers
--------------------------*/

pub fn role_to_string(role: i16) -> String {
    match role {
        ROLE_PATIENT => "patient",
        ROLE_ADMIN => "admin",
        _ => "unknown",
    }
    .to_string()
}

/// The one rule for a combined name: first name alone, or "first last".
pub fn display_name(first_name: &str, last_name: &str) -> String {
    if last_name.is_empty() {
        first_name.to_string()
    } else {
        format!("{first_name} {last_name}")
    }
}

/// Inverse of [`display_name`]: everything after the first space is the last name.
/// Surrounding whitespace is ignored.
pub fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (name.to_string(), String::new()),
    }
}

/// Accepts RFC 3339 or the naive forms an HTML date/datetime input sends.
/// Naive values are taken as UTC.
pub fn parse_appointment_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_status_parse_is_exact() {
        for st in AppointmentStatus::ALL {
            assert_eq!(st.as_str().parse::<AppointmentStatus>().unwrap(), st);
        }
        assert!("pending".parse::<AppointmentStatus>().is_err());
        assert!("Completed".parse::<AppointmentStatus>().is_err());
        assert!(" Approved".parse::<AppointmentStatus>().is_err());
        assert!("".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_as_plain_string() {
        let v = serde_json::to_value(AppointmentStatus::Cancelled).unwrap();
        assert_eq!(v, serde_json::json!("Cancelled"));
    }

    #[test]
    fn test_name_roundtrip() {
        for name in ["Juan Dela Cruz", "Maria", "Ana  Santos", "Jose Rizal"] {
            let (first, last) = split_name(name);
            assert_eq!(display_name(&first, &last), name);
        }
        assert_eq!(split_name("Juan Dela Cruz"), ("Juan".into(), "Dela Cruz".into()));
        assert_eq!(split_name("Maria"), ("Maria".into(), String::new()));
        assert_eq!(split_name(" Juan Dela Cruz "), ("Juan".into(), "Dela Cruz".into()));
    }

    #[test]
    fn test_display_name_without_last() {
        assert_eq!(display_name("Maria", ""), "Maria");
        assert_eq!(display_name("Maria", "Clara"), "Maria Clara");
    }

    #[test]
    fn test_parse_appointment_date_forms() {
        let rfc = parse_appointment_date("2025-03-01T09:30:00+08:00").unwrap();
        assert_eq!(rfc.hour(), 1);

        let local = parse_appointment_date("2025-03-01T09:30").unwrap();
        assert_eq!((local.day(), local.hour(), local.minute()), (1, 9, 30));

        let spaced = parse_appointment_date("2025-03-01 09:30:15").unwrap();
        assert_eq!(spaced.second(), 15);

        let day = parse_appointment_date("2025-03-01").unwrap();
        assert_eq!((day.month(), day.hour()), (3, 0));

        assert!(parse_appointment_date("next tuesday").is_none());
        assert!(parse_appointment_date("").is_none());
    }

    #[test]
    fn test_user_public_hides_hash() {
        let row = UserRow {
            user_id: Uuid::new_v4(),
            first_name: "Juan".into(),
            last_name: "Dela Cruz".into(),
            email: "juan@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            phone: None,
            address: Some("Purok 3".into()),
            profile_picture: None,
            role: ROLE_PATIENT,
            created_at: Utc::now(),
        };
        let v = serde_json::to_value(UserPublic::from(row)).unwrap();
        assert_eq!(v["name"], "Juan Dela Cruz");
        assert_eq!(v["role"], "patient");
        assert!(v.get("password_hash").is_none());
        assert!(!v.to_string().contains("argon2"));
    }
}
