// src/routes/user_routes.rs

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::hash_password,
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{display_name, split_name, AppState, SuccessMessage, UserPublic, UserRow},
};

const PHOTO_FIELD: &str = "profilePhoto";
const USER_ID_FIELD: &str = "userId";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: ProfileData,
}

#[derive(Debug, Serialize)]
pub struct ProfileData {
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDetailsRequest {
    pub user_id: Option<Uuid>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePictureResponse {
    pub success: bool,
    pub image_path: String,
}

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/get-user-profile", get(get_user_profile))
        .route("/update-user-details", post(update_user_details))
        .route(
            "/update-profile-picture",
            post(update_profile_picture).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("VALIDATION_ERROR", "name is required".into()));
    }
    if req.email.trim().is_empty() {
        return Err(ApiError::BadRequest("VALIDATION_ERROR", "email is required".into()));
    }
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("VALIDATION_ERROR", "password is required".into()));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<Json<UserPublic>, ApiError> {
    validate_registration(&req)?;

    // Stored trimmed so the address matches what /login looks up.
    let email = req.email.trim();
    let (first_name, last_name) = split_name(req.name.trim());
    let pw_hash = hash_password(&req.password).map_err(ApiError::Internal)?;

    // A duplicate email hits the unique constraint and surfaces as a plain 500.
    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (first_name, last_name, email, password_hash, phone, address)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING user_id, first_name, last_name, email, password_hash,
                  phone, address, profile_picture, role, created_at
        "#,
    )
    .bind(&first_name)
    .bind(&last_name)
    .bind(email)
    .bind(&pw_hash)
    .bind(req.phone.as_deref())
    .bind(req.address.as_deref())
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    tracing::info!(user_id = %user.user_id, "registered user");

    Ok(Json(user.into()))
}

pub async fn get_user_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user: UserRow = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT user_id, first_name, last_name, email, password_hash,
               phone, address, profile_picture, role, created_at
        FROM users
        WHERE user_id = $1
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(|| ApiError::NotFound("NOT_FOUND", "User not found".into()))?;

    Ok(Json(ProfileResponse {
        success: true,
        user: ProfileData {
            name: display_name(&user.first_name, &user.last_name),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            address: user.address,
            profile_picture: user.profile_picture,
        },
    }))
}

pub async fn update_user_details(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(Json(req), _): WithRejection<Json<UpdateDetailsRequest>, ApiError>,
) -> Result<Json<SuccessMessage>, ApiError> {
    let user_id = auth.target_user(req.user_id)?;

    if req.first_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "VALIDATION_ERROR",
            "firstName is required".into(),
        ));
    }

    let res = sqlx::query(
        r#"
        UPDATE users
        SET first_name = $1,
            last_name = $2,
            phone = COALESCE($3, phone),
            address = COALESCE($4, address)
        WHERE user_id = $5
        "#,
    )
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(req.phone.as_deref())
    .bind(req.address.as_deref())
    .bind(user_id)
    .execute(&state.db)
    .await
    .map_err(ApiError::db)?;

    if res.rows_affected() == 0 {
        return Err(ApiError::NotFound("NOT_FOUND", "User not found".into()));
    }

    Ok(Json(SuccessMessage::new("Details updated successfully")))
}

struct PhotoUpload {
    file_name: Option<String>,
    bytes: Vec<u8>,
}

fn multipart_error(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("UPLOAD_TOO_LARGE", message)
    } else {
        ApiError::BadRequest("INVALID_MULTIPART", message)
    }
}

fn bad_multipart(e: MultipartError) -> ApiError {
    multipart_error(e.status(), e.body_text())
}

pub async fn update_profile_picture(
    State(state): State<AppState>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> Result<Json<ProfilePictureResponse>, ApiError> {
    let mut photo: Option<PhotoUpload> = None;
    let mut requested_user: Option<Uuid> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(PHOTO_FIELD) => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                if !bytes.is_empty() {
                    photo = Some(PhotoUpload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            Some(USER_ID_FIELD) => {
                let raw = field.text().await.map_err(bad_multipart)?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let id = Uuid::parse_str(raw).map_err(|_| {
                        ApiError::BadRequest("VALIDATION_ERROR", "userId must be a UUID".into())
                    })?;
                    requested_user = Some(id);
                }
            }
            // ignore unknown parts
            _ => {}
        }
    }

    let Some(photo) = photo else {
        return Err(ApiError::BadRequest("NO_FILE", "No file uploaded".into()));
    };
    let user_id = auth.target_user(requested_user)?;

    let stored = state
        .uploads
        .save(PHOTO_FIELD, photo.file_name.as_deref(), &photo.bytes)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let res = sqlx::query(
        r#"
        UPDATE users
        SET profile_picture = $1
        WHERE user_id = $2
        "#,
    )
    .bind(&stored.public_path)
    .bind(user_id)
    .execute(&state.db)
    .await;

    match res {
        Ok(r) if r.rows_affected() > 0 => {}
        Ok(_) => {
            state.uploads.remove(&stored).await;
            return Err(ApiError::NotFound("NOT_FOUND", "User not found".into()));
        }
        Err(e) => {
            state.uploads.remove(&stored).await;
            return Err(ApiError::db(e));
        }
    }

    tracing::info!(%user_id, path = %stored.public_path, bytes = photo.bytes.len(), "profile picture stored");

    Ok(Json(ProfilePictureResponse {
        success: true,
        image_path: stored.public_path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            phone: None,
            address: None,
        }
    }

    #[test]
    fn test_validate_registration() {
        assert!(validate_registration(&registration("Juan", "juan@example.com", "pw")).is_ok());
        assert!(validate_registration(&registration(" ", "juan@example.com", "pw")).is_err());
        assert!(validate_registration(&registration("Juan", "", "pw")).is_err());
        assert!(validate_registration(&registration("Juan", "juan@example.com", "")).is_err());
    }

    #[test]
    fn test_multipart_error_keeps_size_status() {
        assert!(matches!(
            multipart_error(StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded".into()),
            ApiError::PayloadTooLarge("UPLOAD_TOO_LARGE", _)
        ));
        assert!(matches!(
            multipart_error(StatusCode::BAD_REQUEST, "missing boundary".into()),
            ApiError::BadRequest("INVALID_MULTIPART", _)
        ));
    }

    #[test]
    fn test_update_details_wire_names() {
        let req: UpdateDetailsRequest = serde_json::from_value(serde_json::json!({
            "userId": "7f1d2c3e-0000-4000-8000-000000000001",
            "firstName": "Maria",
            "lastName": "Clara",
            "phone": "09171234567",
            "address": "Purok 5"
        }))
        .unwrap();
        assert_eq!(req.first_name, "Maria");
        assert_eq!(req.last_name, "Clara");
        assert!(req.user_id.is_some());

        let minimal: UpdateDetailsRequest =
            serde_json::from_value(serde_json::json!({ "firstName": "Maria" })).unwrap();
        assert!(minimal.user_id.is_none());
        assert_eq!(minimal.last_name, "");
    }

    #[test]
    fn test_picture_response_wire_names() {
        let v = serde_json::to_value(ProfilePictureResponse {
            success: true,
            image_path: "uploads/a.png".into(),
        })
        .unwrap();
        assert_eq!(v["imagePath"], "uploads/a.png");
    }
}
