// src/routes/appointment_routes.rs

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{parse_appointment_date, AppState, AppointmentRow, AppointmentStatus},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/book-appointment", post(book_appointment))
        .route("/my-appointments", get(my_appointments))
        .route("/cancel-appointment", post(cancel_appointment))
        .route("/admin/appointments", get(admin_appointments))
        .route("/admin/update-appointment", post(admin_update_appointment))
}

/* ============================================================
   DTOs
   ============================================================ */

/// Any `status` the client sends is not part of this shape and is dropped.
#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub appointment_date: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct BookAppointmentResponse {
    pub success: bool,
    pub appointment: AppointmentRow,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub id: Uuid,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelAppointmentRequest {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CancelAppointmentResponse {
    pub success: bool,
    pub message: String,
    pub data: AppointmentRow,
}

fn parse_status(raw: &str) -> Result<AppointmentStatus, ApiError> {
    raw.parse().map_err(|_| {
        ApiError::BadRequest(
            "INVALID_STATUS",
            format!("status must be one of Pending, Approved, Declined, Cancelled (got {raw:?})"),
        )
    })
}

fn appointment_not_found() -> ApiError {
    ApiError::NotFound("NOT_FOUND", "Appointment not found".into())
}

/* ============================================================
   POST /book-appointment
   ============================================================ */

pub async fn book_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(Json(req), _): WithRejection<Json<BookAppointmentRequest>, ApiError>,
) -> Result<Json<BookAppointmentResponse>, ApiError> {
    let patient_id = auth.target_user(req.patient_id)?;

    let appointment_date = parse_appointment_date(&req.appointment_date).ok_or_else(|| {
        ApiError::BadRequest(
            "VALIDATION_ERROR",
            "appointment_date must be a date or date-time".into(),
        )
    })?;

    let appointment: AppointmentRow = sqlx::query_as::<_, AppointmentRow>(
        r#"
        INSERT INTO appointments (patient_id, appointment_date, reason, status)
        VALUES ($1, $2, $3, $4)
        RETURNING appointment_id, patient_id, appointment_date, reason, status, created_at
        "#,
    )
    .bind(patient_id)
    .bind(appointment_date)
    .bind(&req.reason)
    .bind(AppointmentStatus::Pending.as_str())
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::db)?;

    tracing::info!(
        appointment_id = %appointment.appointment_id,
        %patient_id,
        date = %appointment.appointment_date,
        "appointment booked"
    );

    Ok(Json(BookAppointmentResponse {
        success: true,
        appointment,
    }))
}

/* ============================================================
   GET /my-appointments, GET /admin/appointments
   ============================================================ */

pub async fn my_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<AppointmentRow>>, ApiError> {
    let rows = sqlx::query_as::<_, AppointmentRow>(
        r#"
        SELECT appointment_id, patient_id, appointment_date, reason, status, created_at
        FROM appointments
        WHERE patient_id = $1
        ORDER BY appointment_date DESC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(rows))
}

pub async fn admin_appointments(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<AppointmentRow>>, ApiError> {
    auth.ensure_admin()?;

    let rows = sqlx::query_as::<_, AppointmentRow>(
        r#"
        SELECT appointment_id, patient_id, appointment_date, reason, status, created_at
        FROM appointments
        ORDER BY appointment_date DESC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::db)?;

    Ok(Json(rows))
}

/* ============================================================
   POST /admin/update-appointment
   ============================================================ */

pub async fn admin_update_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(Json(req), _): WithRejection<Json<UpdateAppointmentRequest>, ApiError>,
) -> Result<Json<AppointmentRow>, ApiError> {
    auth.ensure_admin()?;
    let status = parse_status(&req.status)?;

    let row = sqlx::query_as::<_, AppointmentRow>(
        r#"
        UPDATE appointments
        SET status = $1
        WHERE appointment_id = $2
        RETURNING appointment_id, patient_id, appointment_date, reason, status, created_at
        "#,
    )
    .bind(status.as_str())
    .bind(req.id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(appointment_not_found)?;

    tracing::info!(appointment_id = %req.id, %status, "appointment status updated");

    Ok(Json(row))
}

/* ============================================================
   POST /cancel-appointment
   ============================================================ */

pub async fn cancel_appointment(
    State(state): State<AppState>,
    auth: AuthContext,
    WithRejection(Json(req), _): WithRejection<Json<CancelAppointmentRequest>, ApiError>,
) -> Result<Json<CancelAppointmentResponse>, ApiError> {
    // Patients only reach their own rows; a foreign id looks the same as a missing one.
    let row = sqlx::query_as::<_, AppointmentRow>(
        r#"
        UPDATE appointments
        SET status = $1
        WHERE appointment_id = $2
          AND ($3 OR patient_id = $4)
        RETURNING appointment_id, patient_id, appointment_date, reason, status, created_at
        "#,
    )
    .bind(AppointmentStatus::Cancelled.as_str())
    .bind(req.id)
    .bind(auth.is_admin())
    .bind(auth.user_id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::db)?
    .ok_or_else(appointment_not_found)?;

    tracing::info!(appointment_id = %req.id, user_id = %auth.user_id, "appointment cancelled");

    Ok(Json(CancelAppointmentResponse {
        success: true,
        message: "Appointment cancelled".into(),
        data: row,
    }))
}
