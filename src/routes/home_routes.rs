use axum::{Router, routing::get};

use crate::models::AppState;

pub const HEALTH_MESSAGE: &str = "Barangay health center API is running";

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(home))
}

pub async fn home() -> &'static str {
    HEALTH_MESSAGE
}
