use crate::models::AppState;
use crate::storage::UPLOAD_URL_PREFIX;
use axum::Router;
use tower_http::services::ServeDir;

pub mod appointment_routes;
pub mod auth_routes;
pub mod home_routes;
pub mod user_routes;

pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.uploads.dir());

    Router::new()
        .merge(home_routes::router())
        .merge(auth_routes::router())
        .merge(user_routes::router(state.max_upload_bytes))
        .merge(appointment_routes::router())
        .nest_service(UPLOAD_URL_PREFIX, uploads)
        .with_state(state)
}
