//! Session API for the UI.

pub mod request_id;
mod routes;

use axum::Router;

pub use routes::ApiError;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}

#[cfg(test)]
mod tests;
