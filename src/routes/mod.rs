pub mod health;
pub mod metrics;
pub mod root;
pub mod shipping;

use axum::http::Uri;

use crate::error::ApiError;

/// Fallback for paths no route matches.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
