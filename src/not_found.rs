//! The 404 not found page.

use axum::{http::StatusCode, response::{IntoResponse, Response}};

use crate::html::error_view;

/// Route handler for unmatched paths.
pub async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

/// Build the 404 response directly, for use outside of a route handler.
pub fn get_404_not_found_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        error_view(
            "Not Found",
            "404 Not Found",
            "The page or resource you were looking for does not exist.",
            "Check the address for typos, or head back to the dashboard.",
        ),
    )
        .into_response()
}
