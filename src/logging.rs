//! Middleware for logging requests and responses.

use axum::{
    body::Body,
    extract::Request,
    http::{Method, header::CONTENT_TYPE},
    middleware::Next,
    response::Response,
};

/// The form fields whose values must never appear in the logs.
const SENSITIVE_FIELDS: [&str; 4] = ["password", "confirm_password", "new_password", "otp"];

const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level, with bodies
/// longer than [LOG_BODY_LENGTH_LIMIT] bytes truncated and logged in full at
/// the `debug` level. Password and reset code form fields are redacted, and
/// multipart bodies (avatar uploads) are not buffered at all.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let request = if is_multipart(&request) {
        tracing::info!("Received request: {:#?}\nbody: <multipart>", request.uri());
        request
    } else {
        let (parts, body_text) = read_request_body(request).await;

        let display_text = if is_form_submission(&parts) {
            redact_sensitive_fields(&body_text)
        } else {
            body_text.clone()
        };
        log_body("Received request", &format!("{parts:#?}"), &display_text);

        Request::from_parts(parts, Body::from(body_text))
    };

    let response = next.run(request).await;

    let (parts, body_text) = read_response_body(response).await;
    log_body("Sending response", &format!("{parts:#?}"), &body_text);

    Response::from_parts(parts, Body::from(body_text))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("multipart/form-data"))
}

fn is_form_submission(parts: &axum::http::request::Parts) -> bool {
    parts.method == Method::POST || parts.method == Method::PUT
}

/// Replace the value of each sensitive form field with asterisks.
fn redact_sensitive_fields(form_text: &str) -> String {
    form_text
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((field, _)) if SENSITIVE_FIELDS.contains(&field) => {
                format!("{field}=********")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

async fn read_request_body(request: Request) -> (axum::http::request::Parts, String) {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    (parts, String::from_utf8_lossy(&body_bytes).to_string())
}

async fn read_response_body(response: Response) -> (axum::http::response::Parts, String) {
    let (parts, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    (parts, String::from_utf8_lossy(&body_bytes).to_string())
}

fn log_body(direction: &str, parts: &str, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("{direction}: {parts}\nbody: {}...", &body[..LOG_BODY_LENGTH_LIMIT]);
        tracing::debug!("Full body: {body:?}");
    } else {
        tracing::info!("{direction}: {parts}\nbody: {body:?}");
    }
}
