//! Log-out endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;

use crate::endpoints;

use super::cookie::invalidate_auth_cookie;

/// Invalidate the auth cookie and redirect the client to the log-in page.
pub async fn log_out_endpoint(jar: PrivateCookieJar) -> Response {
    let jar = invalidate_auth_cookie(jar);

    (
        jar,
        HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod log_out_endpoint_tests {
    use axum::http::StatusCode;
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};

    use super::log_out_endpoint;

    #[tokio::test]
    async fn clears_cookie_and_redirects() {
        let jar = PrivateCookieJar::new(Key::generate());

        let response = log_out_endpoint(jar).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get("HX-Redirect").unwrap(), "/log_in");

        let set_cookie = response
            .headers()
            .get("set-cookie")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.contains("Max-Age=0"));
    }
}
