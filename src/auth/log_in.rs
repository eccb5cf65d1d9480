//! Log-in page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    email::Email,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, auth_card, link, loading_spinner, password_input, text_input},
    user::{User, get_user_by_email},
};

use super::cookie::set_auth_cookie;

/// The form data for logging in.
#[derive(Debug, Deserialize)]
pub struct LogInFormData {
    email: String,
    password: String,
}

/// The state needed for the log-in endpoint.
#[derive(Clone)]
pub struct LogInState {
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The key for signing and encrypting the auth cookie.
    pub cookie_key: Key,
    /// The duration for which the auth cookie is valid.
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// Render the log-in page.
pub async fn get_log_in_page() -> Response {
    log_in_view().into_response()
}

/// Handle log-in form submission.
///
/// On success the auth cookie is set and the client redirected to the
/// dashboard, or to the user management page for administrators.
pub async fn log_in_endpoint(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(form_data): Form<LogInFormData>,
) -> Response {
    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        match authenticate(&form_data, &connection) {
            Ok(user) => user,
            Err(error) => return error.into_alert_response(),
        }
    };

    let jar = match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("could not set auth cookie: {error}");
            return error.into_alert_response();
        }
    };

    let destination = if user.is_admin() {
        endpoints::USERS_VIEW
    } else {
        endpoints::DASHBOARD_VIEW
    };

    (
        jar,
        HxRedirect(destination.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// Check the submitted credentials against the stored password hash.
///
/// Unknown emails and wrong passwords produce the same error so responses
/// do not reveal which accounts exist.
fn authenticate(form_data: &LogInFormData, connection: &Connection) -> Result<User, Error> {
    let email = Email::new(&form_data.email).map_err(|_| Error::InvalidCredentials)?;

    let user = get_user_by_email(&email, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCredentials,
        error => error,
    })?;

    match user.password_hash.verify(&form_data.password) {
        Ok(true) => Ok(user),
        Ok(false) => Err(Error::InvalidCredentials),
        Err(error) => Err(Error::HashingError(error.to_string())),
    }
}

fn log_in_view() -> Markup {
    let form = html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            class="space-y-4 md:space-y-6"
        {
            (text_input("email", "Email", "email", "", true))
            (password_input("password", "Password", None))

            button type="submit" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Don't have an account yet? "
                (link(endpoints::REGISTER_VIEW, "Register"))
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Forgot your password? "
                (link(endpoints::FORGOT_PASSWORD_VIEW, "Reset it"))
            }
        }
    };

    auth_card("Log in to your account", &form)
}

#[cfg(test)]
mod log_in_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Form, extract::State, http::StatusCode};
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use rusqlite::Connection;
    use time::Duration;

    use crate::{
        db::initialize,
        email::Email,
        password::{PasswordHash, ValidatedPassword},
        user::{Role, create_user},
    };

    use super::{LogInFormData, LogInState, log_in_endpoint};

    const TEST_PASSWORD: &str = "averygoodsecret42";

    fn get_test_state(role: Role) -> LogInState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let password_hash =
            PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4).unwrap();
        create_user(
            "Alice",
            Email::new_unchecked("alice@example.com"),
            password_hash,
            role,
            &conn,
        )
        .unwrap();

        LogInState {
            db_connection: Arc::new(Mutex::new(conn)),
            cookie_key: Key::generate(),
            cookie_duration: Duration::minutes(5),
        }
    }

    fn get_test_jar(state: &LogInState) -> PrivateCookieJar {
        PrivateCookieJar::new(state.cookie_key.clone())
    }

    #[tokio::test]
    async fn valid_credentials_set_cookie_and_redirect_to_dashboard() {
        let state = get_test_state(Role::User);
        let jar = get_test_jar(&state);

        let response = log_in_endpoint(
            State(state),
            jar,
            Form(LogInFormData {
                email: "alice@example.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("HX-Redirect").unwrap(),
            "/dashboard"
        );
        assert!(response.headers().contains_key("set-cookie"));
    }

    #[tokio::test]
    async fn admin_is_redirected_to_user_management() {
        let state = get_test_state(Role::Admin);
        let jar = get_test_jar(&state);

        let response = log_in_endpoint(
            State(state),
            jar,
            Form(LogInFormData {
                email: "alice@example.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            }),
        )
        .await;

        assert_eq!(response.headers().get("HX-Redirect").unwrap(), "/users");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let state = get_test_state(Role::User);
        let jar = get_test_jar(&state);

        let response = log_in_endpoint(
            State(state),
            jar,
            Form(LogInFormData {
                email: "alice@example.com".to_string(),
                password: "wrong password".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!response.headers().contains_key("set-cookie"));
    }

    #[tokio::test]
    async fn unknown_email_gets_the_same_error_as_wrong_password() {
        let state = get_test_state(Role::User);
        let jar = get_test_jar(&state);

        let response = log_in_endpoint(
            State(state),
            jar,
            Form(LogInFormData {
                email: "nobody@example.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
