//! Registration page and endpoint.

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
    password::PasswordHash,
    user::{Role, create_user},
};

use super::cookie::set_auth_cookie;

/// The form data for registering a new account.
#[derive(Debug, Deserialize)]
pub struct RegisterFormData {
    name: String,
    email: String,
    password: String,
    confirm_password: String,
}

/// The state needed for the registration endpoint.
#[derive(Clone)]
pub struct RegisterState {
    /// The database connection for creating users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The key for signing and encrypting the auth cookie.
    pub cookie_key: Key,
    /// The duration for which the auth cookie is valid.
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for RegisterState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

impl FromRef<RegisterState> for Key {
    fn from_ref(state: &RegisterState) -> Self {
        state.cookie_key.clone()
    }
}

/// Render the registration page.
pub async fn get_register_page() -> Response {
    register_view(None).into_response()
}

/// Handle registration form submission.
///
/// Newly registered accounts always get the regular user role. On success
/// the user is logged in immediately and redirected to the dashboard.
pub async fn register_endpoint(
    State(state): State<RegisterState>,
    jar: PrivateCookieJar,
    Form(form_data): Form<RegisterFormData>,
) -> Response {
    if form_data.password != form_data.confirm_password {
        return register_view(Some("Passwords do not match")).into_response();
    }

    let name = form_data.name.trim();
    if name.is_empty() {
        return register_view(Some("Name cannot be empty")).into_response();
    }

    let email = match Email::new(&form_data.email) {
        Ok(email) => email,
        Err(error) => return error.into_alert_response(),
    };

    let password_hash =
        match PasswordHash::from_raw_password(&form_data.password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => password_hash,
            Err(Error::TooWeak(feedback)) => {
                return register_view(Some(&format!("Password is too weak: {feedback}")))
                    .into_response();
            }
            Err(error) => return error.into_alert_response(),
        };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        match create_user(name, email, password_hash, Role::User, &connection) {
            Ok(user) => user,
            Err(Error::EmailTaken) => {
                return register_view(Some("An account with this email already exists"))
                    .into_response();
            }
            Err(error) => {
                tracing::error!("could not create user: {error}");
                return error.into_alert_response();
            }
        }
    };

    let jar = match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("could not set auth cookie: {error}");
            return error.into_alert_response();
        }
    };

    (
        jar,
        HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

fn register_view(error_message: Option<&str>) -> Markup {
    let form = html! {
        form
            hx-post=(endpoints::USERS_API)
            hx-target-error="#alert-container"
            hx-indicator="#indicator"
            class="space-y-4 md:space-y-6"
        {
            (text_input("name", "Name", "text", "", true))
            (text_input("email", "Email", "email", "", true))
            (password_input("password", "Password", None))
            (password_input("confirm_password", "Confirm password", error_message))

            button type="submit" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Create account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                (link(endpoints::LOG_IN_VIEW, "Log in"))
            }
        }
    };

    auth_card("Create an account", &form)
}
