//! The profile page where users manage their own details.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    alert::alert_error,
    email::Email,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        text_input,
    },
    navigation::NavBar,
    user::{User, UserId, get_user_by_id, update_profile},
};

/// The form data for updating the user's own details.
#[derive(Debug, Deserialize)]
pub struct ProfileFormData {
    name: String,
    email: String,
}

/// The state needed for the profile page and endpoint.
#[derive(Debug, Clone)]
pub struct ProfileState {
    /// The database connection for reading and updating the user.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the profile page for the logged-in user.
pub async fn get_profile_page(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;

    Ok(profile_view(&user).into_response())
}

/// Handle profile update form submission.
pub async fn update_profile_endpoint(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserId>,
    Form(form_data): Form<ProfileFormData>,
) -> Response {
    let name = form_data.name.trim();
    if name.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            alert_error("Name cannot be empty", ""),
        )
            .into_response();
    }

    let email = match Email::new(&form_data.email) {
        Ok(email) => email,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_profile(user_id, name, &email, &connection) {
        Ok(()) => (
            HxRedirect(endpoints::PROFILE_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Failed to update profile for user {user_id}: {error}");

            error.into_alert_response()
        }
    }
}

fn profile_view(user: &User) -> Markup {
    let nav_bar = if user.is_admin() {
        NavBar::new_admin(endpoints::PROFILE_VIEW)
    } else {
        NavBar::new(endpoints::PROFILE_VIEW)
    }
    .into_html();

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE)
        {
            (avatar_view(user))

            form
                hx-put=(endpoints::PROFILE_API)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (text_input("name", "Name", "text", &user.name, true))
                (text_input("email", "Email", "email", user.email.as_ref(), true))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save" }
            }

            form
                hx-post=(endpoints::PROFILE_AVATAR_API)
                hx-target-error="#alert-container"
                hx-encoding="multipart/form-data"
                class="w-full space-y-4 md:space-y-6"
            {
                div
                {
                    label for="avatar" class=(FORM_LABEL_STYLE) { "Avatar image" }

                    input
                        id="avatar"
                        type="file"
                        name="avatar"
                        accept="image/*"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Upload" }
            }
        }
    };

    base("Profile", &[], &content)
}

fn avatar_view(user: &User) -> Markup {
    html! {
        @if let Some(avatar) = &user.avatar {
            img
                src={ (endpoints::UPLOADS) "/" (avatar) }
                alt="Avatar"
                class="h-24 w-24 rounded-full object-cover";
        } @else {
            div class="flex h-24 w-24 items-center justify-center rounded-full bg-gray-200 text-2xl dark:bg-gray-700"
            {
                (user.name.chars().next().unwrap_or('?'))
            }
        }
    }
}
