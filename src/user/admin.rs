//! Admin pages and endpoints for managing user accounts.
//!
//! All routes in this module sit behind the admin guard, so handlers can
//! assume the logged-in user is an administrator.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
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
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE,
        FORM_SELECT_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base, text_input,
    },
    navigation::NavBar,
    password::PasswordHash,
    user::{Role, User, UserId, create_user, delete_user, get_all_users, get_user_by_id,
        update_user},
};

/// The form data for creating a user account.
#[derive(Debug, Deserialize)]
pub struct AdminCreateUserFormData {
    name: String,
    email: String,
    password: String,
    role: Role,
}

/// The form data for updating a user account.
#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserFormData {
    name: String,
    email: String,
    role: Role,
}

/// The state needed for the admin user management pages and endpoints.
#[derive(Debug, Clone)]
pub struct AdminUsersState {
    /// The database connection for managing user accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AdminUsersState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the page listing every user account.
pub async fn get_users_page(
    State(state): State<AdminUsersState>,
    Extension(admin_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let users = get_all_users(&connection)?;

    Ok(users_view(&users, admin_id).into_response())
}

/// Render the page for editing a user account.
pub async fn get_edit_user_page(
    Path(user_id): Path<i64>,
    State(state): State<AdminUsersState>,
) -> Result<Response, Error> {
    let user_id = UserId::new(user_id);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;

    Ok(edit_user_view(&user).into_response())
}

/// Handle user creation by an administrator.
pub async fn admin_create_user_endpoint(
    State(state): State<AdminUsersState>,
    Form(form_data): Form<AdminCreateUserFormData>,
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

    let password_hash =
        match PasswordHash::from_raw_password(&form_data.password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => password_hash,
            Err(error) => return error.into_alert_response(),
        };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_user(name, email, password_hash, form_data.role, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::USERS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Failed to create user: {error}");

            error.into_alert_response()
        }
    }
}

/// Handle a user account update by an administrator.
pub async fn admin_update_user_endpoint(
    Path(user_id): Path<i64>,
    State(state): State<AdminUsersState>,
    Form(form_data): Form<AdminUpdateUserFormData>,
) -> Response {
    let user_id = UserId::new(user_id);

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

    match update_user(
        user_id,
        form_data.name.trim(),
        &email,
        form_data.role,
        &connection,
    ) {
        Ok(()) => (
            HxRedirect(endpoints::USERS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Failed to update user {user_id}: {error}");

            error.into_alert_response()
        }
    }
}

/// Handle a user account deletion by an administrator.
///
/// Administrators cannot delete their own account, otherwise an
/// installation could lock itself out.
pub async fn admin_delete_user_endpoint(
    Path(user_id): Path<i64>,
    State(state): State<AdminUsersState>,
    Extension(admin_id): Extension<UserId>,
) -> Response {
    let user_id = UserId::new(user_id);

    if user_id == admin_id {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            alert_error("You cannot delete your own account", ""),
        )
            .into_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_user(user_id, &connection) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(error) => {
            tracing::error!("Failed to delete user {user_id}: {error}");

            error.into_alert_response()
        }
    }
}

fn users_view(users: &[User], admin_id: UserId) -> Markup {
    let nav_bar = NavBar::new_admin(endpoints::USERS_VIEW).into_html();

    let content = html! {
        (nav_bar)
        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold text-gray-900 dark:text-white" { "Users" }

            table class="w-full text-left text-sm"
            {
                thead
                {
                    tr
                    {
                        th class=(TABLE_HEADER_STYLE) { "Name" }
                        th class=(TABLE_HEADER_STYLE) { "Email" }
                        th class=(TABLE_HEADER_STYLE) { "Role" }
                        th class=(TABLE_HEADER_STYLE) { "" }
                    }
                }

                tbody
                {
                    @for user in users {
                        (user_row_view(user, admin_id))
                    }
                }
            }

            h2 class="text-lg font-bold text-gray-900 dark:text-white" { "Create user" }

            (create_user_form_view())
        }
    };

    base("Users", &[], &content)
}

fn user_row_view(user: &User, admin_id: UserId) -> Markup {
    let edit_endpoint =
        endpoints::format_endpoint(endpoints::EDIT_USER_VIEW, user.id.as_i64());
    let delete_endpoint = endpoints::format_endpoint(endpoints::ADMIN_USER, user.id.as_i64());

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (user.name) }
            td class=(TABLE_CELL_STYLE) { (user.email) }
            td class=(TABLE_CELL_STYLE) { (user.role) }
            td class=(TABLE_CELL_STYLE)
            {
                a
                    href=(edit_endpoint)
                    class="font-medium text-blue-600 hover:underline dark:text-blue-500"
                {
                    "Edit"
                }

                @if user.id != admin_id {
                    " "

                    button
                        hx-delete=(delete_endpoint)
                        hx-target="closest tr"
                        hx-swap="outerHTML"
                        hx-target-error="#alert-container"
                        hx-confirm={ "Delete the account of " (user.name) "?" }
                        class=(BUTTON_DELETE_STYLE)
                    {
                        "Delete"
                    }
                }
            }
        }
    }
}

fn create_user_form_view() -> Markup {
    html! {
        form
            hx-post=(endpoints::ADMIN_USERS_API)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            (text_input("name", "Name", "text", "", true))
            (text_input("email", "Email", "email", "", true))
            (text_input("password", "Password", "password", "", true))
            (role_select_view(Role::User))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create" }
        }
    }
}

fn edit_user_view(user: &User) -> Markup {
    let nav_bar = NavBar::new_admin(endpoints::USERS_VIEW).into_html();
    let update_endpoint = endpoints::format_endpoint(endpoints::ADMIN_USER, user.id.as_i64());

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-put=(update_endpoint)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (text_input("name", "Name", "text", &user.name, true))
                (text_input("email", "Email", "email", user.email.as_ref(), true))
                (role_select_view(user.role))

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save" }
            }
        }
    };

    base("Edit User", &[], &content)
}

fn role_select_view(selected: Role) -> Markup {
    html! {
        div
        {
            label for="role" class=(FORM_LABEL_STYLE) { "Role" }

            select id="role" name="role" class=(FORM_SELECT_STYLE)
            {
                option value="user" selected[selected == Role::User] { "User" }
                option value="admin" selected[selected == Role::Admin] { "Admin" }
            }
        }
    }
}

#[cfg(test)]
mod admin_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        email::Email,
        password::PasswordHash,
        user::{Role, User, create_user, get_all_users, get_user_by_id},
    };

    use super::{
        AdminCreateUserFormData, AdminUpdateUserFormData, AdminUsersState,
        admin_create_user_endpoint, admin_delete_user_endpoint, admin_update_user_endpoint,
    };

    fn get_test_state() -> (AdminUsersState, User, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let admin = create_user(
            "Admin",
            Email::new_unchecked("admin@example.com"),
            PasswordHash::new_unchecked("hash"),
            Role::Admin,
            &conn,
        )
        .unwrap();
        let user = create_user(
            "Alice",
            Email::new_unchecked("alice@example.com"),
            PasswordHash::new_unchecked("hash"),
            Role::User,
            &conn,
        )
        .unwrap();

        (
            AdminUsersState {
                db_connection: Arc::new(Mutex::new(conn)),
            },
            admin,
            user,
        )
    }

    #[tokio::test]
    async fn creates_user_with_role() {
        let (state, _, _) = get_test_state();

        let response = admin_create_user_endpoint(
            State(state.clone()),
            Form(AdminCreateUserFormData {
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
                password: "correcthorsebatterystaple".to_string(),
                role: Role::Admin,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let conn = state.db_connection.lock().unwrap();
        let users = get_all_users(&conn).unwrap();
        assert!(
            users
                .iter()
                .any(|user| user.name == "Bob" && user.role == Role::Admin)
        );
    }

    #[tokio::test]
    async fn updates_role_and_details() {
        let (state, _, user) = get_test_state();

        let response = admin_update_user_endpoint(
            Path(user.id.as_i64()),
            State(state.clone()),
            Form(AdminUpdateUserFormData {
                name: "Alice Cooper".to_string(),
                email: "alice@example.com".to_string(),
                role: Role::Admin,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let conn = state.db_connection.lock().unwrap();
        let updated = get_user_by_id(user.id, &conn).unwrap();
        assert_eq!(updated.name, "Alice Cooper");
        assert_eq!(updated.role, Role::Admin);
    }

    #[tokio::test]
    async fn deletes_other_account() {
        let (state, admin, user) = get_test_state();

        let response = admin_delete_user_endpoint(
            Path(user.id.as_i64()),
            State(state.clone()),
            Extension(admin.id),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);

        let conn = state.db_connection.lock().unwrap();
        assert_eq!(get_user_by_id(user.id, &conn), Err(Error::NotFound));
    }

    #[tokio::test]
    async fn refuses_to_delete_own_account() {
        let (state, admin, _) = get_test_state();

        let response = admin_delete_user_endpoint(
            Path(admin.id.as_i64()),
            State(state.clone()),
            Extension(admin.id),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let conn = state.db_connection.lock().unwrap();
        assert!(get_user_by_id(admin.id, &conn).is_ok());
    }
}
