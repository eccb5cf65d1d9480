//! Password reset pages and endpoints.
//!
//! The flow mirrors the classic email one-time-password scheme: the user
//! requests a reset code, a six digit code valid for ten minutes is stored
//! against their account and mailed to them, and submitting the code with a
//! new password completes the reset.
//!
//! The request endpoint always reports success, so it cannot be used to
//! probe which email addresses have accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rand::Rng;
use rusqlite::Connection;
use serde::Deserialize;
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    email::{Email, Mailer},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, auth_card, link, password_input, text_input},
    password::PasswordHash,
    user::{clear_otp, get_user_by_email, set_otp, set_password, verify_otp},
};

/// How long a reset code stays valid.
const OTP_VALIDITY: Duration = Duration::minutes(10);

/// The form data for requesting a reset code.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordFormData {
    email: String,
}

/// The form data for completing a password reset.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordFormData {
    email: String,
    otp: String,
    new_password: String,
}

/// The state needed for the password reset endpoints.
#[derive(Clone)]
pub struct ForgotPasswordState {
    /// The database connection for looking up users and storing codes.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The collaborator that delivers reset codes.
    pub mailer: Arc<dyn Mailer>,
}

impl FromRef<AppState> for ForgotPasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            mailer: state.mailer.clone(),
        }
    }
}

/// Render the page for requesting a password reset code.
pub async fn get_forgot_password_page() -> Response {
    forgot_password_view().into_response()
}

/// Render the page for entering a reset code and choosing a new password.
pub async fn get_reset_password_page() -> Response {
    reset_password_view().into_response()
}

/// Handle a request for a password reset code.
///
/// Generates a six digit code, stores it with a ten minute expiry, and
/// mails it to the account's address. Unknown emails get the same response
/// as known ones.
pub async fn forgot_password_endpoint(
    State(state): State<ForgotPasswordState>,
    Form(form_data): Form<ForgotPasswordFormData>,
) -> Response {
    let accepted = (
        HxRedirect(endpoints::RESET_PASSWORD_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response();

    let email = match Email::new(&form_data.email) {
        Ok(email) => email,
        Err(_) => return accepted,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user_by_email(&email, &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return accepted,
        Err(error) => {
            tracing::error!("could not look up user for password reset: {error}");
            return error.into_alert_response();
        }
    };

    let otp = generate_otp();
    let expires_at = OffsetDateTime::now_utc() + OTP_VALIDITY;

    if let Err(error) = set_otp(user.id, &otp, expires_at, &connection) {
        tracing::error!("could not store reset code: {error}");
        return error.into_alert_response();
    }

    if let Err(error) = state.mailer.send(
        &user.email,
        "Your password reset code",
        &format!("Your password reset code is {otp}. It expires in 10 minutes."),
    ) {
        tracing::error!("could not send reset code: {error}");
        return error.into_alert_response();
    }

    accepted
}

/// Handle a password reset submission.
///
/// Verifies the code, replaces the password, and clears the code so it
/// cannot be used twice.
pub async fn reset_password_endpoint(
    State(state): State<ForgotPasswordState>,
    Form(form_data): Form<ResetPasswordFormData>,
) -> Response {
    let email = match Email::new(&form_data.email) {
        Ok(email) => email,
        Err(error) => return error.into_alert_response(),
    };

    let password_hash = match PasswordHash::from_raw_password(
        &form_data.new_password,
        PasswordHash::DEFAULT_COST,
    ) {
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

    let result = get_user_by_email(&email, &connection).and_then(|user| {
        verify_otp(
            user.id,
            form_data.otp.trim(),
            OffsetDateTime::now_utc(),
            &connection,
        )?;
        set_password(user.id, password_hash, &connection)?;
        clear_otp(user.id, &connection)
    });

    match result {
        Ok(()) => (
            HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        // Unknown accounts get the same response as a wrong code, so the
        // reset form cannot be used to probe which emails have accounts.
        Err(Error::NotFound) => Error::OtpMismatch.into_alert_response(),
        Err(error) => error.into_alert_response(),
    }
}

/// A six digit code, zero-padded.
fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{code:06}")
}

fn forgot_password_view() -> Markup {
    let form = html! {
        form
            hx-post=(endpoints::FORGOT_PASSWORD_API)
            hx-target-error="#alert-container"
            class="space-y-4 md:space-y-6"
        {
            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Enter your email address and we will send you a reset code."
            }

            (text_input("email", "Email", "email", "", true))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Send reset code" }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have a code? "
                (link(endpoints::RESET_PASSWORD_VIEW, "Reset your password"))
            }
        }
    };

    auth_card("Forgot your password?", &form)
}

fn reset_password_view() -> Markup {
    let form = html! {
        form
            hx-post=(endpoints::RESET_PASSWORD_API)
            hx-target-error="#alert-container"
            class="space-y-4 md:space-y-6"
        {
            (text_input("email", "Email", "email", "", true))
            (text_input("otp", "Reset code", "text", "", true))
            (password_input("new_password", "New password", None))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Reset password" }
        }
    };

    auth_card("Reset your password", &form)
}

#[cfg(test)]
mod forgot_password_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Form, extract::State, http::StatusCode};
    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        email::{Email, Mailer},
        password::PasswordHash,
        user::{Role, User, create_user, get_user_by_email},
    };

    use super::{
        ForgotPasswordFormData, ForgotPasswordState, ResetPasswordFormData,
        forgot_password_endpoint, generate_otp, reset_password_endpoint,
    };

    /// Captures outgoing mail so tests can read the reset code.
    #[derive(Default)]
    struct RecordingMailer {
        messages: Mutex<Vec<String>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, _recipient: &Email, _subject: &str, body: &str) -> Result<(), Error> {
            self.messages.lock().unwrap().push(body.to_string());
            Ok(())
        }
    }

    fn get_test_state() -> (ForgotPasswordState, Arc<RecordingMailer>, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let user = create_user(
            "Alice",
            Email::new_unchecked("alice@example.com"),
            PasswordHash::new_unchecked("old hash"),
            Role::User,
            &conn,
        )
        .unwrap();

        let mailer = Arc::new(RecordingMailer::default());

        (
            ForgotPasswordState {
                db_connection: Arc::new(Mutex::new(conn)),
                mailer: mailer.clone(),
            },
            mailer,
            user,
        )
    }

    fn extract_otp(message: &str) -> String {
        message
            .chars()
            .filter(char::is_ascii_digit)
            .take(6)
            .collect()
    }

    #[test]
    fn generated_otp_is_six_digits() {
        for _ in 0..100 {
            let otp = generate_otp();

            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn full_reset_flow_changes_password() {
        let (state, mailer, _) = get_test_state();

        let response = forgot_password_endpoint(
            State(state.clone()),
            Form(ForgotPasswordFormData {
                email: "alice@example.com".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let otp = {
            let messages = mailer.messages.lock().unwrap();
            assert_eq!(messages.len(), 1);
            extract_otp(&messages[0])
        };

        let new_password = "correcthorsebatterystaple";
        let response = reset_password_endpoint(
            State(state.clone()),
            Form(ResetPasswordFormData {
                email: "alice@example.com".to_string(),
                otp,
                new_password: new_password.to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let conn = state.db_connection.lock().unwrap();
        let user = get_user_by_email(&Email::new_unchecked("alice@example.com"), &conn).unwrap();
        assert!(user.password_hash.verify(new_password).unwrap());
    }

    #[tokio::test]
    async fn wrong_code_does_not_change_password() {
        let (state, _, _) = get_test_state();

        forgot_password_endpoint(
            State(state.clone()),
            Form(ForgotPasswordFormData {
                email: "alice@example.com".to_string(),
            }),
        )
        .await;

        let response = reset_password_endpoint(
            State(state.clone()),
            Form(ResetPasswordFormData {
                email: "alice@example.com".to_string(),
                otp: "000000".to_string(),
                new_password: "correcthorsebatterystaple".to_string(),
            }),
        )
        .await;

        assert_ne!(response.status(), StatusCode::SEE_OTHER);

        let conn = state.db_connection.lock().unwrap();
        let user = get_user_by_email(&Email::new_unchecked("alice@example.com"), &conn).unwrap();
        assert_eq!(user.password_hash.as_ref(), "old hash");
    }

    #[tokio::test]
    async fn code_cannot_be_used_twice() {
        let (state, mailer, _) = get_test_state();

        forgot_password_endpoint(
            State(state.clone()),
            Form(ForgotPasswordFormData {
                email: "alice@example.com".to_string(),
            }),
        )
        .await;

        let otp = {
            let messages = mailer.messages.lock().unwrap();
            extract_otp(&messages[0])
        };

        let reset_form = |otp: String, password: &str| ResetPasswordFormData {
            email: "alice@example.com".to_string(),
            otp,
            new_password: password.to_string(),
        };

        let response = reset_password_endpoint(
            State(state.clone()),
            Form(reset_form(otp.clone(), "correcthorsebatterystaple")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = reset_password_endpoint(
            State(state.clone()),
            Form(reset_form(otp, "anotherdecentpassword99")),
        )
        .await;
        assert_ne!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn reset_with_unknown_email_matches_wrong_code_response() {
        let (state, _, _) = get_test_state();

        let wrong_code_response = reset_password_endpoint(
            State(state.clone()),
            Form(ResetPasswordFormData {
                email: "alice@example.com".to_string(),
                otp: "000000".to_string(),
                new_password: "correcthorsebatterystaple".to_string(),
            }),
        )
        .await;

        let unknown_email_response = reset_password_endpoint(
            State(state),
            Form(ResetPasswordFormData {
                email: "nobody@example.com".to_string(),
                otp: "000000".to_string(),
                new_password: "correcthorsebatterystaple".to_string(),
            }),
        )
        .await;

        assert_eq!(wrong_code_response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(unknown_email_response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_email_gets_the_same_response() {
        let (state, mailer, _) = get_test_state();

        let response = forgot_password_endpoint(
            State(state),
            Form(ForgotPasswordFormData {
                email: "nobody@example.com".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(mailer.messages.lock().unwrap().is_empty());
    }
}
