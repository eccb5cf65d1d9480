//! Avatar image upload.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{AppState, Error, endpoints, user::UserId};

use super::core::set_avatar;

/// Image file extensions accepted for avatars.
const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// The state needed for uploading an avatar.
#[derive(Debug, Clone)]
pub struct AvatarState {
    /// The database connection for recording the avatar file name.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The directory uploaded avatar images are written to.
    pub upload_dir: PathBuf,
}

impl FromRef<AppState> for AvatarState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_dir: state.upload_dir.clone(),
        }
    }
}

/// Handle an avatar image upload.
///
/// Expects a multipart form with a single "avatar" file field. The image is
/// written to the upload directory under a name derived from the user ID
/// and the current time, and that name is stored on the user's account.
pub async fn upload_avatar_endpoint(
    State(state): State<AvatarState>,
    Extension(user_id): Extension<UserId>,
    mut multipart: Multipart,
) -> Response {
    let file = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("avatar") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => break Some((file_name, bytes)),
                    Err(error) => {
                        return Error::UploadError(error.to_string()).into_alert_response();
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break None,
            Err(error) => return Error::UploadError(error.to_string()).into_alert_response(),
        }
    };

    let Some((file_name, bytes)) = file else {
        return Error::UploadError("no avatar file in request".to_string()).into_alert_response();
    };

    let extension = match validate_extension(&file_name) {
        Ok(extension) => extension,
        Err(error) => return error.into_alert_response(),
    };

    let stored_name = format!(
        "avatar_{}_{}.{extension}",
        user_id,
        OffsetDateTime::now_utc().unix_timestamp()
    );
    let path = state.upload_dir.join(&stored_name);

    if let Err(error) = tokio::fs::create_dir_all(&state.upload_dir).await {
        tracing::error!("could not create upload directory: {error}");
        return Error::UploadError(error.to_string()).into_alert_response();
    }

    if let Err(error) = tokio::fs::write(&path, &bytes).await {
        tracing::error!("could not write avatar file {path:?}: {error}");
        return Error::UploadError(error.to_string()).into_alert_response();
    }

    let result = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_alert_response();
            }
        };

        set_avatar(user_id, &stored_name, &connection)
    };

    match result {
        Ok(()) => (
            HxRedirect(endpoints::PROFILE_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Failed to record avatar for user {user_id}: {error}");

            error.into_alert_response()
        }
    }
}

/// Check that the uploaded file name carries an allowed image extension.
fn validate_extension(file_name: &str) -> Result<String, Error> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(Error::UploadError(format!(
            "\"{file_name}\" is not an allowed image type"
        )))
    }
}
