//! The shared state handed to the router.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{auth::DEFAULT_COOKIE_DURATION, email::Mailer};

/// The state of the web server.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
    /// The directory uploaded avatar images are written to.
    pub upload_dir: PathBuf,
    /// The collaborator that delivers password reset codes.
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Create a new [AppState].
    pub fn new(
        cookie_secret: &str,
        db_connection: Arc<Mutex<Connection>>,
        upload_dir: PathBuf,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
            upload_dir,
            mailer,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret` string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
