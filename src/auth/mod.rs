//! User authentication.
//!
//! This module contains:
//! - The private cookie and token handling that keeps users logged in
//! - The middleware guarding protected and admin-only routes
//! - The log-in, log-out, registration, and password reset pages and
//!   endpoints

mod cookie;
mod forgot_password;
mod log_in;
mod log_out;
mod middleware;
mod register;
mod token;

pub use cookie::DEFAULT_COOKIE_DURATION;
pub use forgot_password::{
    forgot_password_endpoint, get_forgot_password_page, get_reset_password_page,
    reset_password_endpoint,
};
pub use log_in::{get_log_in_page, log_in_endpoint};
pub use log_out::log_out_endpoint;
pub use middleware::{admin_guard, auth_guard, auth_guard_hx};
pub use register::{get_register_page, register_endpoint};
