//! User accounts.
//!
//! This module contains everything related to user accounts:
//! - The `User` model, roles, and database functions
//! - The profile page where users manage their own details and avatar
//! - The admin pages for managing all user accounts

mod admin;
mod avatar;
mod core;
mod profile;

pub use admin::{
    admin_create_user_endpoint, admin_delete_user_endpoint, admin_update_user_endpoint,
    get_edit_user_page, get_users_page,
};
pub use avatar::upload_avatar_endpoint;
pub use core::{
    Role, User, UserId, clear_otp, create_user, create_user_table, delete_user, ensure_admin_user,
    get_all_users, get_user_by_email, get_user_by_id, set_otp, set_password, update_profile,
    update_user, verify_otp,
};
pub use profile::{get_profile_page, update_profile_endpoint};
