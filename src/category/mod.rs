//! Transaction categories.
//!
//! This module contains everything related to categories:
//! - The `Category` model and database functions
//! - The page listing the user's categories
//! - The pages and endpoints for creating, editing, and deleting categories

mod categories_page;
mod core;
mod create;
mod delete;
mod edit;

pub use categories_page::get_categories_page;
pub use core::{
    Category, CategoryId, create_category, create_category_table, delete_category, get_categories,
    get_category, update_category,
};
pub use create::{create_category_endpoint, get_new_category_page};
pub use delete::delete_category_endpoint;
pub use edit::{get_edit_category_page, update_category_endpoint};
