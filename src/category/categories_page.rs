//! The page listing the user's categories.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
    },
    navigation::NavBar,
    user::UserId,
};

use super::{Category, get_categories};

/// The state needed for the categories page.
#[derive(Debug, Clone)]
pub struct CategoriesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the page listing the user's own and the global categories.
pub async fn get_categories_page(
    State(state): State<CategoriesPageState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_categories(user_id, None, &connection)?;

    Ok(categories_view(&categories).into_response())
}

fn categories_view(categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::CATEGORIES_VIEW).into_html();

    let content = html! {
        (nav_bar)
        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="flex items-center justify-between"
            {
                h1 class="text-xl font-bold text-gray-900 dark:text-white" { "Categories" }

                a
                    href=(endpoints::NEW_CATEGORY_VIEW)
                    class=(BUTTON_PRIMARY_STYLE)
                {
                    "Create Category"
                }
            }

            @if categories.is_empty() {
                p class="text-gray-500 dark:text-gray-400"
                {
                    "No categories yet. Create one to start recording transactions."
                }
            } @else {
                table class="w-full text-left text-sm"
                {
                    thead
                    {
                        tr
                        {
                            th class=(TABLE_HEADER_STYLE) { "Name" }
                            th class=(TABLE_HEADER_STYLE) { "Kind" }
                            th class=(TABLE_HEADER_STYLE) { "" }
                        }
                    }

                    tbody
                    {
                        @for category in categories {
                            (category_row_view(category))
                        }
                    }
                }
            }
        }
    };

    base("Categories", &[], &content)
}

fn category_row_view(category: &Category) -> Markup {
    let edit_endpoint =
        endpoints::format_endpoint(endpoints::EDIT_CATEGORY_VIEW, category.id);
    let delete_endpoint = endpoints::format_endpoint(endpoints::CATEGORY, category.id);

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (category.name) }
            td class=(TABLE_CELL_STYLE) { (category.kind) }
            td class=(TABLE_CELL_STYLE)
            {
                @if category.is_global() {
                    span class="text-gray-400" { "Built-in" }
                } @else {
                    a
                        href=(edit_endpoint)
                        class="font-medium text-blue-600 hover:underline dark:text-blue-500"
                    {
                        "Edit"
                    }

                    " "

                    button
                        hx-delete=(delete_endpoint)
                        hx-target="closest tr"
                        hx-swap="outerHTML"
                        hx-target-error="#alert-container"
                        hx-confirm="Delete this category?"
                        class=(BUTTON_DELETE_STYLE)
                    {
                        "Delete"
                    }
                }
            }
        }
    }
}
