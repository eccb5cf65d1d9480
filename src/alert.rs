//! Alert fragments for displaying error messages to users.
//!
//! These fragments are swapped into the `#alert-container` element by htmx
//! via the `response-targets` extension.

use maud::{Markup, html};

const ALERT_ERROR_STYLE: &str = "flex items-start gap-3 p-4 mb-4 mx-auto \
    max-w-xl text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 \
    dark:text-red-400";

/// Render an error alert with a headline `message` and optional `details`.
pub fn alert_error(message: &str, details: &str) -> Markup {
    html! {
        div class=(ALERT_ERROR_STYLE) role="alert"
        {
            div
            {
                span class="font-semibold" { (message) }

                @if !details.is_empty() {
                    p { (details) }
                }
            }

            button
                type="button"
                class="ms-auto -mx-1.5 -my-1.5 p-1.5 rounded-lg focus:ring-2 \
                    focus:ring-gray-400 hover:bg-gray-200 dark:hover:bg-gray-700"
                onclick="this.closest('[role=alert]').remove()"
                aria-label="Close"
            {
                "✕"
            }
        }
    }
}
