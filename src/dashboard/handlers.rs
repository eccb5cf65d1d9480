//! Dashboard HTTP handler and view rendering.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error, endpoints,
    html::{
        HeadElement, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency,
    },
    navigation::NavBar,
    summary::{MonthlySummary, YearMonth, summarize_month},
    transaction::{TransactionFilter, get_transactions},
    user::UserId,
};

use super::charts::{DashboardChart, chart_script, chart_view, daily_chart};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for retrieving transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters accepted by the dashboard page.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// The month to display in "YYYY-MM" form. Defaults to the current
    /// month.
    month: Option<String>,
}

/// Render the dashboard for the requested month, or the current month when
/// none is given.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, Error> {
    let month = match query.month.as_deref().map(str::trim) {
        Some("") | None => YearMonth::from_date(OffsetDateTime::now_utc().date()),
        Some(raw) => YearMonth::parse(raw)?,
    };

    let transactions = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_transactions(
            user_id,
            &TransactionFilter {
                month: Some(month),
                ..Default::default()
            },
            &connection,
        )?
    };

    let summary = summarize_month(month, transactions);

    Ok(dashboard_view(&summary).into_response())
}

fn dashboard_view(summary: &MonthlySummary) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let chart = DashboardChart {
        id: "daily-chart",
        options: daily_chart(summary).to_string(),
    };

    let head_elements = [
        HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
        chart_script(&chart),
    ];

    let content = html! {
        (nav_bar)
        div class=(PAGE_CONTAINER_STYLE)
        {
            (month_navigation_view(summary.month))
            (summary_cards_view(summary))

            @if summary.daily_summary.is_empty() {
                p class="text-gray-500 dark:text-gray-400"
                {
                    "No transactions recorded for this month."
                }
            } @else {
                (chart_view(&chart))
                (daily_table_view(summary))
            }
        }
    };

    base("Dashboard", &head_elements, &content)
}

fn month_navigation_view(month: YearMonth) -> Markup {
    let previous_month_endpoint = format!(
        "{}?month={}",
        endpoints::DASHBOARD_VIEW,
        month.previous()
    );
    let next_month_endpoint = format!("{}?month={}", endpoints::DASHBOARD_VIEW, month.next());
    let link_style = "font-medium text-blue-600 hover:underline dark:text-blue-500";

    html! {
        div class="flex items-center justify-between"
        {
            a href=(previous_month_endpoint) class=(link_style) { "← Previous" }

            h1 class="text-xl font-bold text-gray-900 dark:text-white" { (month) }

            a href=(next_month_endpoint) class=(link_style) { "Next →" }
        }
    }
}

fn summary_cards_view(summary: &MonthlySummary) -> Markup {
    let card_style = "rounded-lg bg-white p-4 shadow dark:bg-gray-800";
    let label_style = "text-sm text-gray-500 dark:text-gray-400";
    let balance_style = if summary.balance.is_sign_negative() && !summary.balance.is_zero() {
        "text-lg font-bold text-red-600 dark:text-red-400"
    } else {
        "text-lg font-bold text-green-600 dark:text-green-400"
    };

    html! {
        section class="grid grid-cols-1 gap-4 md:grid-cols-3"
        {
            div class=(card_style)
            {
                p class=(label_style) { "Income" }
                p class="text-lg font-bold text-green-600 dark:text-green-400"
                {
                    (format_currency(summary.total_income))
                }
            }

            div class=(card_style)
            {
                p class=(label_style) { "Expenses" }
                p class="text-lg font-bold text-red-600 dark:text-red-400"
                {
                    (format_currency(summary.total_expense))
                }
            }

            div class=(card_style)
            {
                p class=(label_style) { "Balance" }
                p class=(balance_style) { (format_currency(summary.balance)) }
            }
        }
    }
}

fn daily_table_view(summary: &MonthlySummary) -> Markup {
    html! {
        table class="w-full text-left text-sm"
        {
            thead
            {
                tr
                {
                    th class=(TABLE_HEADER_STYLE) { "Date" }
                    th class=(TABLE_HEADER_STYLE) { "Income" }
                    th class=(TABLE_HEADER_STYLE) { "Expense" }
                }
            }

            tbody
            {
                @for daily in &summary.daily_summary {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td class=(TABLE_CELL_STYLE) { (daily.date) }
                        td class=(TABLE_CELL_STYLE) { (format_currency(daily.income)) }
                        td class=(TABLE_CELL_STYLE) { (format_currency(daily.expense)) }
                    }
                }
            }
        }
    }
}
