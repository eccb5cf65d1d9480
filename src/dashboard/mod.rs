//! The dashboard page.
//!
//! Shows the logged-in user's month at a glance: income, expense, and
//! balance cards, a per-day chart, and a per-day table, with links to step
//! between months.

mod charts;
mod handlers;

pub use handlers::get_dashboard_page;
