//! Monthly summaries of a user's transactions.
//!
//! [summarize_month] is a pure function over rows that the store has
//! already restricted to one user and one calendar month. It computes the
//! income and expense totals, the balance, and a per-day breakdown used by
//! the dashboard calendar and charts. All arithmetic uses exact decimals.

mod core;
mod endpoint;

pub use core::{DailySummary, MonthlySummary, YearMonth, summarize_month};
pub use endpoint::get_summary_endpoint;
