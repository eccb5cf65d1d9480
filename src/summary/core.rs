//! The month type and the aggregation itself.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    Error,
    transaction::{Transaction, TransactionKind},
};

/// A calendar month such as "2024-05".
///
/// A date belongs to this month exactly when its year and month number both
/// match. The transaction store applies the same rule in SQL via
/// `strftime('%Y-%m', date)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    /// The calendar year.
    pub year: i32,
    /// The month of the year.
    pub month: Month,
}

impl YearMonth {
    /// Parse a month from the "YYYY-MM" form used in URLs and the API.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidMonth] if `raw` is not a valid year-month
    /// string.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let parse_error = || Error::InvalidMonth(raw.to_string());

        let (year_part, month_part) = raw.split_once('-').ok_or_else(parse_error)?;
        let year: i32 = year_part.parse().map_err(|_| parse_error())?;
        let month_number: u8 = month_part.parse().map_err(|_| parse_error())?;
        let month = Month::try_from(month_number).map_err(|_| parse_error())?;

        Ok(Self { year, month })
    }

    /// The month that `date` falls in.
    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Whether `date` falls within this month.
    pub fn contains(&self, date: Date) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The month before this one.
    pub fn previous(&self) -> Self {
        let year = match self.month {
            Month::January => self.year - 1,
            _ => self.year,
        };

        Self {
            year,
            month: self.month.previous(),
        }
    }

    /// The month after this one.
    pub fn next(&self) -> Self {
        let year = match self.month {
            Month::December => self.year + 1,
            _ => self.year,
        };

        Self {
            year,
            month: self.month.next(),
        }
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month as u8)
    }
}

impl FromStr for YearMonth {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        YearMonth::parse(raw)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        YearMonth::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// The income and expense recorded on a single date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    /// The date the amounts were recorded on.
    pub date: Date,
    /// The sum of income amounts on this date.
    pub income: Decimal,
    /// The sum of expense amounts on this date.
    pub expense: Decimal,
}

/// A month of transactions rolled up into totals and per-day sums.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    /// The month the summary covers.
    pub month: YearMonth,
    /// The sum of all income amounts in the month.
    pub total_income: Decimal,
    /// The sum of all expense amounts in the month.
    pub total_expense: Decimal,
    /// `total_income - total_expense`. Negative when more was spent than
    /// earned.
    pub balance: Decimal,
    /// One entry per distinct date that has at least one transaction,
    /// ascending by date. Dates without transactions get no entry.
    pub daily_summary: Vec<DailySummary>,
    /// The transactions the summary was computed from.
    pub transactions: Vec<Transaction>,
}

/// Roll up one month of a user's transactions.
///
/// The caller is responsible for handing in only rows that belong to
/// `month` and to a single user; this function does not re-filter. The
/// `daily_summary` is ordered ascending by date regardless of input order,
/// so callers can render it directly.
pub fn summarize_month(month: YearMonth, transactions: Vec<Transaction>) -> MonthlySummary {
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    let mut by_day: BTreeMap<Date, DailySummary> = BTreeMap::new();

    for transaction in &transactions {
        let entry = by_day
            .entry(transaction.date)
            .or_insert_with(|| DailySummary {
                date: transaction.date,
                income: Decimal::ZERO,
                expense: Decimal::ZERO,
            });

        match transaction.kind {
            TransactionKind::Income => {
                total_income += transaction.amount;
                entry.income += transaction.amount;
            }
            TransactionKind::Expense => {
                total_expense += transaction.amount;
                entry.expense += transaction.amount;
            }
        }
    }

    MonthlySummary {
        month,
        total_income,
        total_expense,
        balance: total_income - total_expense,
        daily_summary: by_day.into_values().collect(),
        transactions,
    }
}
