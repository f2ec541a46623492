use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Status as persisted. `overdue` is never stored; it is derived per render.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(InvoiceStatus::Pending),
            "paid" => Some(InvoiceStatus::Paid),
            _ => None,
        }
    }
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status as shown to merchants and payers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Pending,
    Paid,
    Overdue,
}

impl DisplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStatus::Pending => "pending",
            DisplayStatus::Paid => "paid",
            DisplayStatus::Overdue => "overdue",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(DisplayStatus::Pending),
            "paid" => Some(DisplayStatus::Paid),
            "overdue" => Some(DisplayStatus::Overdue),
            _ => None,
        }
    }
}

impl Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single derivation site for every list, filter and analytics consumer.
/// `today` is injected so the comparison stays deterministic under test.
/// The due date comparison is day granular: an invoice due today is still pending.
pub fn display_status(
    status: InvoiceStatus,
    due_date: DateTime<Utc>,
    today: NaiveDate,
) -> DisplayStatus {
    match status {
        InvoiceStatus::Paid => DisplayStatus::Paid,
        InvoiceStatus::Pending => {
            if due_date.date_naive() < today {
                DisplayStatus::Overdue
            } else {
                DisplayStatus::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 15, 30, 0).unwrap()
    }

    #[test]
    fn pending_past_due_date_is_overdue() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        assert_eq!(
            display_status(InvoiceStatus::Pending, date(2025, 6, 9), today),
            DisplayStatus::Overdue
        );
    }

    #[test]
    fn pending_due_today_is_still_pending() {
        // Day granularity: time of day on the due date never matters.
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        assert_eq!(
            display_status(InvoiceStatus::Pending, date(2025, 6, 10), today),
            DisplayStatus::Pending
        );
    }

    #[test]
    fn pending_due_later_is_pending() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        assert_eq!(
            display_status(InvoiceStatus::Pending, date(2025, 7, 1), today),
            DisplayStatus::Pending
        );
    }

    #[test]
    fn paid_is_paid_regardless_of_due_date() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        assert_eq!(
            display_status(InvoiceStatus::Paid, date(2020, 1, 1), today),
            DisplayStatus::Paid
        );
        assert_eq!(
            display_status(InvoiceStatus::Paid, date(2030, 1, 1), today),
            DisplayStatus::Paid
        );
    }
}
