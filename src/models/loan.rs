//! Loan (borrow) model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::book::BookSummary;

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    /// Null while the loan is active
    pub return_date: Option<DateTime<Utc>>,
    pub renewals: i16,
    pub renewed_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// An active loan past its due date is overdue
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.return_date.is_none() && self.due_date < now
    }
}

/// Compute the due date for a loan starting at `borrow_date`
pub fn due_date_for(borrow_date: DateTime<Utc>, period_days: i64) -> DateTime<Utc> {
    borrow_date + Duration::days(period_days)
}

/// Loan with book details for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub renewals: i16,
    pub book: BookSummary,
    pub is_overdue: bool,
}

/// Create loan request
#[derive(Debug, Deserialize)]
pub struct CreateLoan {
    pub user_id: i32,
    pub book_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn loan(due: DateTime<Utc>, returned: Option<DateTime<Utc>>) -> Loan {
        Loan {
            id: 1,
            user_id: 1,
            book_id: 1,
            borrow_date: due - Duration::days(14),
            due_date: due,
            return_date: returned,
            renewals: 0,
            renewed_at: None,
        }
    }

    #[test]
    fn due_date_adds_loan_period() {
        let borrow = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let due = due_date_for(borrow, 14);
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn active_loan_past_due_is_overdue() {
        let now = Utc::now();
        assert!(loan(now - Duration::days(1), None).is_overdue(now));
        assert!(!loan(now + Duration::days(1), None).is_overdue(now));
    }

    #[test]
    fn returned_loan_is_never_overdue() {
        let now = Utc::now();
        let l = loan(now - Duration::days(10), Some(now - Duration::days(5)));
        assert!(!l.is_overdue(now));
    }
}
