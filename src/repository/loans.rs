//! Loans repository: the loan lifecycle lives here.
//!
//! Borrow and return run inside transactions so the book's `available`
//! counter and the loan rows move together; renew is a single
//! self-guarding statement. The counters are guarded in SQL
//! (`available > 0` on borrow, `LEAST(available + 1, copies)` on return,
//! `renewals < cap` on renew) so they hold under concurrent requests.

use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookSummary,
        loan::{due_date_for, CreateLoan, Loan, LoanDetails},
    },
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Get active loans for a user, with book details
    pub async fn get_user_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.borrow_date, l.due_date, l.return_date, l.renewals,
                   b.id as book_id, b.title, b.category, b.authors, b.available, b.copies
            FROM loans l
            JOIN books b ON l.book_id = b.id
            WHERE l.user_id = $1 AND l.return_date IS NULL
            ORDER BY l.due_date
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();

        let mut result = Vec::new();
        for row in rows {
            let due_date: DateTime<Utc> = row.get("due_date");

            result.push(LoanDetails {
                id: row.get("id"),
                borrow_date: row.get("borrow_date"),
                due_date,
                return_date: row.get("return_date"),
                renewals: row.get("renewals"),
                book: BookSummary {
                    id: row.get("book_id"),
                    title: row.get("title"),
                    category: row.get("category"),
                    authors: row.get("authors"),
                    available: row.get("available"),
                    copies: row.get("copies"),
                },
                is_overdue: due_date < now,
            });
        }

        Ok(result)
    }

    /// Create a new loan (borrow a book)
    pub async fn create(&self, loan: &CreateLoan, period_days: i64) -> AppResult<Loan> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        // Lock the book row for the counter update
        let book_exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
                .bind(loan.book_id)
                .fetch_optional(&mut *tx)
                .await?;

        if book_exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Book with id {} not found",
                loan.book_id
            )));
        }

        // One active loan per book per member
        let already_borrowed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM loans
                WHERE user_id = $1 AND book_id = $2 AND return_date IS NULL
            )
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.book_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_borrowed {
            return Err(AppError::BusinessRule(
                "User already has an active loan for this book".to_string(),
            ));
        }

        // Take a copy off the shelf; the guard keeps the counter at or above 0
        let result = sqlx::query("UPDATE books SET available = available - 1 WHERE id = $1 AND available > 0")
            .bind(loan.book_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BusinessRule(
                "No copies of this book are available".to_string(),
            ));
        }

        let due_date = due_date_for(now, period_days);

        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, borrow_date, due_date, renewals)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING *
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.book_id)
        .bind(now)
        .bind(due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Return a loan: stamp the return date and put the copy back on the shelf
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<LoanDetails> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        if loan.return_date.is_some() {
            return Err(AppError::BusinessRule("Loan already returned".to_string()));
        }

        sqlx::query("UPDATE loans SET return_date = $1 WHERE id = $2")
            .bind(now)
            .bind(loan_id)
            .execute(&mut *tx)
            .await?;

        // Never exceed the number of copies the library owns
        sqlx::query(
            "UPDATE books SET available = LEAST(available + 1, copies) WHERE id = $1",
        )
        .bind(loan.book_id)
        .execute(&mut *tx)
        .await?;

        let book = sqlx::query_as::<_, BookSummary>(
            "SELECT id, title, category, authors, available, copies FROM books WHERE id = $1",
        )
        .bind(loan.book_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(LoanDetails {
            id: loan.id,
            borrow_date: loan.borrow_date,
            due_date: loan.due_date,
            return_date: Some(now),
            renewals: loan.renewals,
            book,
            is_overdue: false,
        })
    }

    /// Renew a loan: extend the due date from now and bump the renewal count.
    ///
    /// The update is self-guarding: the cap and return checks sit in the
    /// `WHERE` clause and the counter is incremented relative to the stored
    /// row, so concurrent renews of the same loan cannot push it past the cap.
    pub async fn renew_loan(
        &self,
        loan_id: i32,
        period_days: i64,
        max_renewals: i16,
    ) -> AppResult<(DateTime<Utc>, i16)> {
        let now = Utc::now();
        let new_due_date = now + Duration::days(period_days);

        let renewed: Option<i16> = sqlx::query_scalar(
            r#"
            UPDATE loans SET due_date = $1, renewed_at = $2, renewals = renewals + 1
            WHERE id = $3 AND return_date IS NULL AND renewals < $4
            RETURNING renewals
            "#,
        )
        .bind(new_due_date)
        .bind(now)
        .bind(loan_id)
        .bind(max_renewals)
        .fetch_optional(&self.pool)
        .await?;

        match renewed {
            Some(renewals) => Ok((new_due_date, renewals)),
            // Guard refused; re-read the loan to report the precise reason
            None => {
                let loan = self.get_by_id(loan_id).await?;
                if loan.return_date.is_some() {
                    Err(AppError::BusinessRule(
                        "Cannot renew a returned loan".to_string(),
                    ))
                } else {
                    Err(AppError::BusinessRule(format!(
                        "Maximum renewals reached ({}/{})",
                        loan.renewals, max_renewals
                    )))
                }
            }
        }
    }

    /// Insert a backdated loan for demo seeding.
    ///
    /// Active backdated loans only exist if a copy can still come off the
    /// shelf; returned ones leave the counters untouched. Returns `None`
    /// when no copy was available.
    pub async fn create_backdated(
        &self,
        user_id: i32,
        book_id: i32,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
        return_date: Option<DateTime<Utc>>,
    ) -> AppResult<Option<i32>> {
        let mut tx = self.pool.begin().await?;

        if return_date.is_none() {
            let result = sqlx::query(
                "UPDATE books SET available = available - 1 WHERE id = $1 AND available > 0",
            )
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Ok(None);
            }
        }

        let loan_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO loans (user_id, book_id, borrow_date, due_date, return_date, renewals)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(borrow_date)
        .bind(due_date)
        .bind(return_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(loan_id))
    }

    /// Count all loans ever recorded
    pub async fn count_total(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count active loans
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE return_date IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count overdue loans
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE return_date IS NULL AND due_date < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
