//! Library statistics service

use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, repository::Repository};

/// Aggregate counters for the dashboard
#[derive(Debug, Serialize, ToSchema)]
pub struct LibraryStats {
    pub books: i64,
    pub users: i64,
    /// All loans ever recorded, returned ones included
    pub loans: i64,
    pub active_loans: i64,
    pub overdue_loans: i64,
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Connectivity probe for the readiness endpoint
    pub async fn ping_database(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.repository.pool)
            .await?;
        Ok(())
    }

    pub async fn get_stats(&self) -> AppResult<LibraryStats> {
        Ok(LibraryStats {
            books: self.repository.books.count().await?,
            users: self.repository.users.count().await?,
            loans: self.repository.loans.count_total().await?,
            active_loans: self.repository.loans.count_active().await?,
            overdue_loans: self.repository.loans.count_overdue().await?,
        })
    }
}
