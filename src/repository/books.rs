//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book by title (titles are unique)
    pub async fn get_by_title(&self, title: &str) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE title = $1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book '{}' not found", title)))
    }

    /// List books sorted by title, optionally filtered by category
    pub async fn list(&self, category: Option<&str>) -> AppResult<Vec<Book>> {
        let books = match category {
            Some(category) => {
                sqlx::query_as::<_, Book>(
                    "SELECT * FROM books WHERE category = $1 ORDER BY title",
                )
                .bind(category)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY title")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(books)
    }

    /// List distinct categories sorted alphabetically
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        let categories =
            sqlx::query_scalar::<_, String>("SELECT DISTINCT category FROM books ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    /// Check if a title already exists
    pub async fn title_exists(&self, title: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE title = $1 AND id != $2)")
                .bind(title)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE title = $1)")
                .bind(title)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Create a new book; new books start fully on the shelf
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, category, genres, authors, url, description, pages, available, copies)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.category)
        .bind(&book.genres)
        .bind(&book.authors)
        .bind(&book.url)
        .bind(&book.description)
        .bind(book.pages)
        .bind(book.copies)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update an existing book.
    /// Changing `copies` shifts `available` by the same delta, clamped to the
    /// valid range so active loans stay accounted for.
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                category = COALESCE($3, category),
                genres = COALESCE($4, genres),
                authors = COALESCE($5, authors),
                url = COALESCE($6, url),
                description = COALESCE($7, description),
                pages = COALESCE($8, pages),
                available = GREATEST(0, LEAST(COALESCE($9, copies), available + COALESCE($9, copies) - copies)),
                copies = COALESCE($9, copies)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.category)
        .bind(&book.genres)
        .bind(&book.authors)
        .bind(&book.url)
        .bind(&book.description)
        .bind(book.pages)
        .bind(book.copies)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        Ok(updated)
    }

    /// Delete a book. Refused while loans reference it.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let has_loans: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if has_loans {
            return Err(AppError::Conflict(
                "Book has loan history and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }

    /// Count books in the catalog
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
