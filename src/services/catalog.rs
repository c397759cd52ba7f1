//! Catalog management service

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List books sorted by title, honoring the category filter
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.list(query.category_filter()).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Get book by its unique title
    pub async fn get_book_by_title(&self, title: &str) -> AppResult<Book> {
        self.repository.books.get_by_title(title).await
    }

    /// List distinct categories
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        self.repository.books.categories().await
    }

    /// Create a new book
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        if self.repository.books.title_exists(&book.title, None).await? {
            return Err(AppError::Conflict(format!(
                "A book titled '{}' already exists",
                book.title
            )));
        }

        self.repository.books.create(&book).await
    }

    /// Update an existing book
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        if let Some(ref title) = book.title {
            if self.repository.books.title_exists(title, Some(id)).await? {
                return Err(AppError::Conflict(format!(
                    "A book titled '{}' already exists",
                    title
                )));
            }
        }

        self.repository.books.update(id, &book).await
    }

    /// Delete a book
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }
}
