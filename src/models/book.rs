//! Book (catalog entry) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Full book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    /// Unique title, also used for lookup on the detail page
    pub title: String,
    pub category: String,
    pub genres: Vec<String>,
    pub authors: Vec<String>,
    /// Cover image URL
    pub url: Option<String>,
    /// Description paragraphs
    pub description: Vec<String>,
    pub pages: Option<i32>,
    /// Copies currently on the shelf; never below 0 or above `copies`
    pub available: i32,
    /// Total copies owned by the library
    pub copies: i32,
}

/// Short book representation for lists and loan details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub category: String,
    pub authors: Vec<String>,
    pub available: i32,
    pub copies: i32,
}

/// Book list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Category filter; absent or "All" returns every book
    pub category: Option<String>,
}

impl BookQuery {
    /// Normalized category filter: `None` means no filtering
    pub fn category_filter(&self) -> Option<&str> {
        match self.category.as_deref() {
            None | Some("All") | Some("") => None,
            Some(c) => Some(c),
        }
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 1, message = "At least one genre is required"))]
    pub genres: Vec<String>,
    #[validate(length(min = 1, message = "At least one author is required"))]
    pub authors: Vec<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub description: Vec<String>,
    pub pages: Option<i32>,
    #[validate(range(min = 0, message = "Copies must not be negative"))]
    #[serde(default)]
    pub copies: i32,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub category: Option<String>,
    pub genres: Option<Vec<String>>,
    pub authors: Option<Vec<String>>,
    pub url: Option<String>,
    pub description: Option<Vec<String>>,
    pub pages: Option<i32>,
    #[validate(range(min = 0, message = "Copies must not be negative"))]
    pub copies: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_filter_treats_all_as_no_filter() {
        let q = BookQuery { category: Some("All".to_string()) };
        assert_eq!(q.category_filter(), None);

        let q = BookQuery { category: None };
        assert_eq!(q.category_filter(), None);

        let q = BookQuery { category: Some(String::new()) };
        assert_eq!(q.category_filter(), None);
    }

    #[test]
    fn category_filter_passes_real_categories() {
        let q = BookQuery { category: Some("Fiction".to_string()) };
        assert_eq!(q.category_filter(), Some("Fiction"));
    }
}
