//! Data models for the Libris server

pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookSummary};
pub use loan::{Loan, LoanDetails};
pub use user::User;
