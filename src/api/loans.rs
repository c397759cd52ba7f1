//! Loan (borrow/return/renew) endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::loan::{CreateLoan, Loan, LoanDetails},
    models::user::Claims,
};

use super::AuthenticatedUser;

/// Borrow request
#[derive(Deserialize, ToSchema)]
pub struct BorrowRequest {
    /// Book to borrow
    pub book_id: i32,
    /// Borrow on behalf of another member (admin only)
    pub user_id: Option<i32>,
}

/// Loan response with computed due date
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    pub id: i32,
    pub book_id: i32,
    pub due_date: DateTime<Utc>,
    pub renewals: i16,
    pub message: String,
}

/// Return response with loan details
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub status: String,
    pub loan: LoanDetails,
}

/// Members may only touch their own loans; admins may touch any
fn require_owner_or_admin(claims: &Claims, loan: &Loan) -> AppResult<()> {
    if claims.is_admin || claims.user_id == loan.user_id {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Loan belongs to another member".to_string(),
        ))
    }
}

/// Get the authenticated member's active loans
#[utoipa::path(
    get,
    path = "/loans/me",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active loans", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_my_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.get_user_loans(claims.user_id).await?;
    Ok(Json(loans))
}

/// Get active loans for a specific member (admin only)
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Member's active loans", body = Vec<LoanDetails>),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    if claims.user_id != user_id {
        claims.require_admin()?;
    }

    let loans = state.services.loans.get_user_loans(user_id).await?;
    Ok(Json(loans))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 404, description = "Book or user not found"),
        (status = 422, description = "No copies available or book already on loan to this member")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    // Borrowing for someone else requires admin rights
    let user_id = match request.user_id {
        Some(id) if id != claims.user_id => {
            claims.require_admin()?;
            id
        }
        _ => claims.user_id,
    };

    let loan = state
        .services
        .loans
        .create_loan(CreateLoan {
            user_id,
            book_id: request.book_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            id: loan.id,
            book_id: loan.book_id,
            due_date: loan.due_date,
            renewals: loan.renewals,
            message: "Book borrowed successfully".to_string(),
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    require_owner_or_admin(&claims, &loan)?;

    let loan = state.services.loans.return_loan(loan_id).await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        loan,
    }))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan renewed", body = LoanResponse),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Max renewals reached or already returned")
    )
)]
pub async fn renew_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    require_owner_or_admin(&claims, &loan)?;

    let (new_due_date, renewals) = state.services.loans.renew_loan(loan_id).await?;

    Ok(Json(LoanResponse {
        id: loan_id,
        book_id: loan.book_id,
        due_date: new_due_date,
        renewals,
        message: format!("Loan renewed ({} renewals)", renewals),
    }))
}
