//! API integration tests
//!
//! These run against a live server with a seeded database:
//! `RUN_MODE=development cargo run`, then `cargo test -- --ignored`.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Register a throwaway member and return (token, user_id)
async fn register_member(client: &Client, tag: &str) -> (String, i64) {
    let email = format!("member-{}-{}@test.libris.local", tag, std::process::id());
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "reading-room",
            "name": "Test Member"
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse register response");
    let token = body["token"].as_str().expect("No token in response").to_string();
    let user_id = body["user"]["id"].as_i64().expect("No user id in response");
    (token, user_id)
}

/// Log in as the development admin account
async fn admin_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@libris.local",
            "password": "change-me"
        }))
        .send()
        .await
        .expect("Failed to send admin login request");

    assert!(response.status().is_success(), "admin account not seeded");

    let body: Value = response.json().await.expect("Failed to parse admin login");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Find a book with at least one available copy
async fn any_available_book(client: &Client) -> i64 {
    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to list books");

    let body: Value = response.json().await.expect("Failed to parse books response");
    body["books"]
        .as_array()
        .expect("No books array")
        .iter()
        .find(|b| b["available"].as_i64().unwrap_or(0) > 0)
        .and_then(|b| b["id"].as_i64())
        .expect("No available book in seeded catalog")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_register_and_login() {
    let client = Client::new();
    let (_, _) = register_member(&client, "login").await;

    let email = format!("member-login-{}@test.libris.local", std::process::id());
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": email,
            "password": "reading-room",
            "remember": true
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    // Hashed password never leaves the server
    assert!(body["user"]["password"].is_null());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "nobody@test.libris.local",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_register_rejects_short_password() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "email": "short@test.libris.local",
            "password": "abcd",
            "name": "Too Short"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_get_current_user() {
    let client = Client::new();
    let (token, user_id) = register_member(&client, "me").await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["id"].as_i64(), Some(user_id));
}

#[tokio::test]
#[ignore]
async fn test_list_books_sorted_by_title() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let titles: Vec<&str> = body["books"]
        .as_array()
        .expect("No books array")
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();

    assert!(!titles.is_empty());
    let mut sorted = titles.clone();
    sorted.sort();
    assert_eq!(titles, sorted);
}

#[tokio::test]
#[ignore]
async fn test_filter_books_by_category() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books?category=Fiction", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["category"], "Fiction");
    for book in body["books"].as_array().expect("No books array") {
        assert_eq!(book["category"], "Fiction");
    }

    // "All" behaves as no filter
    let all: Value = client
        .get(format!("{}/books?category=All", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(all["total"].as_u64() >= body["total"].as_u64());
}

#[tokio::test]
#[ignore]
async fn test_get_book_by_title() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books/by-title/Dune", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["title"], "Dune");

    let missing = client
        .get(format!("{}/books/by-title/No%20Such%20Book", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_loans_require_authentication() {
    let client = Client::new();

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "book_id": 1 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_borrow_return_renew_lifecycle() {
    let client = Client::new();
    let (token, _) = register_member(&client, "lifecycle").await;
    let book_id = any_available_book(&client).await;

    // Borrow
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to borrow");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse loan response");
    let loan_id = body["id"].as_i64().expect("No loan id");
    assert_eq!(body["renewals"], 0);

    // Borrowing the same book again is rejected
    let dup = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send duplicate borrow");
    assert_eq!(dup.status(), 422);

    // The loan shows up in the member's list
    let loans: Value = client
        .get(format!("{}/loans/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to list loans")
        .json()
        .await
        .expect("Failed to parse loans");
    assert!(loans
        .as_array()
        .expect("No loans array")
        .iter()
        .any(|l| l["id"].as_i64() == Some(loan_id)));

    // Renew twice (the default cap), third must fail
    for _ in 0..2 {
        let renew = client
            .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("Failed to renew");
        assert!(renew.status().is_success());
    }

    let over_cap = client
        .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send renew");
    assert_eq!(over_cap.status(), 422);

    // Return
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to return");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse return response");
    assert_eq!(body["status"], "returned");

    // Returning twice is rejected
    let again = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send second return");
    assert_eq!(again.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_borrow_adjusts_availability() {
    let client = Client::new();
    let (token, _) = register_member(&client, "counters").await;
    let book_id = any_available_book(&client).await;

    let before: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to get book")
        .json()
        .await
        .expect("Failed to parse book");
    let available_before = before["available"].as_i64().unwrap();

    let loan: Value = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to borrow")
        .json()
        .await
        .expect("Failed to parse loan");
    let loan_id = loan["id"].as_i64().unwrap();

    let after: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to get book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(after["available"].as_i64().unwrap(), available_before - 1);

    // Return restores the counter
    client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to return");

    let restored: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to get book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(restored["available"].as_i64().unwrap(), available_before);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_renewals_respect_cap() {
    let client = Client::new();
    let (token, _) = register_member(&client, "renew-race").await;
    let book_id = any_available_book(&client).await;

    let loan: Value = client
        .post(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to borrow")
        .json()
        .await
        .expect("Failed to parse loan");
    let loan_id = loan["id"].as_i64().expect("No loan id");

    // Use up one renewal, leaving exactly one under the default cap of 2
    let first = client
        .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to renew");
    assert!(first.status().is_success());

    // Two simultaneous renews must not both claim the last slot
    let renew = |c: Client, t: String| async move {
        c.post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
            .header("Authorization", format!("Bearer {}", t))
            .send()
            .await
            .expect("Failed to send renew")
            .status()
    };
    let (a, b) = tokio::join!(
        renew(client.clone(), token.clone()),
        renew(client.clone(), token.clone())
    );

    let successes = [a, b].iter().filter(|s| s.is_success()).count();
    assert_eq!(successes, 1, "exactly one renewal may take the last slot");
    assert!([a, b].contains(&reqwest::StatusCode::UNPROCESSABLE_ENTITY));

    // Loan sits at the cap afterwards
    let loans: Value = client
        .get(format!("{}/loans/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to list loans")
        .json()
        .await
        .expect("Failed to parse loans");
    let renewals = loans
        .as_array()
        .expect("No loans array")
        .iter()
        .find(|l| l["id"].as_i64() == Some(loan_id))
        .and_then(|l| l["renewals"].as_i64())
        .expect("Loan missing from list");
    assert_eq!(renewals, 2);

    // Clean up so the copy goes back on the shelf
    client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to return");
}

#[tokio::test]
#[ignore]
async fn test_admin_book_lifecycle() {
    let client = Client::new();
    let token = admin_token(&client).await;
    let title = format!("Lifecycle Test Book {}", std::process::id());

    // Create: new books start fully on the shelf
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": title,
            "category": "Fiction",
            "genres": ["Test"],
            "authors": ["Nobody"],
            "copies": 2
        }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), 201);

    let book: Value = response.json().await.expect("Failed to parse book");
    let book_id = book["id"].as_i64().expect("No book id");
    assert_eq!(book["available"], 2);
    assert_eq!(book["copies"], 2);

    // Growing the stock moves available by the same delta
    let grown: Value = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "copies": 5 }))
        .send()
        .await
        .expect("Failed to update book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(grown["available"], 5);
    assert_eq!(grown["copies"], 5);

    // Shrinking clamps available into the new range
    let shrunk: Value = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "copies": 1 }))
        .send()
        .await
        .expect("Failed to update book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(shrunk["available"], 1);
    assert_eq!(shrunk["copies"], 1);

    // Delete: a book with no loan history goes away
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to delete book");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to get book");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_stats_report_all_counters() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    for field in ["books", "users", "loans", "active_loans", "overdue_loans"] {
        assert!(body[field].is_number(), "missing stats field {}", field);
    }
    // Active loans are a subset of all loans recorded
    assert!(body["loans"].as_i64() >= body["active_loans"].as_i64());
}

#[tokio::test]
#[ignore]
async fn test_stats_require_admin() {
    let client = Client::new();
    let (token, _) = register_member(&client, "stats").await;

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_create_book_requires_admin() {
    let client = Client::new();
    let (token, _) = register_member(&client, "create-book").await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "Unauthorized Addition",
            "category": "Fiction",
            "genres": ["Test"],
            "authors": ["Nobody"],
            "copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}
