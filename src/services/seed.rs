//! Startup seeding: bundled catalog, initial admin, demo loans.
//!
//! Mirrors the catalog bootstrap of the original deployment: when the books
//! table is empty it is populated from the dataset bundled with the binary.
//! Demo loans are backdated by a random number of days so due dates and
//! overdue flags have realistic spread; they are only for development
//! databases and are gated behind `seed.demo_loans`.

use chrono::{Duration, Utc};
use rand::Rng;

use crate::{
    config::AppConfig,
    error::AppResult,
    models::{book::CreateBook, loan::due_date_for},
    repository::Repository,
    services::Services,
};

/// Catalog dataset bundled with the binary
const CATALOG_JSON: &str = include_str!("../../assets/books.json");

/// Demo member accounts used by demo loan seeding
const DEMO_MEMBERS: &[(&str, &str)] = &[
    ("demo.reader1@libris.local", "Demo Reader One"),
    ("demo.reader2@libris.local", "Demo Reader Two"),
];

/// Run all configured seeding steps. Every step is idempotent.
pub async fn run(services: &Services, repository: &Repository, config: &AppConfig) -> AppResult<()> {
    if config.seed.catalog {
        seed_catalog(repository).await?;
    }

    if let (Some(email), Some(password)) =
        (&config.seed.admin_email, &config.seed.admin_password)
    {
        services.users.ensure_admin(email, password).await?;
    }

    if config.seed.demo_loans {
        seed_demo_loans(services, repository, config).await?;
    }

    Ok(())
}

/// Populate the book catalog from the bundled dataset when empty
async fn seed_catalog(repository: &Repository) -> AppResult<()> {
    let existing = repository.books.count().await?;
    if existing > 0 {
        tracing::debug!("Book catalog already holds {} books, skipping seed", existing);
        return Ok(());
    }

    let books: Vec<CreateBook> = serde_json::from_str(CATALOG_JSON)
        .map_err(|e| crate::error::AppError::Internal(format!("Invalid bundled catalog: {}", e)))?;

    tracing::info!("Book catalog is empty, seeding {} books", books.len());

    for book in &books {
        repository.books.create(book).await?;
    }

    Ok(())
}

/// Create demo members and a spread of backdated loans
async fn seed_demo_loans(
    services: &Services,
    repository: &Repository,
    config: &AppConfig,
) -> AppResult<()> {
    if repository.loans.count_total().await? > 0 {
        tracing::debug!("Loans already exist, skipping demo loan seed");
        return Ok(());
    }

    let mut member_ids = Vec::new();
    for (email, name) in DEMO_MEMBERS {
        let member = match repository.users.get_by_email(email).await? {
            Some(user) => user,
            None => {
                let password = services.users.hash_password(&random_password())?;
                repository.users.create(email, name, &password, false).await?
            }
        };
        member_ids.push(member.id);
    }

    let books = repository.books.list(None).await?;
    let period = config.loans.period_days.max(1);
    let backdate_days = config.seed.backdate_days.max(1);
    let now = Utc::now();

    // Draw all random values up front; ThreadRng must not live across awaits
    let plan: Vec<(i64, bool, i64)> = {
        let mut rng = rand::thread_rng();
        books
            .iter()
            .take(12)
            .map(|_| {
                (
                    rng.gen_range(0..=backdate_days),
                    rng.gen_bool(0.5),
                    rng.gen_range(1..=period),
                )
            })
            .collect()
    };

    let mut created = 0;
    for (i, (book, (backdate, returned, held_days))) in books.iter().zip(plan).enumerate() {
        let user_id = member_ids[i % member_ids.len()];
        let borrow_date = now - Duration::days(backdate);
        let due_date = due_date_for(borrow_date, period);
        let return_date = returned.then(|| {
            // Returned somewhere between borrow and due
            borrow_date + Duration::days(held_days.min(period))
        });

        if repository
            .loans
            .create_backdated(user_id, book.id, borrow_date, due_date, return_date)
            .await?
            .is_some()
        {
            created += 1;
        }
    }

    tracing::info!("Seeded {} demo loans for {} demo members", created, member_ids.len());

    Ok(())
}

fn random_password() -> String {
    let mut rng = rand::thread_rng();
    (0..24)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}
