//! Postgres repositories for the receipt intake pipeline.
//!
//! Two repositories: [`QuotaRepository`] owns the atomic daily upload
//! counter, [`ExpenseRepository`] owns the fingerprint duplicate index
//! and the reviewed-expense commit.

pub mod expense;
pub mod quota;

pub use expense::ExpenseRepository;
pub use quota::QuotaRepository;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to Postgres and run pending migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, anyhow::Error> {
    use anyhow::Context;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to Postgres")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}
