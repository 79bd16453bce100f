//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! stride-cli migrate
//! ```
//!
//! Migrations live in `crates/storefront/migrations/` and create the `shop`
//! schema. The storefront never migrates on startup.

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
