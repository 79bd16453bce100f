//! Stride CLI - Database migrations, seeding and promo checks.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! stride-cli migrate
//!
//! # Load categories, products and promotions
//! stride-cli seed data/catalog.yaml
//!
//! # Check a promo code against a subtotal without using it
//! stride-cli promo check SAVE10 --subtotal 1500
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "stride-cli")]
#[command(author, version, about = "Stride Footwear CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog and promotions from a YAML file
    Seed {
        /// Path to the seed file
        file: String,
    },
    /// Inspect promo codes
    Promo {
        #[command(subcommand)]
        action: PromoAction,
    },
}

#[derive(Subcommand)]
enum PromoAction {
    /// Check whether a code applies to a subtotal
    Check {
        /// The code, in any case
        code: String,

        /// Cart subtotal in pesos
        #[arg(short, long)]
        subtotal: Decimal,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::Promo { action } => match action {
            PromoAction::Check { code, subtotal } => {
                commands::promo::check(&code, subtotal).await?;
            }
        },
    }
    Ok(())
}
