//! Furnish CLI - database migrations, catalog seeding and order administration.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations (including the sessions table)
//! furnish migrate
//!
//! # Load categories, products, stock and discounts from YAML
//! furnish seed catalog.yaml
//!
//! # Record payment for an order
//! furnish order mark-paid 42
//!
//! # Move an order to another delivery slot
//! furnish order set-delivery 42 7
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the catalog from a YAML file
//! - `order` - Administrative order changes

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "furnish")]
#[command(author, version, about = "Furnish CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog from a YAML file
    Seed {
        /// Path to the catalog YAML file
        file: String,
    },
    /// Administrative order changes
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Record payment for an order
    MarkPaid {
        /// Order ID
        id: i32,
    },
    /// Point an order at another delivery slot
    SetDelivery {
        /// Order ID
        id: i32,
        /// Delivery ID
        delivery: i32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { file } => commands::seed::catalog(&file).await?,
        Commands::Order { action } => match action {
            OrderAction::MarkPaid { id } => commands::order::mark_paid(id).await?,
            OrderAction::SetDelivery { id, delivery } => {
                commands::order::set_delivery(id, delivery).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_order_subcommands() {
        let cli = Cli::try_parse_from(["furnish", "order", "set-delivery", "42", "7"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Order {
                action: OrderAction::SetDelivery { id: 42, delivery: 7 }
            })
        ));
    }
}
