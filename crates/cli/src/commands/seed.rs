//! Seed the catalog from a YAML file.
//!
//! The file is parsed and validated before connecting to the database. Rows
//! are upserted by their natural keys (slug, name, article), so seeding the
//! same file twice leaves one copy of each record.

use furnish_storefront::db::{CatalogSeed, PgStore};
use tracing::info;

use super::{CliError, connect};

/// Seed the catalog from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, fails validation, or the
/// database rejects the data.
pub async fn catalog(file_path: &str) -> Result<(), CliError> {
    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let seed = CatalogSeed::from_yaml(&content)?;

    info!(
        products = seed.products.len(),
        discounts = seed.discounts.len(),
        "Catalog validated"
    );

    let store = PgStore::new(connect().await?);
    let summary = store.seed(&seed).await?;

    info!("Seeding complete!");
    info!("  Users: {}", summary.users);
    info!("  Categories: {}", summary.categories);
    info!("  Products: {}", summary.products);
    info!("  Discounts: {}", summary.discounts);
    Ok(())
}
