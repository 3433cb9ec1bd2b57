//! Error taxonomy for catalog configuration, ingestion and file loading.
//!
//! Queries never fail: "no results" and "not yet built" both resolve to an
//! empty list. Everything here is raised at configuration load, ingestion,
//! or selection time.

use thiserror::Error;

/// Errors that can occur while configuring or loading catalogs.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A catalog code referenced by selection or precedence is not declared.
    #[error("Unknown catalog code: {0}")]
    UnknownCatalog(String),

    /// The same catalog code was declared twice.
    #[error("Catalog code declared more than once: {0}")]
    DuplicateCatalog(String),

    /// The keypad letter table is incomplete or ambiguous.
    #[error("Invalid keypad layout: {0}")]
    InvalidKeypad(String),

    /// A catalog row failed ingestion checks.
    #[error("Invalid row {catalog_code} {sequence}: {reason}")]
    InvalidRow {
        catalog_code: String,
        sequence: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
