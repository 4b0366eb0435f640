//! Persistence plumbing shared by the domain repositories.
//!
//! Each domain module (`template`, `apikey`, `email`) owns its repository trait
//! together with an in-memory and a PostgreSQL implementation. This module holds
//! what they share:
//! - `StoreError`: the error every repository returns
//! - `PostgresPool`: connection pool plus schema bootstrap
//! - `create_repositories`: picks the backend from configuration

mod factory;
pub mod pool;

use thiserror::Error;

pub use factory::{create_repositories, Repositories};
pub use pool::{PostgresPool, PostgresPoolError};

/// Errors returned by repository implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A row with the same key already exists
    #[error("Record already exists: {0}")]
    Conflict(String),

    /// A stored value could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A value does not fit its column
    #[error("Value out of range: {0}")]
    OutOfRange(String),
}

impl StoreError {
    /// Map a unique-constraint violation to `Conflict`, keeping other errors as-is.
    pub fn from_insert(err: sqlx::Error, key: &str) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return StoreError::Conflict(key.to_string());
            }
        }
        StoreError::Postgres(err)
    }
}

/// Convert to an `INTEGER` column value, refusing anything past `i32::MAX`.
pub(crate) fn to_int4(value: u32, field: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::OutOfRange(format!("{} = {}", field, value)))
}
