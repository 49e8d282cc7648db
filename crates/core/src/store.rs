use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use super::bill::{NewBill, PersistedBill};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Store call did not complete within {0:?}")]
    Timeout(Duration),
    #[error("Corrupt stored bill {id}: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("Date {0} is outside the storable range")]
    UnsupportedDate(DateTime<Utc>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

/// Persistence contract the reconciler needs. Implementations must serialize
/// concurrent inserts that could create mutual fuzzy duplicates if they are
/// shared across processes.
#[async_trait]
pub trait BillStore: Send + Sync {
    /// All bills whose amount and date are exactly equal to the arguments,
    /// in store order. Empty when nothing matches.
    async fn find(&self, amount: f64, date: DateTime<Utc>) -> Result<Vec<PersistedBill>, StoreError>;

    /// Persists a new bill under a freshly assigned identifier.
    async fn insert(&self, bill: NewBill) -> Result<PersistedBill, StoreError>;

    async fn list_all(&self) -> Result<Vec<PersistedBill>, StoreError>;
}
