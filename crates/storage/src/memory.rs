use async_trait::async_trait;
use billsync_core::{BillId, BillStore, NewBill, PersistedBill, StoreError};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

/// In-memory bill store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryBillStore {
    bills: Mutex<Vec<PersistedBill>>,
}

impl MemoryBillStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `bills` already stored, in the given order.
    pub fn seeded(bills: Vec<PersistedBill>) -> Self {
        Self {
            bills: Mutex::new(bills),
        }
    }

    pub fn len(&self) -> usize {
        self.bills().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bills().is_empty()
    }

    fn bills(&self) -> MutexGuard<'_, Vec<PersistedBill>> {
        self.bills.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BillStore for MemoryBillStore {
    async fn find(&self, amount: f64, date: DateTime<Utc>) -> Result<Vec<PersistedBill>, StoreError> {
        Ok(self
            .bills()
            .iter()
            .filter(|b| b.amount == amount && b.date == date)
            .cloned()
            .collect())
    }

    async fn insert(&self, bill: NewBill) -> Result<PersistedBill, StoreError> {
        let stored = PersistedBill::from_new(BillId(Uuid::new_v4().to_string()), bill);
        self.bills().push(stored.clone());
        debug!("Stored bill {} for {}", stored.id, stored.vendor_name);
        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<PersistedBill>, StoreError> {
        Ok(self.bills().clone())
    }
}
