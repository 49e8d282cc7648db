use billsync_core::{
    parse_bill_date, simplify_dates, BillStore, BillView, NewBill, PersistedBill, RawBillRecord,
    StoreError,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

use crate::csv::parse_and_validate;
use crate::dedup::remove_batch_duplicates;
use crate::error::{IngestError, RowFault};
use crate::util::vendor_names_similar;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A stored bill already covered the record.
    Existing(PersistedBill),
    /// Nothing matched, so the record was stored.
    Inserted(PersistedBill),
}

impl MatchOutcome {
    pub fn bill(&self) -> &PersistedBill {
        match self {
            MatchOutcome::Existing(bill) | MatchOutcome::Inserted(bill) => bill,
        }
    }

    pub fn into_bill(self) -> PersistedBill {
        match self {
            MatchOutcome::Existing(bill) | MatchOutcome::Inserted(bill) => bill,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, MatchOutcome::Inserted(_))
    }
}

/// Resolves uploaded bills against a [`BillStore`], reusing stored bills that
/// fuzzy-match and inserting the rest.
pub struct Reconciler {
    store: Arc<dyn BillStore>,
    store_timeout: Option<Duration>,
    locks: KeyLocks,
}

impl Reconciler {
    pub fn new(store: Arc<dyn BillStore>) -> Self {
        Self {
            store,
            store_timeout: None,
            locks: KeyLocks::default(),
        }
    }

    /// Bounds every store call; an elapsed call fails the ingestion.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    /// Full upload flow: parse, reconcile, and normalize for display.
    pub async fn ingest(&self, data: &[u8]) -> Result<Vec<BillView>, IngestError> {
        let parsed = parse_and_validate(data)?;
        let bills = self.reconcile(parsed).await?;
        Ok(simplify_dates(&bills))
    }

    /// Deduplicates the batch, then resolves each survivor in input order so
    /// that bills inserted earlier are visible to later lookups.
    ///
    /// Every date is parsed before the store is touched, so a bad date aborts
    /// the batch without inserting anything.
    pub async fn reconcile(&self, records: Vec<RawBillRecord>) -> Result<Vec<PersistedBill>, IngestError> {
        let received = records.len();
        let deduplicated = remove_batch_duplicates(records);

        let dated = deduplicated
            .into_iter()
            .map(|record| parse_record_date(&record).map(|date| (record, date)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut resolved = Vec::with_capacity(dated.len());
        let mut inserted = 0usize;
        for (record, date) in &dated {
            let outcome = self.resolve(record, *date).await?;
            if outcome.is_inserted() {
                inserted += 1;
            }
            resolved.push(outcome.into_bill());
        }

        info!(
            received,
            unique = resolved.len(),
            inserted,
            "Reconciled bill batch"
        );
        Ok(resolved)
    }

    /// Resolves one record: reuse the first stored bill with the same amount
    /// and date whose vendor name is similar, otherwise insert it.
    pub async fn match_record(&self, record: &RawBillRecord) -> Result<MatchOutcome, IngestError> {
        let date = parse_record_date(record)?;
        self.resolve(record, date).await
    }

    pub async fn list_all(&self) -> Result<Vec<BillView>, IngestError> {
        let bills = self.call(self.store.list_all()).await?;
        Ok(simplify_dates(&bills))
    }

    async fn resolve(&self, record: &RawBillRecord, date: DateTime<Utc>) -> Result<MatchOutcome, IngestError> {
        // Held across find and insert so concurrent uploads sharing this
        // reconciler cannot both insert the same bill.
        let _guard = self.locks.acquire(record.amount, date).await;

        let candidates = self.call(self.store.find(record.amount, date)).await?;
        if let Some(existing) = candidates
            .into_iter()
            .find(|candidate| vendor_names_similar(&record.vendor_name, &candidate.vendor_name))
        {
            debug!(
                "Bill {:?} matches stored bill {} ({:?})",
                record.vendor_name, existing.id, existing.vendor_name
            );
            return Ok(MatchOutcome::Existing(existing));
        }

        let stored = self
            .call(self.store.insert(NewBill {
                amount: record.amount,
                vendor_name: record.vendor_name.clone(),
                date,
            }))
            .await?;
        debug!("Bill {:?} stored as {}", record.vendor_name, stored.id);
        Ok(MatchOutcome::Inserted(stored))
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match self.store_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| StoreError::Timeout(limit))?,
            None => fut.await,
        }
    }
}

fn parse_record_date(record: &RawBillRecord) -> Result<DateTime<Utc>, IngestError> {
    parse_bill_date(&record.date).map_err(|e| IngestError::RowParsing {
        line: None,
        row: format!("{},{},{}", record.amount, record.vendor_name, record.date),
        reason: RowFault::InvalidDate(e),
    })
}

// ── Per-key advisory locks ────────────────────────────────────────────────────

/// Amount bits (with -0.0 folded into 0.0) and the instant in nanoseconds.
type LockKey = (u64, i128);

#[derive(Default)]
struct KeyLocks {
    held: Mutex<HashMap<LockKey, KeySlot>>,
}

/// Registry entry; `users` counts holders and waiters alike.
#[derive(Default)]
struct KeySlot {
    lock: Arc<tokio::sync::Mutex<()>>,
    users: usize,
}

/// Registered before the lock is awaited, so a waiter cancelled mid-wait
/// still releases its registration.
struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: LockKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    async fn acquire(&self, amount: f64, date: DateTime<Utc>) -> KeyGuard<'_> {
        let amount_bits = if amount == 0.0 { 0 } else { amount.to_bits() };
        let instant = i128::from(date.timestamp()) * 1_000_000_000
            + i128::from(date.timestamp_subsec_nanos());
        let key = (amount_bits, instant);

        let lock = {
            let mut map = self.map();
            let slot = map.entry(key).or_default();
            slot.users += 1;
            slot.lock.clone()
        };
        let mut entry = KeyGuard {
            locks: self,
            key,
            guard: None,
        };
        entry.guard = Some(lock.lock_owned().await);
        entry
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<LockKey, KeySlot>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut map = self.locks.map();
        if let Some(slot) = map.get_mut(&self.key) {
            slot.users -= 1;
            if slot.users == 0 {
                map.remove(&self.key);
            }
        }
    }
}
