use async_trait::async_trait;
use billsync_core::{is_supported, BillId, BillStore, NewBill, PersistedBill, StoreError};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use uuid::Uuid;

pub type DbPool = Pool<Sqlite>;

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;
    tracing::info!("Opened bill database at {}", path.display());

    Ok(pool)
}

/// Private in-memory database. The single connection is never recycled, since
/// closing it would discard the data.
pub async fn create_memory_db() -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bills (
            id TEXT PRIMARY KEY,
            amount REAL NOT NULL,
            vendor_name TEXT NOT NULL,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bills_amount_date ON bills (amount, date)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Dates are stored as fixed-width RFC 3339 UTC text so that equality in SQL
/// is equality of instants. Only four-digit years have such a form.
fn encode_date(date: &DateTime<Utc>) -> Result<String, StoreError> {
    if !is_supported(date) {
        return Err(StoreError::UnsupportedDate(*date));
    }
    Ok(date.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

type BillRow = (String, f64, String, String);

fn row_to_bill((id, amount, vendor_name, date): BillRow) -> Result<PersistedBill, StoreError> {
    let date = DateTime::parse_from_rfc3339(&date)
        .map_err(|e| StoreError::Corrupt {
            id: id.clone(),
            reason: format!("bad date {date:?}: {e}"),
        })?
        .with_timezone(&Utc);

    Ok(PersistedBill {
        id: BillId(id),
        amount,
        vendor_name,
        date,
    })
}

pub struct SqliteBillStore {
    pool: DbPool,
}

impl SqliteBillStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl BillStore for SqliteBillStore {
    async fn find(&self, amount: f64, date: DateTime<Utc>) -> Result<Vec<PersistedBill>, StoreError> {
        if !is_supported(&date) {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, BillRow>(
            "SELECT id, amount, vendor_name, date FROM bills WHERE amount = ? AND date = ? ORDER BY rowid",
        )
        .bind(amount)
        .bind(encode_date(&date)?)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.into_iter().map(row_to_bill).collect()
    }

    async fn insert(&self, bill: NewBill) -> Result<PersistedBill, StoreError> {
        let id = Uuid::new_v4().to_string();
        let date = encode_date(&bill.date)?;

        sqlx::query("INSERT INTO bills (id, amount, vendor_name, date) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(bill.amount)
            .bind(&bill.vendor_name)
            .bind(date)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(PersistedBill::from_new(BillId(id), bill))
    }

    async fn list_all(&self) -> Result<Vec<PersistedBill>, StoreError> {
        let rows = sqlx::query_as::<_, BillRow>(
            "SELECT id, amount, vendor_name, date FROM bills ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.into_iter().map(row_to_bill).collect()
    }
}
