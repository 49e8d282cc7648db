pub mod bill;
pub mod date;
pub mod store;

pub use bill::{simplify_dates, BillId, BillView, NewBill, PersistedBill, RawBillRecord};
pub use date::{display_date, is_supported, parse_bill_date, DateParseError, SUPPORTED_YEARS};
pub use store::{BillStore, StoreError};
