pub mod db;
pub mod memory;

pub use db::{create_db, create_memory_db, DbPool, SqliteBillStore};
pub use memory::MemoryBillStore;
