pub mod config;
pub mod routes;
pub mod telemetry;

pub use config::ServerConfig;
pub use routes::{router, AppState};
