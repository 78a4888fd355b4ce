pub mod config;

pub use config::{DEFAULT_DELTA, OracleConfig};
