pub mod backend;
pub mod campaign;
pub mod event;
pub mod export;
pub mod schema;
pub mod stats;
pub mod target;

pub use backend::DuckDbBackend;

/// Re-export the `duckdb` crate so consumers (especially tests) can use
/// `phishsim_duckdb::duckdb::params!` without an extra dependency.
pub use duckdb;
