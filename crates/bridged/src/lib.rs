//! bridged - Test Asset Migration Daemon
//!
//! Library components for the daemon process: adapter interfaces, the
//! migration workflow engine, the workflow registry, and the local HTTP
//! control plane. Translation itself lives in `bridge-core`.

pub mod adapter;
pub mod adapters;
pub mod registry;
pub mod server;
pub mod storage;
pub mod workflow;

/// Type alias for application-level errors with context and backtraces.
pub type AppResult<T> = eyre::Result<T>;

/// Systems a migration job may name as source or target. Adapters exist
/// for all of them; mappers currently ship for zephyr and qtest, and
/// records of other systems surface as per-record translation errors.
pub const RECOGNIZED_SYSTEMS: &[&str] =
    &["zephyr", "qtest", "azure-devops", "rally", "hp-alm", "excel"];
