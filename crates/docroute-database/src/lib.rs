//! # docroute-database
//!
//! The [`JobStore`] abstraction over the shared job table, its PostgreSQL
//! implementation, connection management, and migrations.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

#[cfg(feature = "memory-store")]
pub mod memory;

pub use connection::DatabasePool;
pub use repositories::PgJobStore;
pub use store::{JobStore, StateCount};

#[cfg(feature = "memory-store")]
pub use memory::MemoryJobStore;
