//! SQLite-backed cache partition store.
//!
//! This module provides named, versioned request→response partitions using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Request keys hashed with SHA-256 (method + canonical URL)
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Per-entry atomic upserts (last write wins) and all-or-nothing bulk puts
//! - A byte quota enforced on write

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::PartitionStore;
pub use entries::CacheEntry;
pub use partitions::{Partition, PartitionRole, PartitionSet};
