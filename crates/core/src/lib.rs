//! Core types and shared functionality for precios.
//!
//! This crate provides:
//! - Cache partition store with SQLite backend
//! - In-memory query cache and substring search over the product catalog
//! - The HTTP request/response model and the `Network` seam
//! - The page/worker control-message protocol
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod query_cache;
pub mod search;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use cache::{Partition, PartitionRole, PartitionSet, PartitionStore};
pub use catalog::{Catalog, CatalogSource, HistoryResponse, Product, SearchResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Method, Network, Request, Response};
pub use message::{WorkerChannel, WorkerMessage, WorkerReply};
pub use query_cache::{Clock, ManualClock, QueryCache, SystemClock};
