//! Tools that address the worker context directly.

pub mod fetch;
pub mod message;
pub mod status;
pub mod sync;

pub use fetch::{WorkerFetchParams, fetch_impl};
pub use message::{WorkerMessageParams, message_impl};
pub use status::status_impl;
pub use sync::{WorkerSyncParams, sync_impl};
