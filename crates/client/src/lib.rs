//! Page-side code for precios.
//!
//! This crate provides the HTTP transport, the product API client, the page
//! session that routes searches between the API, the query cache and the
//! catalog, and the autocomplete state machine.

pub mod api;
pub mod autocomplete;
pub mod fetch;
pub mod session;

pub use api::{ProductApi, ProductQuery};
pub use autocomplete::{Autocomplete, FocusTarget, InputAction, Key, KeyOutcome};
pub use fetch::{FetchConfig, HttpNetwork};
pub use session::{ResultSource, SearchOutcome, Session};
