//! Worker-side code for precios.
//!
//! This crate provides the request-interception strategy engine, the
//! install/activate lifecycle with its partition swap, and the control
//! message inbox. `InterceptingNetwork` plugs the worker into the page as a
//! `Network`.

pub mod intercept;
pub mod lifecycle;
pub mod manifest;
pub mod strategy;
pub mod worker;

pub use intercept::InterceptingNetwork;
pub use lifecycle::{Coordinator, LifecycleState, SYNC_TAG};
pub use manifest::Manifest;
pub use strategy::{Interception, Route, Step, StrategyEngine};
pub use worker::{Worker, spawn_inbox};
