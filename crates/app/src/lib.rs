//! # CampusBridge App
//!
//! Application layer - context wiring and main entry point.
//!
//! This crate contains:
//! - Application context (dependency injection, startup and teardown)
//! - Tracing initialisation
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod context;
pub mod utils;

pub use context::AppContext;
