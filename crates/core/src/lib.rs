//! Domain types and pure logic for the build configurator core.
//!
//! This crate has zero internal dependencies so it can be used by the
//! store, engine, sync, and any future CLI tooling alike. Everything
//! here is either a plain data type or a pure function; persistence and
//! scheduling live in the `sawbench-store` and `sawbench-engine` crates.

pub mod access;
pub mod error;
pub mod model;
pub mod notes;
pub mod pricing;
pub mod types;
pub mod version;

pub use error::CoreError;
