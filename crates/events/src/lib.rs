//! In-process event bus for build, render, and sync progress.

pub mod bus;

pub use bus::{BuildEvent, EventBus};
