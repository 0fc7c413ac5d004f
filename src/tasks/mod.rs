//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Janitor: Sweeps expired items out of every in-process tier

mod janitor;

pub use janitor::{spawn_janitor, spawn_janitor_for, JanitorConfig, JanitorHandle};
