//! Shared library surface for the session host and its tests.

pub mod api;
pub mod backoff;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod loader;
pub mod loops;
pub mod state;
