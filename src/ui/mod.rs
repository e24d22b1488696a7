//! Status API
//!
//! Read-only HTTP view of the running node, served from the snapshot the
//! run loop publishes.

pub mod handlers;
pub mod server;

pub use server::{router, AppState, WebServer};
