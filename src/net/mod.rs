//! Network boundary for collaborator services
//!
//! Feedback submission, share-link creation and settings save all go through
//! [`ApiClient`]; failure-prone calls can be wrapped in
//! [`retry_with_backoff`] for bounded exponential retries.

pub mod retry;
pub mod client;
pub mod errors;

pub use retry::*;
pub use client::*;
pub use errors::*;
