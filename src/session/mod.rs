//! Session state and persistence
//!
//! This module provides the chat session model, the total sanitization layer
//! that guards it, the in-memory store that owns it, and the boundary that
//! persists it to client-side storage.

mod types;
mod sanitize;
mod store;
mod errors;
mod database;
mod persistence;

pub use types::*;
pub use sanitize::*;
pub use store::*;
pub use errors::*;
pub use database::*;
pub use persistence::*;
