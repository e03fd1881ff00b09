//! convo - client-side chat session state
//!
//! The crate tracks chat sessions and their messages, normalizes whatever
//! arrives from storage or the network into well-formed records, and exposes
//! the mutations the UI layer is allowed to perform.
//!
//! - [`session`]: records, sanitization, the session store and persistence
//! - [`net`]: retry with backoff and the collaborator HTTP client
//! - [`render`]: display strings for message bodies and session lists
//! - [`config`]: layered configuration

pub mod cli;
pub mod config;
pub mod net;
pub mod render;
pub mod session;
pub mod utils;
