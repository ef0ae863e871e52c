//! Gmail API module
//!
//! Contains types, session acquisition, the HTTP client and the mail
//! operations built on top of it.

pub mod auth;
pub mod client;
pub mod mailbox;
pub mod types;
pub mod utils;
