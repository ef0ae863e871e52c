//! Draft Email MCP Server Library
//!
//! A Model Context Protocol (MCP) server that lists unread Gmail messages and
//! drafts replies to them.

pub mod config;
pub mod error;
pub mod gmail;
pub mod mcp;

pub use config::Config;
pub use error::{DraftMailError, ErrorKind, Result};
