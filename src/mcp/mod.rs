//! MCP (Model Context Protocol) module
//!
//! Implements the tool registry, the invocation gateway and the stdio server.

pub mod gateway;
pub mod server;
pub mod tools;
pub mod types;
