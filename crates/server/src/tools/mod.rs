//! MCP tool implementations.
//!
//! This module contains all tools exposed by the quire reader server.

pub mod cache;
pub mod reader_key;
pub mod reader_open;
