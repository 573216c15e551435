//! MCP Server for the FAQ knowledge base
//!
//! Exposes question answering and imports to MCP clients over stdio.

mod server;

pub use server::run_mcp_server;
