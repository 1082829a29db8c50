// MCP serve surface
// A compact JSON-RPC 2.0 server over stdio exposing the knowledge base
// read operations as tools for agent frontends

pub mod protocol;
pub mod server;
pub mod tools;

#[cfg(test)]
mod tests;

pub use server::{McpServer, ToolHandler};
