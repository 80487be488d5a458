//! Process-facing surfaces: the stdio tool-calling protocol, the HTTP
//! monitor, and the runtime that wires the library crates together.

pub mod http;
pub mod mcp;
pub mod protocol;
pub mod runtime;

pub use {
    http::{MonitorState, build_monitor_app, serve_monitor},
    mcp::McpServer,
    runtime::Runtime,
};
