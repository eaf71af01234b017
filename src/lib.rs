//! A minimal HTTP/1.1 server written directly against tokio TCP sockets.
//!
//! Each accepted connection gets one read, one parsed request and one response,
//! then it is closed. Routes: `/`, `/echo/<text>`, `/user-agent` and
//! `/files/<name>` (GET and POST).

pub mod config;
pub mod connection;
pub mod handlers;
pub mod headers;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use config::{Cli, ServerConfig};
pub use server::{HttpServer, ShutdownOutcome};
