//! The per-connection service loop and TCP accept loop.

mod command;
mod connection;
mod extension;
mod listener;
mod sink;

pub use connection::serve_connection;
pub use extension::ExtensionAllocator;
pub use listener::run;
pub use sink::TcpSink;
