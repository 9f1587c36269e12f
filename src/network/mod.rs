//! Network layer for Latlab
//!
//! Accepts TCP connections, negotiates HTTP/1.1 or h2c, and routes each
//! request to the simulation engine with bounded connection concurrency.

mod connection_pool;
mod handler;
mod http;
mod router;

pub use connection_pool::{ConnectionGuard, ConnectionPool};
pub use handler::NetworkHandler;
pub use http::HttpHandler;
pub use router::Route;
