//! HTTP API layer

pub mod extract;
pub mod handlers;
pub mod routes;
pub mod server;

pub use server::ApiServer;
