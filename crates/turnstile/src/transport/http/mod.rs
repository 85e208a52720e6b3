//! HTTP transport via axum.

mod routes;
mod server;

pub use routes::routes;
pub use server::{ServerConfig, serve};
