//! HTTP API for fileshelf.
//!
//! JSON endpoints for accounts and files, plus the `/signed/...` route that
//! serves URLs issued by the local storage backends.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
