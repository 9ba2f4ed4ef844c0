//! Web API module.
//!
//! This module provides the JSON API over the drive: folder listings, file
//! counts, folder browsing with per-folder counts and in-folder search.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::{create_router, create_swagger_router, ApiDoc};
pub use server::WebServer;
