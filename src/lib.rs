//! apuntes - study notes drive
//!
//! Browse folders of university notes stored in an S3-compatible bucket
//! (Cloudflare R2), with recursive file counts per folder, served as a JSON API.

pub mod config;
pub mod drive;
pub mod error;
pub mod logging;
pub mod store;
pub mod web;

pub use config::Config;
pub use drive::{DriveService, EntryKind, PrefixScope, StoreEntry};
pub use error::{DriveError, ErrorKind, Result};
pub use store::{MemoryStore, ObjectStore, ResilientStore, S3Store, SharedStore};
pub use web::WebServer;
