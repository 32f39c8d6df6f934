//! fileshelf - multi-tenant file storage with per-user quotas
//!
//! Each account owns a namespace in an object store and may keep a limited
//! number of size-limited files there, managed over a JSON HTTP API.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod policy;
pub mod service;
pub mod storage;
pub mod web;

pub use auth::{hash_password, validate_password, verify_password, PasswordError};
pub use config::Config;
pub use db::{Database, User, UserRepository};
pub use error::{Result, ShelfError};
pub use policy::QuotaPolicy;
pub use service::FileService;
pub use storage::{ObjectStore, UrlSigner};
