//! Kuteera core types and utilities

pub mod config;
pub mod error;
pub mod identity;
pub mod storage;
pub mod token;

pub use config::{
    ApiConfig, IdentityPolicy, KuteeraConfig, LoggingConfig, SessionConfig, StorageConfig,
};
pub use error::{CoreError, CoreResult};
pub use identity::{Identity, Role};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use token::{TokenClaims, decode_claims, decode_expiry, keys};
