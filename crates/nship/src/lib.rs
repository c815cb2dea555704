mod client;
mod config;
mod copier;
mod hash_store;
mod hashing;
mod service;
mod types;

pub mod exclude;

pub use async_trait::async_trait;
pub use client::*;
pub use config::*;
pub use copier::{remote_join, CopyStats, Copier, RemoteFs, RemoteMetadata};
pub use exclude::is_excluded;
pub use hash_store::*;
pub use hashing::*;
pub use service::*;
pub use types::*;

pub type Result<T> = std::result::Result<T, Error>;
