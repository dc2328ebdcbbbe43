//! Avatar URLs for accounts and commit authors.
//!
//! Uploaded avatars are served as-is, everyone else gets either an
//! external gravatar or a locally rendered placeholder with their
//! initials, cached on disk.

use std::sync::Once;

pub mod account;
mod atomic;
pub mod config;
pub mod errors;
pub mod generator;
pub mod gravatar;
pub mod locks;
pub mod resolver;
pub mod storage;
pub mod upload;

pub use account::{Account, AccountId, AccountStore, MemoryAccountStore, Person};
pub use atomic::{write_atomic, write_atomic_with};
pub use config::{AvatarConfig, SystemSettings};
pub use errors::{AvatarError, Result};
pub use locks::LockManager;
pub use resolver::{placeholder_key, AvatarResolver};
pub use storage::JsonAccountStore;
pub use upload::Upload;

static INIT: Once = Once::new();

/// Install the `env_logger` backend, once per process.
pub fn initialize() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .is_test(cfg!(test))
            .try_init();
        log::info!("Initializing avatar store");
    });
}
