pub mod adapters;
#[cfg(feature = "cli")]
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::{Cli, Commands};
pub use crate::config::{RepoConfig, Settings};

pub use crate::adapters::{LooseObjectStore, MemoryObjectStore};
pub use crate::core::Repository;
pub use crate::domain::model::{GitObject, ObjectKind};
pub use crate::utils::error::{Result, TwitError};
