#[cfg(feature = "cli")]
pub mod cli;
pub mod repo_config;
pub mod settings;

pub use repo_config::RepoConfig;
pub use settings::Settings;
