// PhotonDB plugin runtime
// Interface discovery for dynamically loaded plugins

#![warn(rust_2018_idioms)]

pub mod config;
pub mod plugin;

// Re-exports for convenience
pub use config::PluginConfig;
pub use plugin::{
    normalize, Interface, Plugin, PluginInfo, PluginLoader, PluginRegistry, SpecializedPlugin,
};

/// Plugin runtime error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Plugin error: {0}")]
        Plugin(String),

        #[error("Library error: {0}")]
        Library(String),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Internal error: {0}")]
        Internal(String),

        #[error("Not found: {0}")]
        NotFound(String),

        #[error("Already exists: {0}")]
        AlreadyExists(String),

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
