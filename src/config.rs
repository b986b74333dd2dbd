//! Runtime configuration
//!
//! Read from an optional TOML file, then overridden by `PHOTON_PLUGIN_*`
//! environment variables (`PHOTON_PLUGIN_SEARCH_PATHS=/a,/b`,
//! `PHOTON_PLUGIN_NAME_FAILURE_POLICY=panic`, ...).

use crate::error::{Error, Result};
use crate::plugin::name::{self, FailurePolicy};
use crate::plugin::PluginLoader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Plugin runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Directories scanned by [`PluginLoader::discover`]
    pub search_paths: Vec<PathBuf>,
    /// What to do with identifiers that cannot be demangled
    pub name_failure_policy: FailurePolicy,
    /// Reject libraries without the platform's library extension
    pub check_extension: bool,
    /// Default log filter for the command-line tool
    pub log_level: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            name_failure_policy: FailurePolicy::Log,
            check_extension: true,
            log_level: "info".to_string(),
        }
    }
}

impl PluginConfig {
    /// Load configuration from `path` (if any) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        builder
            .add_source(
                config::Environment::with_prefix("PHOTON_PLUGIN")
                    .prefix_separator("_")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("search_paths"),
            )
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Install process-wide settings
    pub fn apply(&self) {
        name::set_failure_policy(self.name_failure_policy);
    }

    /// Create a loader using these settings
    pub fn loader(&self) -> PluginLoader {
        PluginLoader::from_config(self)
    }
}
