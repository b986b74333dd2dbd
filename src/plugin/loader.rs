//! Plugin loader - handles dynamic loading of plugin libraries
//!
//! A plugin library exports one function, `photon_plugin_entry`, returning
//! the descriptors of the plugins it contains (see
//! [`export_plugins!`](crate::export_plugins)). The loader opens the library,
//! ties each descriptor to it and registers the descriptors.
//!
//! Descriptors and instances hold a share of the library, so forgetting a
//! library only drops the loader's own handle. The code is unmapped once the
//! last instance created from it is gone.

use super::info::PluginInfo;
use super::instance::Plugin;
use super::registry::PluginRegistry;
use crate::config::PluginConfig;
use crate::error::{Error, Result};
use libloading::Library;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the symbol every plugin library exports
pub const ENTRY_SYMBOL: &str = "photon_plugin_entry";

/// Signature of [`ENTRY_SYMBOL`]
pub type PluginEntryFn = fn() -> Vec<PluginInfo>;

struct LoadedLibrary {
    _library: Arc<Library>,
    plugins: BTreeSet<String>,
}

/// Plugin loader
pub struct PluginLoader {
    registry: Arc<PluginRegistry>,
    libraries: Mutex<HashMap<PathBuf, LoadedLibrary>>,
    search_paths: Vec<PathBuf>,
    check_extension: bool,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::with_registry(Arc::new(PluginRegistry::new()))
    }

    /// Create a loader registering into an existing registry
    pub fn with_registry(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            libraries: Mutex::new(HashMap::new()),
            search_paths: Vec::new(),
            check_extension: true,
        }
    }

    /// Create a loader from configuration
    pub fn from_config(config: &PluginConfig) -> Self {
        let mut loader = Self::new();
        loader.search_paths = config.search_paths.clone();
        loader.check_extension = config.check_extension;
        loader
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    /// Load a plugin library and register its plugins
    ///
    /// Returns the names of the plugins that were registered. Plugins whose
    /// name is already taken are skipped with a warning.
    ///
    /// Warning: this runs the library's code. Only load trusted plugins, built
    /// with the same compiler and the same version of this crate.
    pub fn load_library(&self, path: impl AsRef<Path>) -> Result<BTreeSet<String>> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::NotFound(format!(
                "Plugin library '{}' does not exist",
                path.display()
            )));
        }

        if self.check_extension && !has_library_extension(path) {
            return Err(Error::InvalidArgument(format!(
                "'{}' is not a .{} library",
                path.display(),
                std::env::consts::DLL_EXTENSION
            )));
        }

        // Held until the library is recorded so concurrent loads of one path
        // cannot both register
        let mut libraries = self.libraries.lock();
        if libraries.contains_key(path) {
            return Err(Error::AlreadyExists(format!(
                "Plugin library '{}' already loaded",
                path.display()
            )));
        }

        // SAFETY: loading a library runs its initializers; the caller vouches
        // for the library
        let library = unsafe { Library::new(path) }
            .map_err(|e| Error::Library(format!("{}: {}", path.display(), e)))?;

        let entry: PluginEntryFn = unsafe {
            *library
                .get::<PluginEntryFn>(ENTRY_SYMBOL.as_bytes())
                .map_err(|e| Error::Library(format!("{}: {}", path.display(), e)))?
        };

        let library = Arc::new(library);
        let mut plugins = BTreeSet::new();
        for info in entry() {
            let info = info.with_keep_alive(library.clone());
            let name = info.name().to_string();
            match self.registry.register(Arc::new(info)) {
                Ok(()) => {
                    plugins.insert(name);
                }
                Err(e) => {
                    tracing::warn!(
                        library = %path.display(),
                        plugin = %name,
                        error = %e,
                        "Skipping plugin"
                    );
                }
            }
        }

        tracing::info!(
            library = %path.display(),
            plugins = plugins.len(),
            "Loaded plugin library"
        );

        libraries.insert(
            path.to_path_buf(),
            LoadedLibrary {
                _library: library,
                plugins: plugins.clone(),
            },
        );

        Ok(plugins)
    }

    /// Forget a library and unregister its plugins.
    ///
    /// Returns false if the library was not loaded by this loader.
    pub fn forget_library(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let Some(loaded) = self.libraries.lock().remove(path) else {
            return false;
        };

        for name in &loaded.plugins {
            if let Err(e) = self.registry.unregister(name) {
                tracing::debug!(plugin = %name, error = %e, "Plugin already unregistered");
            }
        }

        tracing::info!(library = %path.display(), "Forgot plugin library");
        true
    }

    /// Forget the library that provided the named plugin
    pub fn forget_library_of_plugin(&self, name: &str) -> bool {
        let Some(info) = self.registry.get(name) else {
            return false;
        };

        let path = self
            .libraries
            .lock()
            .iter()
            .find(|(_, loaded)| loaded.plugins.contains(info.name()))
            .map(|(path, _)| path.clone());

        match path {
            Some(path) => self.forget_library(path),
            None => false,
        }
    }

    /// Paths of the libraries currently held by the loader, sorted
    pub fn loaded_libraries(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.libraries.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Load every library found directly under the search paths
    ///
    /// Libraries that fail to load are logged and skipped.
    pub fn discover(&self) -> Result<BTreeSet<String>> {
        let mut plugins = BTreeSet::new();

        for dir in &self.search_paths {
            let entries = std::fs::read_dir(dir).map_err(|e| {
                Error::InvalidArgument(format!("Cannot read '{}': {}", dir.display(), e))
            })?;

            let mut candidates: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| path.is_file() && has_library_extension(path))
                .collect();
            candidates.sort();

            for path in candidates {
                match self.load_library(&path) {
                    Ok(names) => plugins.extend(names),
                    Err(e) => {
                        tracing::warn!(library = %path.display(), error = %e, "Failed to load plugin library");
                    }
                }
            }
        }

        Ok(plugins)
    }

    /// Create an instance of the named plugin
    pub fn instantiate(&self, name: &str) -> Option<Plugin> {
        self.registry.instantiate(name)
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn has_library_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == std::env::consts::DLL_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_extension() {
        let ext = std::env::consts::DLL_EXTENSION;
        assert!(has_library_extension(Path::new(&format!("libdemo.{}", ext))));
        assert!(!has_library_extension(Path::new("libdemo.txt")));
        assert!(!has_library_extension(Path::new("libdemo")));
    }

    #[test]
    fn test_load_missing_library() {
        let loader = PluginLoader::new();
        let err = loader.load_library("/nonexistent/libmissing.so").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(loader.loaded_libraries().is_empty());
    }

    #[test]
    fn test_forget_unknown_library() {
        let loader = PluginLoader::new();
        assert!(!loader.forget_library("/nonexistent/libmissing.so"));
        assert!(!loader.forget_library_of_plugin("test::Missing"));
    }
}
