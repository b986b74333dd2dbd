//! Plugin registry - tracks known plugin descriptors

use super::info::PluginInfo;
use super::instance::Plugin;
use super::name::normalize;
use super::specialized::{Specialization, SpecializedPlugin};
use super::traits::Interface;
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::sync::{Arc, RwLock};

/// Plugin registry
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Arc<PluginInfo>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
        }
    }

    /// Register a plugin descriptor
    pub fn register(&self, info: Arc<PluginInfo>) -> Result<()> {
        let mut plugins = self
            .plugins
            .write()
            .map_err(|e| Error::Internal(format!("Lock error: {}", e)))?;

        if plugins.contains_key(info.name()) {
            return Err(Error::AlreadyExists(format!(
                "Plugin '{}' already registered",
                info.name()
            )));
        }

        tracing::debug!(
            name = %info.name(),
            interfaces = info.interface_names().len(),
            "Registered plugin"
        );
        plugins.insert(info.name().to_string(), info);
        Ok(())
    }

    /// Unregister a plugin
    pub fn unregister(&self, name: &str) -> Result<Arc<PluginInfo>> {
        // Normalizing may panic under `FailurePolicy::Panic`; keep it outside the lock
        let key = normalize(name);
        let mut plugins = self
            .plugins
            .write()
            .map_err(|e| Error::Internal(format!("Lock error: {}", e)))?;

        plugins
            .remove(&key)
            .ok_or_else(|| Error::NotFound(format!("Plugin '{}' not found", name)))
    }

    /// Get a plugin descriptor by name or alias.
    ///
    /// An alias shared by several plugins resolves to none of them.
    pub fn get(&self, name: &str) -> Option<Arc<PluginInfo>> {
        let plugins = self.plugins.read().ok()?;
        if let Some(info) = plugins.get(&normalize(name)) {
            return Some(Arc::clone(info));
        }

        let mut matches = plugins.values().filter(|info| info.aliases().contains(name));
        let found = matches.next()?;
        if let Some(other) = matches.next() {
            tracing::warn!(
                alias = %name,
                first = %found.name(),
                second = %other.name(),
                "Alias is ambiguous"
            );
            return None;
        }
        Some(Arc::clone(found))
    }

    /// Names of all registered plugins, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .plugins
            .read()
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.plugins.read().map(|p| p.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every interface provided by at least one registered plugin
    pub fn interfaces_implemented(&self) -> BTreeSet<String> {
        self.plugins
            .read()
            .map(|plugins| {
                plugins
                    .values()
                    .flat_map(|info| info.interface_names())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Find plugins by interface name
    pub fn plugins_implementing(&self, interface: &str) -> BTreeSet<String> {
        let interface = normalize(interface);
        self.plugins
            .read()
            .map(|plugins| {
                plugins
                    .iter()
                    .filter(|(_, info)| info.interfaces.contains_key(&interface))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Find plugins by interface type
    pub fn plugins_implementing_type<I: Interface + ?Sized>(&self) -> BTreeSet<String> {
        self.plugins_implementing(&I::interface_name())
    }

    /// Create an instance of the named plugin
    pub fn instantiate(&self, name: &str) -> Option<Plugin> {
        let Some(info) = self.get(name) else {
            tracing::warn!(name = %name, "Cannot instantiate unknown plugin");
            return None;
        };
        let plugin = Plugin::from_info(&info);
        (!plugin.is_empty()).then_some(plugin)
    }

    /// Create an instance of the named plugin, reporting why none was made
    pub fn try_instantiate(&self, name: &str) -> Result<Plugin> {
        let info = self
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Plugin '{}' not found", name)))?;
        let plugin = Plugin::from_info(&info);
        if plugin.is_empty() {
            return Err(Error::Plugin(format!(
                "Plugin '{}' factory produced no instance",
                info.name()
            )));
        }
        Ok(plugin)
    }

    /// Create a specialized instance of the named plugin
    pub fn instantiate_as<S: Specialization>(&self, name: &str) -> Option<SpecializedPlugin<S>> {
        self.instantiate(name).map(SpecializedPlugin::from)
    }

    /// Human-readable summary of every plugin and its interfaces
    pub fn pretty_str(&self) -> String {
        let plugins = match self.plugins.read() {
            Ok(plugins) => plugins,
            Err(e) => return format!("<registry unavailable: {}>", e),
        };

        let mut names: Vec<&String> = plugins.keys().collect();
        names.sort_unstable();

        let mut out = String::new();
        let _ = writeln!(out, "PluginRegistry: {} plugin(s)", plugins.len());
        for name in names {
            let info = &plugins[name];
            let _ = writeln!(out, "  [{}]", name);
            if !info.aliases().is_empty() {
                let aliases: Vec<&str> = info.aliases().iter().map(String::as_str).collect();
                let _ = writeln!(out, "    aliases: {}", aliases.join(", "));
            }
            for interface in info.interface_names() {
                let _ = writeln!(out, "    - {}", interface);
            }
        }
        out
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
