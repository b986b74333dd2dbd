//! Plugin handles from inside a plugin

use super::instance::{Instance, Plugin};
use super::interface::InterfacePtr;
use super::traits::Interface;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

/// Component a plugin type embeds to obtain handles to its own instance.
///
/// Register it with
/// [`PluginInfoBuilder::enable_plugin_from_this`](super::PluginInfoBuilder::enable_plugin_from_this).
/// It is bound once, when the instance is created, and holds only a weak
/// reference, so it never keeps its own instance alive.
#[derive(Default)]
pub struct EnablePluginFromThis {
    binding: OnceLock<Binding>,
}

struct Binding {
    instance: Weak<Instance>,
    interfaces: HashMap<String, InterfacePtr>,
}

impl EnablePluginFromThis {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new handle sharing ownership of the enclosing instance.
    ///
    /// `None` before the instance was created through a `Plugin`, or while it
    /// is being destroyed.
    pub fn plugin_from_this(&self) -> Option<Plugin> {
        let binding = self.binding.get()?;
        let instance = binding.instance.upgrade()?;
        Some(Plugin::from_parts(instance, binding.interfaces.clone()))
    }

    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    pub(crate) fn bind(&self, instance: &Arc<Instance>, interfaces: &HashMap<String, InterfacePtr>) {
        let binding = Binding {
            instance: Arc::downgrade(instance),
            interfaces: interfaces.clone(),
        };
        if self.binding.set(binding).is_err() {
            tracing::warn!("EnablePluginFromThis component is already bound to an instance");
        }
    }
}

impl Interface for EnablePluginFromThis {}

impl fmt::Debug for EnablePluginFromThis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnablePluginFromThis")
            .field("bound", &self.is_bound())
            .finish()
    }
}
