//! Plugin instances
//!
//! A [`Plugin`] is a handle to one live plugin object plus a snapshot of its
//! interface table. Handles are cheap to clone; every clone shares the same
//! object, which is destroyed with its descriptor's deleter when the last
//! handle (or [`InterfaceRef`]) goes away.

use super::info::{DeleterFn, KeepAlive, PluginInfo};
use super::interface::{InterfacePtr, InterfaceRef};
use super::name::normalize;
use super::traits::Interface;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;
use std::sync::Arc;

/// One live plugin object, destroyed by its deleter when dropped
pub struct Instance {
    ptr: NonNull<()>,
    deleter: DeleterFn,
    // Declared last: the library must outlive the deleter call and the
    // deleter closure itself.
    keep_alive: Option<KeepAlive>,
}

// SAFETY: descriptors only describe `Send + Sync` plugin types
unsafe impl Send for Instance {}
unsafe impl Sync for Instance {}

impl Instance {
    /// Address of the plugin object
    pub fn as_ptr(&self) -> *const () {
        self.ptr.as_ptr()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        (self.deleter)(self.ptr);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("ptr", &self.ptr)
            .field("library", &self.keep_alive.is_some())
            .finish()
    }
}

/// Shared handle to a plugin instance and its interfaces
///
/// Equality, ordering and hashing go by instance identity: two handles are
/// equal exactly when they share the same instance (or are both empty).
#[derive(Default, Clone)]
pub struct Plugin {
    // Field order matters: the table is dropped before the instance handle.
    interfaces: HashMap<String, InterfacePtr>,
    instance: Option<Arc<Instance>>,
}

impl Plugin {
    /// Create an empty handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handle to a fresh instance of `info`
    pub fn from_info(info: &PluginInfo) -> Self {
        let mut plugin = Self::new();
        plugin.initialize(Some(info));
        plugin
    }

    pub(crate) fn from_parts(
        instance: Arc<Instance>,
        interfaces: HashMap<String, InterfacePtr>,
    ) -> Self {
        Self {
            interfaces,
            instance: Some(instance),
        }
    }

    /// Drop the current instance (if any) and create a new one from `info`.
    ///
    /// With `None`, or when the factory produces nothing, the handle is left
    /// empty.
    pub fn initialize(&mut self, info: Option<&PluginInfo>) {
        self.clear();

        let Some(info) = info else {
            return;
        };

        let Some(ptr) = (info.factory)() else {
            tracing::debug!(plugin = %info.name, "Plugin factory produced no instance");
            return;
        };

        // Own the object before running any caster so it is released even if
        // one of them panics.
        let instance = Arc::new(Instance {
            ptr,
            deleter: Arc::clone(&info.deleter),
            keep_alive: info.keep_alive.clone(),
        });

        let interfaces: HashMap<String, InterfacePtr> = info
            .interfaces
            .iter()
            .map(|(name, caster)| {
                let entry = caster(ptr).with_keep_alive(info.keep_alive.clone());
                (normalize(name), entry)
            })
            .collect();

        if let Some(from_this) = &info.from_this {
            // SAFETY: the component lives inside the object owned by `instance`
            let component = unsafe { from_this(ptr).as_ref() };
            component.bind(&instance, &interfaces);
        }

        tracing::debug!(
            plugin = %info.name,
            interfaces = interfaces.len(),
            "Plugin instance created"
        );

        self.interfaces = interfaces;
        self.instance = Some(instance);
    }

    /// Release this handle's share of the instance
    pub fn clear(&mut self) {
        self.interfaces.clear();
        self.instance = None;
    }

    /// Whether this handle refers to no instance
    pub fn is_empty(&self) -> bool {
        self.instance.is_none()
    }

    /// Share `other`'s instance and interface table, releasing the current one
    pub fn copy_instance_from(&mut self, other: &Plugin) {
        if self.same_instance(other) {
            return;
        }
        self.clear();
        self.interfaces = other.interfaces.clone();
        self.instance = other.instance.clone();
    }

    pub fn instance(&self) -> Option<&Arc<Instance>> {
        self.instance.as_ref()
    }

    /// Address of the plugin object
    pub fn instance_address(&self) -> Option<*const ()> {
        self.instance.as_deref().map(Instance::as_ptr)
    }

    /// Canonical names of every interface, sorted
    pub fn interface_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.interfaces.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn has_interface(&self, name: &str) -> bool {
        self.interfaces.contains_key(&normalize(name))
    }

    /// Interface entry for `name`, normalized before lookup
    pub fn interface_by_name(&self, name: &str) -> Option<&InterfacePtr> {
        self.interfaces.get(&normalize(name))
    }

    /// Interface `name` viewed as `I`.
    ///
    /// `None` when the entry is missing or was not tagged as `I`.
    pub fn interface_by_name_as<I: ?Sized + 'static>(&self, name: &str) -> Option<&I> {
        let ptr = self.interface_by_name(name)?.downcast::<I>()?;
        // SAFETY: the entry points into `self.instance`, which lives at least
        // as long as the borrow of `self`
        Some(unsafe { ptr.as_ref() })
    }

    /// Interface `I`, if this plugin provides it
    pub fn query_interface<I: Interface + ?Sized>(&self) -> Option<&I> {
        self.interface_by_name_as::<I>(&I::interface_name())
    }

    /// Whether this plugin provides interface `I`
    pub fn provides<I: Interface + ?Sized>(&self) -> bool {
        self.has_interface(&I::interface_name())
    }

    /// Interface `I` together with a share of the instance
    pub fn query_interface_shared<I: Interface + ?Sized>(&self) -> Option<InterfaceRef<I>> {
        let ptr = self.interface_by_name(&I::interface_name())?.downcast::<I>()?;
        let instance = self.instance.clone()?;
        // SAFETY: `ptr` was cast from the object owned by `instance`
        Some(unsafe { InterfaceRef::new(instance, ptr) })
    }

    /// Lookup by an already-canonical name
    pub(crate) fn entry(&self, canonical: &str) -> Option<&InterfacePtr> {
        self.interfaces.get(canonical)
    }

    pub(crate) fn instance_arc(&self) -> Option<Arc<Instance>> {
        self.instance.clone()
    }

    pub(crate) fn same_instance(&self, other: &Plugin) -> bool {
        self.identity() == other.identity()
    }

    fn identity(&self) -> usize {
        self.instance
            .as_ref()
            .map_or(0, |instance| Arc::as_ptr(instance) as usize)
    }
}

impl PartialEq for Plugin {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl Eq for Plugin {}

impl PartialOrd for Plugin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Plugin {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl Hash for Plugin {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("instance", &self.instance_address())
            .field("interfaces", &self.interface_names())
            .finish()
    }
}
