//! Plugin descriptors
//!
//! A [`PluginInfo`] tells the runtime how to create and destroy one kind of
//! plugin and how to reach each interface inside a created instance. It is
//! produced once per plugin type, usually by [`PluginInfo::builder`], and is
//! never mutated by instantiation.

use super::from_this::EnablePluginFromThis;
use super::interface::InterfacePtr;
use super::name::normalize;
use super::traits::Interface;
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;

/// Produces a new instance, or `None` when the plugin cannot be created
pub type FactoryFn = Arc<dyn Fn() -> Option<NonNull<()>> + Send + Sync>;

/// Destroys an instance previously produced by the matching factory
pub type DeleterFn = Arc<dyn Fn(NonNull<()>) + Send + Sync>;

/// Maps an instance address to one of its interfaces
pub type CasterFn = Arc<dyn Fn(NonNull<()>) -> InterfacePtr + Send + Sync>;

pub(crate) type FromThisFn = Arc<dyn Fn(NonNull<()>) -> NonNull<EnablePluginFromThis> + Send + Sync>;

/// Keeps whatever backs a descriptor's code (a dynamic library) loaded
pub(crate) type KeepAlive = Arc<dyn Any + Send + Sync>;

/// Descriptor of one plugin type
#[derive(Clone)]
pub struct PluginInfo {
    pub(crate) name: String,
    pub(crate) aliases: BTreeSet<String>,
    pub(crate) interfaces: HashMap<String, CasterFn>,
    pub(crate) factory: FactoryFn,
    pub(crate) deleter: DeleterFn,
    pub(crate) from_this: Option<FromThisFn>,
    pub(crate) keep_alive: Option<KeepAlive>,
}

impl PluginInfo {
    /// Start describing plugin type `T`, constructed with `T::default()`
    pub fn builder<T>(name: impl AsRef<str>) -> PluginInfoBuilder<T>
    where
        T: Default + Send + Sync + 'static,
    {
        PluginInfoBuilder::with_factory(name, || Some(T::default()))
    }

    /// Build a descriptor from raw parts.
    ///
    /// # Safety
    /// Every address returned by `factory` must be accepted by `deleter`
    /// exactly once, and the object behind it must be `Send + Sync`.
    pub unsafe fn from_raw<F, D>(name: impl AsRef<str>, factory: F, deleter: D) -> Self
    where
        F: Fn() -> Option<NonNull<()>> + Send + Sync + 'static,
        D: Fn(NonNull<()>) + Send + Sync + 'static,
    {
        Self {
            name: normalize(name.as_ref()),
            aliases: BTreeSet::new(),
            interfaces: HashMap::new(),
            factory: Arc::new(factory),
            deleter: Arc::new(deleter),
            from_this: None,
            keep_alive: None,
        }
    }

    /// Add an interface entry from a raw caster.
    ///
    /// # Safety
    /// For every address produced by this descriptor's factory, `caster` must
    /// return an entry pointing into that same object.
    pub unsafe fn add_raw_interface<C>(&mut self, name: &str, caster: C)
    where
        C: Fn(NonNull<()>) -> InterfacePtr + Send + Sync + 'static,
    {
        self.interfaces.insert(normalize(name), Arc::new(caster));
    }

    pub fn add_alias(&mut self, alias: impl Into<String>) {
        self.aliases.insert(alias.into());
    }

    /// Canonical plugin name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &BTreeSet<String> {
        &self.aliases
    }

    /// Canonical names of every interface, sorted
    pub fn interface_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.interfaces.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether instances of this plugin expose the named interface
    pub fn provides(&self, interface: &str) -> bool {
        self.interfaces.contains_key(&normalize(interface))
    }

    pub(crate) fn with_keep_alive(mut self, keep_alive: KeepAlive) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }
}

impl fmt::Debug for PluginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInfo")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("interfaces", &self.interface_names())
            .field("from_this", &self.from_this.is_some())
            .finish()
    }
}

/// Typed construction of a [`PluginInfo`] for plugin type `T`
pub struct PluginInfoBuilder<T> {
    info: PluginInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> PluginInfoBuilder<T> {
    /// Describe `T`, constructed by `make`
    pub fn with_factory<F>(name: impl AsRef<str>, make: F) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        let deleter = |ptr: NonNull<()>| {
            // SAFETY: every address handed to this deleter came from
            // `Box::leak` in the factory below
            drop(unsafe { Box::from_raw(ptr.cast::<T>().as_ptr()) });
        };
        // SAFETY: factory and deleter are a Box allocation pair for `T`
        let info = unsafe { PluginInfo::from_raw(name, typed_factory(make), deleter) };

        Self {
            info,
            _marker: PhantomData,
        }
    }

    /// Replace how instances are constructed
    pub fn factory<F>(mut self, make: F) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        self.info.factory = Arc::new(typed_factory(make));
        self
    }

    /// Expose interface `I`, reached from `T` through `cast`
    pub fn provides<I: Interface + ?Sized>(
        mut self,
        cast: impl Fn(&T) -> &I + Send + Sync + 'static,
    ) -> Self {
        let caster = move |ptr: NonNull<()>| {
            // SAFETY: casters only receive addresses from this descriptor's factory
            let plugin = unsafe { ptr.cast::<T>().as_ref() };
            unsafe { InterfacePtr::new(NonNull::from(cast(plugin))) }
        };
        self.info
            .interfaces
            .insert(normalize(&I::interface_name()), Arc::new(caster));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.info.add_alias(alias);
        self
    }

    /// Let instances hand out plugin handles to themselves.
    ///
    /// Also exposes [`EnablePluginFromThis`] as an interface.
    pub fn enable_plugin_from_this(
        self,
        component: impl Fn(&T) -> &EnablePluginFromThis + Copy + Send + Sync + 'static,
    ) -> Self {
        let mut builder = self.provides::<EnablePluginFromThis>(component);
        builder.info.from_this = Some(Arc::new(move |ptr: NonNull<()>| {
            // SAFETY: as for interface casters
            let plugin = unsafe { ptr.cast::<T>().as_ref() };
            NonNull::from(component(plugin))
        }));
        builder
    }

    pub fn build(self) -> PluginInfo {
        self.info
    }
}

fn typed_factory<T, F>(make: F) -> impl Fn() -> Option<NonNull<()>> + Send + Sync + 'static
where
    T: Send + Sync + 'static,
    F: Fn() -> Option<T> + Send + Sync + 'static,
{
    move || make().map(|plugin| NonNull::from(Box::leak(Box::new(plugin))).cast::<()>())
}
