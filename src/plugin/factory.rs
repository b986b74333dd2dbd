//! Plugins that build products
//!
//! A factory plugin exposes `dyn Factory<P, A>`: given arguments `A` it
//! builds a new `P`. Every [`Product`] holds a handle to the plugin that made
//! it, so the plugin instance (and the library behind it) outlives its
//! products.
//!
//! ```ignore
//! #[derive(Default)]
//! struct Greeters {
//!     from_this: EnablePluginFromThis,
//! }
//!
//! impl Factory<dyn Greeter, String> for Greeters {
//!     fn construct(&self, name: String) -> Product<dyn Greeter> {
//!         Product::new(Box::new(Hello(name)), &self.from_this)
//!     }
//! }
//!
//! let info = PluginInfo::builder::<Greeters>("demo::Greeters")
//!     .provides::<dyn Factory<dyn Greeter, String>>(|p| p)
//!     .enable_plugin_from_this(|p| &p.from_this)
//!     .build();
//! ```

use super::from_this::EnablePluginFromThis;
use super::instance::Plugin;
use super::traits::Interface;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Interface of a plugin producing `P` from arguments `A`
pub trait Factory<P: ?Sized + 'static, A: 'static = ()>: Send + Sync {
    fn construct(&self, args: A) -> Product<P>;
}

impl<P: ?Sized + 'static, A: 'static> Interface for dyn Factory<P, A> {}

/// Object built by a [`Factory`], keeping its plugin alive
pub struct Product<P: ?Sized> {
    // Dropped before the plugin: its code may live in the plugin's library
    value: Box<P>,
    plugin: Option<Plugin>,
}

impl<P: ?Sized> Product<P> {
    /// Wrap `value`, holding the plugin `origin` is embedded in.
    ///
    /// When `origin` is not bound to an instance the product holds nothing.
    pub fn new(value: Box<P>, origin: &EnablePluginFromThis) -> Self {
        Self {
            value,
            plugin: origin.plugin_from_this(),
        }
    }

    /// Handle to the plugin that built this product
    pub fn plugin(&self) -> Option<&Plugin> {
        self.plugin.as_ref()
    }
}

impl<P: ?Sized> Deref for Product<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.value
    }
}

impl<P: ?Sized> DerefMut for Product<P> {
    fn deref_mut(&mut self) -> &mut P {
        &mut self.value
    }
}

impl<P: ?Sized> fmt::Debug for Product<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Product")
            .field("type_name", &std::any::type_name::<P>())
            .field("plugin", &self.plugin)
            .finish()
    }
}
