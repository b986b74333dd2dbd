//! Plugin runtime
//!
//! Plugins are objects created at runtime, usually from a dynamic library,
//! that expose a set of interfaces (trait objects) looked up by canonical
//! name. The pieces:
//! - [`PluginInfo`]: how to create, destroy and cast one kind of plugin
//! - [`Plugin`]: shared handle to a live instance and its interface table
//! - [`SpecializedPlugin`]: a handle with cached slots for chosen interfaces
//! - [`PluginRegistry`] / [`PluginLoader`]: catalogue of descriptors and
//!   loading of plugin libraries
//! - [`Factory`]: interface of plugins that build [`Product`]s

pub mod factory;
pub mod from_this;
pub mod info;
pub mod instance;
pub mod interface;
pub mod loader;
mod macros;
pub mod name;
pub mod registry;
pub mod specialized;
pub mod traits;

pub use factory::{Factory, Product};
pub use from_this::EnablePluginFromThis;
pub use info::{PluginInfo, PluginInfoBuilder};
pub use instance::{Instance, Plugin};
pub use interface::{InterfacePtr, InterfaceRef};
pub use loader::PluginLoader;
pub use name::{normalize, FailurePolicy};
pub use registry::PluginRegistry;
pub use specialized::{Compose, Spec, Specialization, SpecializedPlugin};
pub use traits::Interface;
