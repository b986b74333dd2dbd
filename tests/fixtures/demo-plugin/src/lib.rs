//! Demo plugin library
//!
//! Built as a `cdylib` and loaded at runtime by the loader tests. The tests
//! also link it as an rlib to name its interfaces.

use photon_plugin::plugin::{EnablePluginFromThis, Factory, PluginInfo, Product};
use std::sync::atomic::{AtomicI32, Ordering};

pub trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

pub trait Counter: Send + Sync {
    /// Increment and return the new value
    fn increment(&self) -> i32;
}

photon_plugin::interface!(dyn Greeter);
photon_plugin::interface!(dyn Counter);

/// Greeter with a configurable greeting, built by [`EnglishGreeter`]
pub struct CustomGreeter {
    greeting: String,
}

impl Greeter for CustomGreeter {
    fn greet(&self, name: &str) -> String {
        format!("{}, {}!", self.greeting, name)
    }
}

#[derive(Default)]
pub struct EnglishGreeter {
    count: AtomicI32,
    from_this: EnablePluginFromThis,
}

impl Greeter for EnglishGreeter {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {}!", name)
    }
}

impl Counter for EnglishGreeter {
    fn increment(&self) -> i32 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Factory<dyn Greeter, String> for EnglishGreeter {
    fn construct(&self, greeting: String) -> Product<dyn Greeter> {
        Product::new(Box::new(CustomGreeter { greeting }), &self.from_this)
    }
}

#[derive(Default)]
pub struct FrenchGreeter;

impl Greeter for FrenchGreeter {
    fn greet(&self, name: &str) -> String {
        format!("Bonjour, {} !", name)
    }
}

photon_plugin::export_plugins![
    PluginInfo::builder::<EnglishGreeter>("demo::EnglishGreeter")
        .provides::<dyn Greeter>(|p| p)
        .provides::<dyn Counter>(|p| p)
        .provides::<dyn Factory<dyn Greeter, String>>(|p| p)
        .enable_plugin_from_this(|p| &p.from_this)
        .alias("english")
        .build(),
    PluginInfo::builder::<FrenchGreeter>("demo::FrenchGreeter")
        .provides::<dyn Greeter>(|p| p)
        .alias("french")
        .build(),
];
