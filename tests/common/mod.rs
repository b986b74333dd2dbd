//! Dummy plugins shared by the integration tests
#![allow(dead_code)]

use photon_plugin::plugin::{EnablePluginFromThis, PluginInfo, PluginInfoBuilder};
use std::sync::atomic::{AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub trait DummyName: Send + Sync {
    fn my_name_is(&self) -> String;
}

pub trait DummyDouble: Send + Sync {
    fn my_double_value_is(&self) -> f64;
}

pub trait DummyInt: Send + Sync {
    fn my_integer_value_is(&self) -> i32;
}

pub trait DummySetter: Send + Sync {
    fn set_name(&self, name: &str);
    fn set_double_value(&self, value: f64);
    fn set_integer_value(&self, value: i32);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SomeObject {
    pub some_int: i32,
    pub some_double: f64,
}

pub trait DummyGetSomeObject: Send + Sync {
    fn get_some_object(&self) -> Box<SomeObject>;
}

/// Never provided by any dummy plugin
pub trait DummyUnused: Send + Sync {}

photon_plugin::interface!(dyn DummyName);
photon_plugin::interface!(dyn DummyDouble);
photon_plugin::interface!(dyn DummyInt);
photon_plugin::interface!(dyn DummySetter);
photon_plugin::interface!(dyn DummyGetSomeObject);
photon_plugin::interface!(dyn DummyUnused);

/// Plugin exposing only a name
pub struct DummySinglePlugin;

impl Default for DummySinglePlugin {
    fn default() -> Self {
        Self
    }
}

impl DummyName for DummySinglePlugin {
    fn my_name_is(&self) -> String {
        "DummySinglePlugin".to_string()
    }
}

/// Plugin exposing every dummy interface, with mutable state
pub struct DummyMultiPlugin {
    name: Mutex<String>,
    value: AtomicU64,
    integer: AtomicI32,
    pub from_this: EnablePluginFromThis,
}

impl Default for DummyMultiPlugin {
    fn default() -> Self {
        Self {
            name: Mutex::new("DummyMultiPlugin".to_string()),
            value: AtomicU64::new(std::f64::consts::PI.to_bits()),
            integer: AtomicI32::new(5),
            from_this: EnablePluginFromThis::new(),
        }
    }
}

impl DummyName for DummyMultiPlugin {
    fn my_name_is(&self) -> String {
        self.name.lock().unwrap().clone()
    }
}

impl DummyDouble for DummyMultiPlugin {
    fn my_double_value_is(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::SeqCst))
    }
}

impl DummyInt for DummyMultiPlugin {
    fn my_integer_value_is(&self) -> i32 {
        self.integer.load(Ordering::SeqCst)
    }
}

impl DummySetter for DummyMultiPlugin {
    fn set_name(&self, name: &str) {
        *self.name.lock().unwrap() = name.to_string();
    }

    fn set_double_value(&self, value: f64) {
        self.value.store(value.to_bits(), Ordering::SeqCst);
    }

    fn set_integer_value(&self, value: i32) {
        self.integer.store(value, Ordering::SeqCst);
    }
}

impl DummyGetSomeObject for DummyMultiPlugin {
    fn get_some_object(&self) -> Box<SomeObject> {
        Box::new(SomeObject {
            some_int: self.my_integer_value_is(),
            some_double: self.my_double_value_is(),
        })
    }
}

pub fn dummy_single_plugin() -> PluginInfo {
    PluginInfo::builder::<DummySinglePlugin>("test::util::DummySinglePlugin")
        .provides::<dyn DummyName>(|p| p)
        .alias("Bar")
        .build()
}

pub fn dummy_multi_plugin() -> PluginInfo {
    PluginInfo::builder::<DummyMultiPlugin>("test::util::DummyMultiPlugin")
        .provides::<dyn DummyName>(|p| p)
        .provides::<dyn DummyDouble>(|p| p)
        .provides::<dyn DummyInt>(|p| p)
        .provides::<dyn DummySetter>(|p| p)
        .provides::<dyn DummyGetSomeObject>(|p| p)
        .enable_plugin_from_this(|p| &p.from_this)
        .alias("Foo")
        .alias("Bar")
        .build()
}

/// Counts instances destroyed through the descriptor's deleter
pub struct Tracked {
    drops: Arc<AtomicUsize>,
}

impl DummyName for Tracked {
    fn my_name_is(&self) -> String {
        "Tracked".to_string()
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn tracked_plugin(drops: Arc<AtomicUsize>) -> PluginInfo {
    PluginInfoBuilder::with_factory("test::util::Tracked", move || {
        Some(Tracked {
            drops: drops.clone(),
        })
    })
    .provides::<dyn DummyName>(|p| p)
    .build()
}
