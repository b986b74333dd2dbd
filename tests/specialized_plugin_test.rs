//! Specialized plugin views

mod common;

use common::*;
use photon_plugin::plugin::{Compose, Plugin, Spec, SpecializedPlugin};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type NamePlugin = SpecializedPlugin<(Spec<dyn DummyName>,)>;
type NameIntPlugin = SpecializedPlugin<(Spec<dyn DummyName>, Spec<dyn DummyInt>)>;
type UnusedPlugin = SpecializedPlugin<(Spec<dyn DummyUnused>, Spec<dyn DummyName>)>;
type ComposedPlugin =
    SpecializedPlugin<Compose<(Spec<dyn DummyName>,), (Spec<dyn DummyDouble>, Spec<dyn DummySetter>)>>;

#[test]
fn test_is_specialized_for() {
    assert!(NamePlugin::is_specialized_for::<dyn DummyName>());
    assert!(!NamePlugin::is_specialized_for::<dyn DummyInt>());

    assert!(NameIntPlugin::is_specialized_for::<dyn DummyInt>());

    assert!(ComposedPlugin::is_specialized_for::<dyn DummyName>());
    assert!(ComposedPlugin::is_specialized_for::<dyn DummySetter>());
    assert!(!ComposedPlugin::is_specialized_for::<dyn DummyGetSomeObject>());

    assert!(!SpecializedPlugin::<()>::is_specialized_for::<dyn DummyName>());
}

#[test]
fn test_specialized_matches_generic() {
    let plugin = ComposedPlugin::from_info(&dummy_multi_plugin());
    let generic: &Plugin = plugin.as_plugin();

    assert_eq!(
        plugin.query_interface::<dyn DummyName>().unwrap().my_name_is(),
        generic.query_interface::<dyn DummyName>().unwrap().my_name_is()
    );
    assert_eq!(
        plugin.query_interface::<dyn DummyDouble>().unwrap() as *const dyn DummyDouble as *const (),
        generic.query_interface::<dyn DummyDouble>().unwrap() as *const dyn DummyDouble as *const ()
    );

    // Not specialized: generic path through the same view
    assert_eq!(
        plugin.query_interface::<dyn DummyInt>().unwrap().my_integer_value_is(),
        5
    );
    assert!(plugin.provides::<dyn DummyGetSomeObject>());
    assert!(!plugin.provides::<dyn DummyUnused>());
}

#[test]
fn test_specialized_interface_not_provided() {
    let plugin = UnusedPlugin::from_info(&dummy_single_plugin());

    assert!(UnusedPlugin::is_specialized_for::<dyn DummyUnused>());
    assert!(plugin.query_interface::<dyn DummyUnused>().is_none());
    assert!(!plugin.provides::<dyn DummyUnused>());
    assert!(plugin.query_interface_shared::<dyn DummyUnused>().is_none());

    assert_eq!(
        plugin.query_interface::<dyn DummyName>().unwrap().my_name_is(),
        "DummySinglePlugin"
    );
}

#[test]
fn test_empty_specialized_plugin() {
    let mut plugin = NameIntPlugin::new();
    assert!(plugin.is_empty());
    assert!(plugin.query_interface::<dyn DummyName>().is_none());
    assert!(!plugin.provides::<dyn DummyInt>());

    plugin.initialize(Some(&dummy_multi_plugin()));
    assert_eq!(plugin.query_interface::<dyn DummyInt>().unwrap().my_integer_value_is(), 5);

    plugin.initialize(None);
    assert!(plugin.is_empty());
    assert!(plugin.query_interface::<dyn DummyInt>().is_none());
}

#[test]
fn test_reinitialize_refreshes_slots() {
    let mut plugin = NameIntPlugin::from_info(&dummy_multi_plugin());
    assert!(plugin.provides::<dyn DummyInt>());

    plugin.initialize(Some(&dummy_single_plugin()));
    assert!(!plugin.provides::<dyn DummyInt>());
    assert_eq!(
        plugin.query_interface::<dyn DummyName>().unwrap().my_name_is(),
        "DummySinglePlugin"
    );
}

#[test]
fn test_conversions_share_instance() {
    let generic = Plugin::from_info(&dummy_multi_plugin());
    let specialized = NamePlugin::from(generic.clone());
    assert_eq!(specialized, generic);
    assert_eq!(generic, specialized);

    let mut other = ComposedPlugin::new();
    other.copy_instance_from(&generic);
    assert_eq!(other, specialized);

    other
        .query_interface::<dyn DummySetter>()
        .unwrap()
        .set_name("Renamed");
    assert_eq!(specialized.query_interface::<dyn DummyName>().unwrap().my_name_is(), "Renamed");

    let back: Plugin = specialized.clone().into_plugin();
    assert_eq!(back, generic);

    other.clear();
    assert!(other.is_empty());
    assert_ne!(other, specialized);
}

#[test]
fn test_specialized_shared_interface() {
    let drops = Arc::new(AtomicUsize::new(0));
    let plugin = NamePlugin::from_info(&tracked_plugin(drops.clone()));

    let name = plugin.query_interface_shared::<dyn DummyName>().unwrap();
    drop(plugin);
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    assert_eq!(name.my_name_is(), "Tracked");

    drop(name);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_deref_to_plugin() {
    let plugin = NamePlugin::from_info(&dummy_multi_plugin());
    let names = plugin.interface_names();
    assert_eq!(names.len(), 6);
    assert!(plugin.instance_address().is_some());
}
