//! Declaration macros for interfaces and plugin libraries

/// Implement [`Interface`](crate::plugin::Interface) for a trait-object type.
///
/// ```ignore
/// pub trait Shape: Send + Sync {
///     fn area(&self) -> f64;
/// }
///
/// photon_plugin::interface!(dyn Shape);
/// // or with a name that survives crate renames:
/// photon_plugin::interface!(dyn Shape => "geometry::Shape");
/// ```
#[macro_export]
macro_rules! interface {
    ($ty:ty) => {
        impl $crate::plugin::Interface for $ty {}
    };
    ($ty:ty => $name:expr) => {
        impl $crate::plugin::Interface for $ty {
            fn interface_name() -> ::std::string::String {
                $crate::plugin::normalize($name)
            }
        }
    };
}

/// Export the plugins of a dynamic library.
///
/// Emits the `photon_plugin_entry` symbol that
/// [`PluginLoader::load_library`](crate::plugin::PluginLoader::load_library)
/// looks up. Host and library must be built with the same compiler and the
/// same version of this crate.
///
/// ```ignore
/// photon_plugin::export_plugins![
///     PluginInfo::builder::<Circle>("geometry::Circle")
///         .provides::<dyn Shape>(|c| c)
///         .build(),
/// ];
/// ```
#[macro_export]
macro_rules! export_plugins {
    ($($info:expr),* $(,)?) => {
        #[no_mangle]
        pub fn photon_plugin_entry() -> ::std::vec::Vec<$crate::plugin::PluginInfo> {
            ::std::vec![$($info),*]
        }
    };
}
