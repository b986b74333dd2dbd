//! Interface trait definitions

use super::name;

/// A capability a plugin can expose.
///
/// Implemented for trait-object types (`dyn Shape`) and, occasionally, for
/// concrete component types such as [`EnablePluginFromThis`]. The associated
/// name is the lookup key used by every name-based query, so two plugins
/// built separately agree on it as long as they agree on the type path.
///
/// Use the [`interface!`](crate::interface) macro rather than implementing
/// this by hand.
///
/// [`EnablePluginFromThis`]: super::EnablePluginFromThis
pub trait Interface: 'static {
    /// Canonical name of this interface
    fn interface_name() -> String {
        name::interface_name_of::<Self>()
    }
}
