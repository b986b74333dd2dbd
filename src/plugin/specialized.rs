//! Specialized plugin views
//!
//! A [`SpecializedPlugin`] is a [`Plugin`] that resolves a fixed set of
//! interfaces once, when its instance is installed, and afterwards answers
//! queries for those interfaces from a slot lookup instead of a name lookup.
//! Queries for any other interface fall through to the generic path, so the
//! result of a query never depends on whether it was specialized.
//!
//! The interface set is a tuple of [`Spec`] markers, or a [`Compose`] of such
//! sets:
//!
//! ```ignore
//! type ShapePlugin = SpecializedPlugin<(Spec<dyn Shape>, Spec<dyn Named>)>;
//! type Both = SpecializedPlugin<Compose<(Spec<dyn Shape>,), (Spec<dyn Named>,)>>;
//! ```

use super::info::PluginInfo;
use super::instance::Plugin;
use super::interface::{InterfacePtr, InterfaceRef};
use super::name::normalize;
use super::traits::Interface;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::Deref;

/// Cached interface entry; `None` when the instance does not provide it
pub type Slot = Option<InterfacePtr>;

/// Names one interface of a specialization set
pub struct Spec<I: ?Sized>(PhantomData<fn() -> Box<I>>);

/// Union of two specialization sets
pub struct Compose<A, B>(PhantomData<fn() -> (A, B)>);

/// A compile-time set of interfaces with one slot each
pub trait Specialization: 'static {
    type Slots: Default + Clone + Send + Sync;

    /// Whether the interface with this type id is in the set
    fn contains(id: TypeId) -> bool;

    /// Canonical names of the set's interfaces
    fn interface_names() -> Vec<String>;

    /// Fill every slot from `plugin`'s interface table
    fn populate(slots: &mut Self::Slots, plugin: &Plugin);

    /// Slot for the interface with this type id, if it is in the set
    fn slot(slots: &Self::Slots, id: TypeId) -> Option<&Slot>;
}

impl Specialization for () {
    type Slots = ();

    fn contains(_: TypeId) -> bool {
        false
    }

    fn interface_names() -> Vec<String> {
        Vec::new()
    }

    fn populate(_: &mut (), _: &Plugin) {}

    fn slot(_: &(), _: TypeId) -> Option<&Slot> {
        None
    }
}

macro_rules! impl_specialization_for_tuple {
    ($len:literal => $($iface:ident),+) => {
        impl<$($iface),+> Specialization for ($(Spec<$iface>,)+)
        where
            $($iface: Interface + ?Sized),+
        {
            type Slots = [Slot; $len];

            fn contains(id: TypeId) -> bool {
                false $(|| id == TypeId::of::<$iface>())+
            }

            fn interface_names() -> Vec<String> {
                vec![$(normalize(&<$iface as Interface>::interface_name())),+]
            }

            fn populate(slots: &mut Self::Slots, plugin: &Plugin) {
                for (slot, name) in slots.iter_mut().zip(Self::interface_names()) {
                    *slot = plugin.entry(&name).cloned();
                }
            }

            fn slot(slots: &Self::Slots, id: TypeId) -> Option<&Slot> {
                [$(TypeId::of::<$iface>()),+]
                    .iter()
                    .position(|candidate| *candidate == id)
                    .map(|index| &slots[index])
            }
        }
    };
}

impl_specialization_for_tuple!(1 => A);
impl_specialization_for_tuple!(2 => A, B);
impl_specialization_for_tuple!(3 => A, B, C);
impl_specialization_for_tuple!(4 => A, B, C, D);
impl_specialization_for_tuple!(5 => A, B, C, D, E);
impl_specialization_for_tuple!(6 => A, B, C, D, E, F);
impl_specialization_for_tuple!(7 => A, B, C, D, E, F, G);
impl_specialization_for_tuple!(8 => A, B, C, D, E, F, G, H);

impl<A: Specialization, B: Specialization> Specialization for Compose<A, B> {
    type Slots = (A::Slots, B::Slots);

    fn contains(id: TypeId) -> bool {
        A::contains(id) || B::contains(id)
    }

    fn interface_names() -> Vec<String> {
        let mut names = A::interface_names();
        for name in B::interface_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    fn populate(slots: &mut Self::Slots, plugin: &Plugin) {
        A::populate(&mut slots.0, plugin);
        B::populate(&mut slots.1, plugin);
    }

    fn slot(slots: &Self::Slots, id: TypeId) -> Option<&Slot> {
        A::slot(&slots.0, id).or_else(|| B::slot(&slots.1, id))
    }
}

#[cfg(test)]
thread_local! {
    static SPECIALIZED_HITS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

#[inline]
fn record_specialized_access() {
    #[cfg(test)]
    SPECIALIZED_HITS.with(|hits| hits.set(hits.get() + 1));
}

/// Plugin handle with cached slots for the interfaces in `S`
pub struct SpecializedPlugin<S: Specialization> {
    // Slots are dropped before the instance they point into.
    slots: S::Slots,
    plugin: Plugin,
}

impl<S: Specialization> SpecializedPlugin<S> {
    /// Create an empty handle
    pub fn new() -> Self {
        Self {
            slots: S::Slots::default(),
            plugin: Plugin::new(),
        }
    }

    /// Create a handle to a fresh instance of `info`
    pub fn from_info(info: &PluginInfo) -> Self {
        Self::from(Plugin::from_info(info))
    }

    /// Whether `I` is resolved through a slot
    pub fn is_specialized_for<I: Interface + ?Sized>() -> bool {
        S::contains(TypeId::of::<I>())
    }

    /// Replace the instance, as [`Plugin::initialize`], and refill the slots
    pub fn initialize(&mut self, info: Option<&PluginInfo>) {
        self.slots = S::Slots::default();
        self.plugin.initialize(info);
        S::populate(&mut self.slots, &self.plugin);
    }

    /// Share `other`'s instance, as [`Plugin::copy_instance_from`], and refill the slots
    pub fn copy_instance_from(&mut self, other: &Plugin) {
        self.slots = S::Slots::default();
        self.plugin.copy_instance_from(other);
        S::populate(&mut self.slots, &self.plugin);
    }

    pub fn clear(&mut self) {
        self.slots = S::Slots::default();
        self.plugin.clear();
    }

    /// Interface `I`, from its slot when `I` is in the set
    pub fn query_interface<I: Interface + ?Sized>(&self) -> Option<&I> {
        match S::slot(&self.slots, TypeId::of::<I>()) {
            Some(slot) => {
                record_specialized_access();
                let ptr = slot.as_ref()?.downcast::<I>()?;
                // SAFETY: slots point into the instance held by `self.plugin`
                Some(unsafe { ptr.as_ref() })
            }
            None => self.plugin.query_interface::<I>(),
        }
    }

    /// Whether this plugin provides `I`, from its slot when `I` is in the set
    pub fn provides<I: Interface + ?Sized>(&self) -> bool {
        match S::slot(&self.slots, TypeId::of::<I>()) {
            Some(slot) => {
                record_specialized_access();
                slot.is_some()
            }
            None => self.plugin.provides::<I>(),
        }
    }

    /// Interface `I` together with a share of the instance
    pub fn query_interface_shared<I: Interface + ?Sized>(&self) -> Option<InterfaceRef<I>> {
        match S::slot(&self.slots, TypeId::of::<I>()) {
            Some(slot) => {
                record_specialized_access();
                let ptr = slot.as_ref()?.downcast::<I>()?;
                let instance = self.plugin.instance_arc()?;
                // SAFETY: as for `query_interface`
                Some(unsafe { InterfaceRef::new(instance, ptr) })
            }
            None => self.plugin.query_interface_shared::<I>(),
        }
    }

    pub fn as_plugin(&self) -> &Plugin {
        &self.plugin
    }

    pub fn into_plugin(self) -> Plugin {
        self.plugin
    }
}

impl<S: Specialization> Default for SpecializedPlugin<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Specialization> Clone for SpecializedPlugin<S> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            plugin: self.plugin.clone(),
        }
    }
}

impl<S: Specialization> From<Plugin> for SpecializedPlugin<S> {
    fn from(plugin: Plugin) -> Self {
        let mut slots = S::Slots::default();
        S::populate(&mut slots, &plugin);
        Self { slots, plugin }
    }
}

impl<S: Specialization> Deref for SpecializedPlugin<S> {
    type Target = Plugin;

    fn deref(&self) -> &Plugin {
        &self.plugin
    }
}

impl<S: Specialization, T: Specialization> PartialEq<SpecializedPlugin<T>> for SpecializedPlugin<S> {
    fn eq(&self, other: &SpecializedPlugin<T>) -> bool {
        self.plugin == other.plugin
    }
}

impl<S: Specialization> PartialEq<Plugin> for SpecializedPlugin<S> {
    fn eq(&self, other: &Plugin) -> bool {
        self.plugin == *other
    }
}

impl<S: Specialization> PartialEq<SpecializedPlugin<S>> for Plugin {
    fn eq(&self, other: &SpecializedPlugin<S>) -> bool {
        *self == other.plugin
    }
}

impl<S: Specialization> Eq for SpecializedPlugin<S> {}

impl<S: Specialization> Hash for SpecializedPlugin<S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.plugin.hash(state);
    }
}

impl<S: Specialization> fmt::Debug for SpecializedPlugin<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecializedPlugin")
            .field("specialized", &S::interface_names())
            .field("plugin", &self.plugin)
            .finish()
    }
}
