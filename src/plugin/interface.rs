//! Type-tagged interface pointers

use super::info::KeepAlive;
use super::instance::Instance;
use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::Arc;

/// Typed pointer to an interface sub-object, stored behind `dyn Any` so an
/// entry can only be recovered as the interface it was created for.
struct RawInterface<I: ?Sized>(NonNull<I>);

// SAFETY: a RawInterface is an address plus metadata. It is only
// dereferenced through a `Plugin` that keeps the pointee alive.
unsafe impl<I: ?Sized> Send for RawInterface<I> {}
unsafe impl<I: ?Sized> Sync for RawInterface<I> {}

/// Non-owning, type-tagged address of one interface of a plugin instance.
///
/// Entries are produced by descriptor casters and stored in a plugin's
/// interface table. Validity is tied to the instance the entry was cast from;
/// the pointer itself grants no ownership of the instance. It does hold a
/// share of the library the caster came from, since `raw` was built there.
#[derive(Clone)]
pub struct InterfacePtr {
    type_id: TypeId,
    type_name: String,
    address: NonNull<()>,
    raw: Arc<dyn Any + Send + Sync>,
    // Declared last: `raw`'s drop glue lives in the library
    keep_alive: Option<KeepAlive>,
}

// SAFETY: see RawInterface
unsafe impl Send for InterfacePtr {}
unsafe impl Sync for InterfacePtr {}

impl InterfacePtr {
    /// Tag `ptr` as an interface of type `I`.
    ///
    /// # Safety
    /// `ptr` must point into a live plugin instance and stay valid until that
    /// instance's deleter runs.
    pub unsafe fn new<I: ?Sized + 'static>(ptr: NonNull<I>) -> Self {
        Self {
            type_id: TypeId::of::<I>(),
            type_name: std::any::type_name::<I>().to_string(),
            address: ptr.cast::<()>(),
            raw: Arc::new(RawInterface(ptr)),
            keep_alive: None,
        }
    }

    pub(crate) fn with_keep_alive(mut self, keep_alive: Option<KeepAlive>) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Address of the interface sub-object (not necessarily the instance address)
    pub fn address(&self) -> *const () {
        self.address.as_ptr()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Compiler identifier of the tagged type
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether this entry was tagged as `I`
    pub fn is<I: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<I>()
    }

    pub(crate) fn downcast<I: ?Sized + 'static>(&self) -> Option<NonNull<I>> {
        (*self.raw)
            .downcast_ref::<RawInterface<I>>()
            .map(|raw| raw.0)
    }
}

impl fmt::Debug for InterfacePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfacePtr")
            .field("type_name", &self.type_name)
            .field("address", &self.address)
            .field("library", &self.keep_alive.is_some())
            .finish()
    }
}

/// Owning reference to one interface of a plugin instance.
///
/// Holds a share of the instance, so the interface stays usable after every
/// `Plugin` handle is gone.
pub struct InterfaceRef<I: ?Sized> {
    ptr: NonNull<I>,
    instance: Arc<Instance>,
}

// SAFETY: the pointee is only reachable as `&I`
unsafe impl<I: ?Sized + Sync> Send for InterfaceRef<I> {}
unsafe impl<I: ?Sized + Sync> Sync for InterfaceRef<I> {}

impl<I: ?Sized> InterfaceRef<I> {
    /// # Safety
    /// `ptr` must point into the object owned by `instance`.
    pub(crate) unsafe fn new(instance: Arc<Instance>, ptr: NonNull<I>) -> Self {
        Self { ptr, instance }
    }

    /// The instance this reference keeps alive
    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn address(&self) -> *const () {
        self.ptr.as_ptr() as *const ()
    }
}

impl<I: ?Sized> Deref for InterfaceRef<I> {
    type Target = I;

    fn deref(&self) -> &I {
        // SAFETY: `self.instance` owns the pointee and outlives this borrow
        unsafe { self.ptr.as_ref() }
    }
}

impl<I: ?Sized> Clone for InterfaceRef<I> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            instance: Arc::clone(&self.instance),
        }
    }
}

impl<I: ?Sized> fmt::Debug for InterfaceRef<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceRef")
            .field("type_name", &std::any::type_name::<I>())
            .field("address", &self.address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Speak {
        fn speak(&self) -> &'static str;
    }

    struct Dog;

    impl Speak for Dog {
        fn speak(&self) -> &'static str {
            "woof"
        }
    }

    #[test]
    fn test_tag_check() {
        let dog = Dog;
        let speak: NonNull<dyn Speak> = NonNull::from(&dog);
        let ptr = unsafe { InterfacePtr::new(speak) };

        assert!(ptr.is::<dyn Speak>());
        assert!(!ptr.is::<Dog>());
        assert!(ptr.downcast::<Dog>().is_none());

        let speak = ptr.downcast::<dyn Speak>().unwrap();
        assert_eq!(unsafe { speak.as_ref() }.speak(), "woof");
        assert_eq!(ptr.address(), &dog as *const Dog as *const ());
    }

    #[test]
    fn test_entry_holds_library() {
        let dog = Dog;
        let library: Arc<String> = Arc::new("libdog".to_string());
        let speak: NonNull<dyn Speak> = NonNull::from(&dog);
        let ptr = unsafe { InterfacePtr::new(speak) }.with_keep_alive(Some(library.clone() as KeepAlive));

        let copy = ptr.clone();
        assert_eq!(Arc::strong_count(&library), 3);
        drop(ptr);
        assert_eq!(copy.type_name(), std::any::type_name::<dyn Speak>());
        drop(copy);
        assert_eq!(Arc::strong_count(&library), 1);
    }
}
