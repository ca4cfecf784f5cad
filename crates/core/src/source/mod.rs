//! Resource sources and the capability trait they implement.

mod dir;
mod memory;

pub use dir::{DirSource, PathSource, SEARCH_PATH_ENV};
pub use memory::MemorySource;

use std::{any::Any, cell::RefCell, fmt, io::Read, sync::Arc};

use url::Url;

/// A pluggable origin of named resources.
///
/// A source can open a resource by its slash-separated logical name, locate
/// it as a URL without opening it, and optionally resolve dotted qualified
/// names against a type registry. Misses are `None`, never errors; the
/// resolver keeps walking the chain until a source answers.
pub trait Source: Send + Sync {
    /// Label used in trace logging and diagnostics.
    fn describe(&self) -> String;

    /// Open the named resource for reading.
    fn open(&self, name: &str) -> Option<Box<dyn Read + Send>>;

    /// Locate the named resource without opening it.
    fn locate(&self, name: &str) -> Option<Url>;

    /// Resolve a dotted qualified name to a registered type handle.
    ///
    /// Sources without a type registry miss by default.
    fn load_type(&self, _name: &str) -> Option<TypeHandle> {
        None
    }
}

/// Named handle to a type resolved through a source's registry.
///
/// Carries the qualified name it was registered under together with an
/// opaque payload the caller can downcast.
#[derive(Clone)]
pub struct TypeHandle {
    name: Arc<str>,
    value: Arc<dyn Any + Send + Sync>,
}

impl TypeHandle {
    /// Wrap a payload under the given qualified name.
    pub fn new<T>(name: impl Into<Arc<str>>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            name: name.into(),
            value: Arc::new(value),
        }
    }

    /// Qualified name the handle was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the payload is of type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrow the payload as `T`, if it is one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

thread_local! {
    static AMBIENT_SOURCE: RefCell<Option<Arc<dyn Source>>> = const { RefCell::new(None) };
}

/// Install a source consulted by every chain built on this thread.
///
/// The ambient slot sits between the process-wide default and the built-in
/// fallbacks in chain priority. Passing `None` clears it.
pub fn set_ambient_source(source: Option<Arc<dyn Source>>) {
    AMBIENT_SOURCE.with(|slot| *slot.borrow_mut() = source);
}

/// The source currently installed for this thread, if any.
pub fn ambient_source() -> Option<Arc<dyn Source>> {
    AMBIENT_SOURCE.with(|slot| slot.borrow().clone())
}

/// Remove and return this thread's ambient source.
pub fn take_ambient_source() -> Option<Arc<dyn Source>> {
    AMBIENT_SOURCE.with(|slot| slot.borrow_mut().take())
}
