//! In-memory source for embedded resources and registered types.

use std::{
    collections::HashMap,
    fmt,
    io::{Cursor, Read},
    sync::Arc,
};

use url::Url;

use super::{Source, TypeHandle};

/// Source backed by an in-memory map of resource bytes plus a type registry.
///
/// Lookup is exact-key: no separator normalisation is applied, matching
/// sources that index their entries verbatim. It is the resolver's job to
/// retry with a leading separator where that matters.
#[derive(Clone, Default)]
pub struct MemorySource {
    name: String,
    entries: HashMap<String, Arc<[u8]>>,
    types: HashMap<String, TypeHandle>,
}

impl MemorySource {
    /// Empty source with the given label.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            types: HashMap::new(),
        }
    }

    /// Add a resource under its exact name.
    pub fn with_resource(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(name.into(), Arc::from(bytes.into()));
        self
    }

    /// Register a type handle under its qualified name.
    pub fn with_type(mut self, handle: TypeHandle) -> Self {
        self.types.insert(handle.name().to_string(), handle);
        self
    }

    /// Whether a resource is present under exactly this name.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .field("types", &self.types.len())
            .finish()
    }
}

impl Source for MemorySource {
    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn open(&self, name: &str) -> Option<Box<dyn Read + Send>> {
        self.entries
            .get(name)
            .map(|bytes| Box::new(Cursor::new(Arc::clone(bytes))) as Box<dyn Read + Send>)
    }

    fn locate(&self, name: &str) -> Option<Url> {
        if !self.contains(name) {
            return None;
        }
        Url::parse(&format!(
            "memory://{}/{}",
            self.name,
            name.trim_start_matches('/')
        ))
        .ok()
    }

    fn load_type(&self, name: &str) -> Option<TypeHandle> {
        self.types.get(name).cloned()
    }
}
