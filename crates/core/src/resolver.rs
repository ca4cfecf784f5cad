//! Fallback-chain resolution over ordered resource sources.

use std::{env, fmt, io::Read, path::PathBuf, sync::Arc};

use parking_lot::RwLock;
use tracing::trace;
use url::Url;

use crate::{
    error::{Error, Result},
    source::{ambient_source, DirSource, PathSource, Source, TypeHandle},
};

/// Immutable, ordered snapshot of the sources consulted for one resolution
/// call. Once built, a chain never changes; mutating the process-wide
/// default source afterwards does not affect it.
#[derive(Clone, Default)]
pub struct Chain {
    sources: Vec<Arc<dyn Source>>,
}

impl Chain {
    /// Build a chain from optional entries, skipping absences and keeping
    /// only the first occurrence of any duplicate source.
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Option<Arc<dyn Source>>>,
    {
        let mut sources: Vec<Arc<dyn Source>> = Vec::new();
        for entry in entries.into_iter().flatten() {
            if !sources.iter().any(|existing| same_source(existing, &entry)) {
                sources.push(entry);
            }
        }
        Self { sources }
    }

    /// Build a chain from definite sources.
    pub fn from_sources<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Source>>,
    {
        Self::new(sources.into_iter().map(Some))
    }

    /// Sources in consultation order.
    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    /// Number of sources in the chain.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the chain holds no sources at all.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|source| source.describe()))
            .finish()
    }
}

fn same_source(a: &Arc<dyn Source>, b: &Arc<dyn Source>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Resolves names through chains built from an explicit source, the
/// process-wide default source, the thread's ambient source, and the
/// built-in fallbacks, in that priority order.
pub struct Resolver {
    default_source: RwLock<Option<Arc<dyn Source>>>,
    defining: Option<Arc<dyn Source>>,
    system: Arc<dyn Source>,
}

impl Resolver {
    /// Resolver with the built-in fallbacks: the process working directory
    /// and the `SOURCEFALL_PATH` search path.
    pub fn new() -> Self {
        Self::with_extra_roots(Vec::new())
    }

    /// Resolver whose system search path is extended with additional roots
    /// at the lowest priority.
    pub fn with_extra_roots<I>(extra: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let defining = env::current_dir()
            .ok()
            .map(|dir| Arc::new(DirSource::new(dir)) as Arc<dyn Source>);
        let mut system = PathSource::from_env();
        for root in extra {
            system.push_root(root);
        }
        Self {
            default_source: RwLock::new(None),
            defining,
            system: Arc::new(system),
        }
    }

    /// Last-writer-wins process-wide default source.
    pub fn default_source(&self) -> Option<Arc<dyn Source>> {
        self.default_source.read().clone()
    }

    /// Replace the process-wide default source. `None` clears it.
    pub fn set_default_source(&self, source: Option<Arc<dyn Source>>) {
        *self.default_source.write() = source;
    }

    /// Build the consultation chain for one call: the explicit source, the
    /// default source, the thread's ambient source, then the built-in
    /// fallbacks, with absences elided.
    pub fn chain(&self, explicit: Option<Arc<dyn Source>>) -> Chain {
        Chain::new([
            explicit,
            self.default_source(),
            ambient_source(),
            self.defining.clone(),
            Some(Arc::clone(&self.system)),
        ])
    }

    /// Walk the chain and return the first openable stream for `name`,
    /// retrying each source once with a leading separator before moving on.
    pub fn find_stream(&self, name: &str, chain: &Chain) -> Option<Box<dyn Read + Send>> {
        let rooted = rooted(name);
        for source in chain.sources() {
            if let Some(stream) = source.open(name).or_else(|| source.open(&rooted)) {
                trace!("resource {} opened via {}", name, source.describe());
                return Some(stream);
            }
        }
        trace!("resource {} not found in {} sources", name, chain.len());
        None
    }

    /// Walk the chain and return the first locator for `name`, with the
    /// same two-attempt-per-source algorithm as [`Self::find_stream`].
    pub fn find_url(&self, name: &str, chain: &Chain) -> Option<Url> {
        let rooted = rooted(name);
        for source in chain.sources() {
            if let Some(url) = source.locate(name).or_else(|| source.locate(&rooted)) {
                trace!("resource {} located via {}", name, source.describe());
                return Some(url);
            }
        }
        trace!("resource {} not located in {} sources", name, chain.len());
        None
    }

    /// Resolve a qualified type name, swallowing per-source misses. Only
    /// after every source fails is [`Error::TypeNotFound`] raised, carrying
    /// the attempted name. Type names are not path-like, so there is no
    /// leading-separator retry.
    pub fn load_type(&self, name: &str, chain: &Chain) -> Result<TypeHandle> {
        for source in chain.sources() {
            if let Some(handle) = source.load_type(name) {
                trace!("type {} resolved via {}", name, source.describe());
                return Ok(handle);
            }
        }
        Err(Error::TypeNotFound(name.to_string()))
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

fn rooted(name: &str) -> String {
    format!("/{name}")
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use crate::source::{set_ambient_source, MemorySource};

    use super::*;

    fn memory(label: &str, entries: &[(&str, &str)]) -> Arc<dyn Source> {
        let mut source = MemorySource::new(label);
        for (name, contents) in entries {
            source = source.with_resource(*name, *contents);
        }
        Arc::new(source)
    }

    fn read_all(mut stream: Box<dyn Read + Send>) -> Result<String> {
        let mut contents = String::new();
        stream.read_to_string(&mut contents)?;
        Ok(contents)
    }

    #[test]
    fn earlier_sources_take_priority() -> Result<()> {
        let first = memory("first", &[("app.properties", "owner=first")]);
        let second = memory("second", &[("app.properties", "owner=second")]);
        let chain = Chain::from_sources([first, second]);

        let resolver = Resolver::new();
        let stream = resolver.find_stream("app.properties", &chain).expect("hit");
        assert_eq!(read_all(stream)?, "owner=first");
        Ok(())
    }

    #[test]
    fn misses_every_source_and_reports_nothing() {
        let chain = Chain::from_sources([memory("only", &[("present.txt", "x")])]);
        let resolver = Resolver::new();
        assert!(resolver.find_stream("absent.txt", &chain).is_none());
        assert!(resolver.find_url("absent.txt", &chain).is_none());
    }

    #[test]
    fn retries_with_a_leading_separator() -> Result<()> {
        // A source that only indexes the rooted form must still be found.
        let chain = Chain::from_sources([memory("rooted", &[("/foo.txt", "rooted hit")])]);
        let resolver = Resolver::new();

        let stream = resolver.find_stream("foo.txt", &chain).expect("hit");
        assert_eq!(read_all(stream)?, "rooted hit");
        assert!(resolver.find_url("foo.txt", &chain).is_some());
        Ok(())
    }

    #[test]
    fn skips_absent_entries_and_duplicates() {
        let shared = memory("shared", &[]);
        let chain = Chain::new([
            None,
            Some(Arc::clone(&shared)),
            None,
            Some(Arc::clone(&shared)),
            Some(memory("tail", &[])),
        ]);

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.sources()[0].describe(), "memory:shared");
        assert_eq!(chain.sources()[1].describe(), "memory:tail");
    }

    #[test]
    fn chain_order_is_a_snapshot() {
        let explicit = memory("explicit", &[]);
        let default = memory("default", &[]);
        let ambient = memory("ambient", &[]);

        let resolver = Resolver::new();
        resolver.set_default_source(Some(Arc::clone(&default)));
        set_ambient_source(Some(Arc::clone(&ambient)));
        let chain = resolver.chain(Some(Arc::clone(&explicit)));
        set_ambient_source(None);

        let labels: Vec<String> = chain
            .sources()
            .iter()
            .map(|source| source.describe())
            .collect();
        assert_eq!(labels[0], "memory:explicit");
        assert_eq!(labels[1], "memory:default");
        assert_eq!(labels[2], "memory:ambient");

        // Re-pointing the default source must not affect the built chain.
        resolver.set_default_source(Some(memory("replacement", &[])));
        assert_eq!(chain.sources()[1].describe(), "memory:default");

        let rebuilt = resolver.chain(Some(explicit));
        assert_eq!(rebuilt.sources()[1].describe(), "memory:replacement");
    }

    #[test]
    fn default_source_appears_exactly_once() {
        let default = memory("default", &[]);
        let resolver = Resolver::new();
        resolver.set_default_source(Some(Arc::clone(&default)));

        // Explicit and default are the same source here; the chain keeps one.
        let chain = resolver.chain(Some(Arc::clone(&default)));
        let hits = chain
            .sources()
            .iter()
            .filter(|source| source.describe() == "memory:default")
            .count();
        assert_eq!(hits, 1);
        assert_eq!(chain.sources()[0].describe(), "memory:default");

        resolver.set_default_source(None);
    }

    #[test]
    fn type_resolution_aggregates_per_source_misses() {
        struct Widget;
        let without = Arc::new(MemorySource::new("without")) as Arc<dyn Source>;
        let with = Arc::new(
            MemorySource::new("with").with_type(TypeHandle::new("com.example.Widget", Widget)),
        ) as Arc<dyn Source>;
        let chain = Chain::from_sources([without, with]);

        let resolver = Resolver::new();
        let handle = resolver
            .load_type("com.example.Widget", &chain)
            .expect("resolved");
        assert_eq!(handle.name(), "com.example.Widget");
        assert!(handle.is::<Widget>());

        let err = resolver
            .load_type("com.example.Missing", &chain)
            .expect_err("exhausted");
        assert!(err.to_string().contains("com.example.Missing"));
    }
}
