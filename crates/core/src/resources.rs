//! Convenience facade over the fallback resolver.

use std::{io::Read, path::PathBuf, sync::Arc};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use url::Url;

use crate::{
    config::AppConfig,
    error::{Error, Result},
    fetch,
    properties::Properties,
    resolver::Resolver,
    source::{Source, TypeHandle},
    text::{Charset, TextReader},
};

static GLOBAL: Lazy<Resources> = Lazy::new(Resources::new);

/// Facade simplifying access to resources through the fallback chain.
///
/// Holds the two process-wide slots — the default source and the text
/// decoding mode — and layers convenience operations over [`Resolver`].
/// Each `*_from` variant consults an explicitly supplied source at the
/// highest priority; the plain variants use the default chain.
pub struct Resources {
    resolver: Resolver,
    charset: RwLock<Option<Charset>>,
}

impl Resources {
    /// Facade with empty slots and the built-in fallback sources.
    pub fn new() -> Self {
        Self {
            resolver: Resolver::new(),
            charset: RwLock::new(None),
        }
    }

    /// Facade seeded from the ambient configuration layer.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            resolver: Resolver::with_extra_roots(config.search_path.clone()),
            charset: RwLock::new(config.charset),
        }
    }

    /// Process-wide instance backing static-style use.
    pub fn global() -> &'static Resources {
        &GLOBAL
    }

    /// The resolver behind this facade.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// The process-wide default source, if set.
    pub fn default_source(&self) -> Option<Arc<dyn Source>> {
        self.resolver.default_source()
    }

    /// Replace the process-wide default source. Last writer wins; chains
    /// already built keep the source they snapshotted.
    pub fn set_default_source(&self, source: Option<Arc<dyn Source>>) {
        self.resolver.set_default_source(source);
    }

    /// Charset used by text-returning operations; `None` means the
    /// platform default.
    pub fn charset(&self) -> Option<Charset> {
        *self.charset.read()
    }

    /// Replace the text decoding mode. `None` restores the platform
    /// default.
    pub fn set_charset(&self, charset: Option<Charset>) {
        *self.charset.write() = charset;
    }

    fn effective_charset(&self) -> Charset {
        self.charset.read().unwrap_or_default()
    }

    /// Locator for the named resource on the default chain.
    pub fn resource_url(&self, resource: &str) -> Result<Url> {
        self.locate(None, resource)
    }

    /// Locator for the named resource, consulting `source` first.
    pub fn resource_url_from(&self, source: Arc<dyn Source>, resource: &str) -> Result<Url> {
        self.locate(Some(source), resource)
    }

    /// Open the named resource as a byte stream on the default chain. The
    /// caller owns the stream and releases it by dropping it.
    pub fn resource_as_stream(&self, resource: &str) -> Result<Box<dyn Read + Send>> {
        self.open(None, resource)
    }

    /// Open the named resource as a byte stream, consulting `source` first.
    pub fn resource_as_stream_from(
        &self,
        source: Arc<dyn Source>,
        resource: &str,
    ) -> Result<Box<dyn Read + Send>> {
        self.open(Some(source), resource)
    }

    /// Parse the named resource as a property set. The stream is scoped to
    /// this call and released even when parsing fails.
    pub fn resource_as_properties(&self, resource: &str) -> Result<Properties> {
        let mut stream = self.open(None, resource)?;
        Properties::load(&mut stream)
    }

    /// Parse the named resource as a property set, consulting `source`
    /// first.
    pub fn resource_as_properties_from(
        &self,
        source: Arc<dyn Source>,
        resource: &str,
    ) -> Result<Properties> {
        let mut stream = self.open(Some(source), resource)?;
        Properties::load(&mut stream)
    }

    /// Open the named resource as decoded text using the configured (or
    /// default) charset.
    pub fn resource_as_reader(&self, resource: &str) -> Result<TextReader<Box<dyn Read + Send>>> {
        let stream = self.open(None, resource)?;
        Ok(TextReader::new(stream, self.effective_charset()))
    }

    /// Open the named resource as decoded text, consulting `source` first.
    pub fn resource_as_reader_from(
        &self,
        source: Arc<dyn Source>,
        resource: &str,
    ) -> Result<TextReader<Box<dyn Read + Send>>> {
        let stream = self.open(Some(source), resource)?;
        Ok(TextReader::new(stream, self.effective_charset()))
    }

    /// Local file path of the named resource, when its locator has one.
    pub fn resource_as_file(&self, resource: &str) -> Result<PathBuf> {
        let url = self.resource_url(resource)?;
        url.to_file_path().map_err(|()| Error::NotAFile(url))
    }

    /// Local file path of the named resource, consulting `source` first.
    pub fn resource_as_file_from(&self, source: Arc<dyn Source>, resource: &str) -> Result<PathBuf> {
        let url = self.resource_url_from(source, resource)?;
        url.to_file_path().map_err(|()| Error::NotAFile(url))
    }

    /// Fetch an absolute address as a byte stream. No fallback chain
    /// applies.
    pub fn url_as_stream(&self, address: &str) -> Result<Box<dyn Read + Send>> {
        fetch::url_as_stream(address)
    }

    /// Fetch an absolute address as decoded text.
    pub fn url_as_reader(&self, address: &str) -> Result<TextReader<Box<dyn Read + Send>>> {
        let stream = fetch::url_as_stream(address)?;
        Ok(TextReader::new(stream, self.effective_charset()))
    }

    /// Fetch an absolute address as a property set.
    pub fn url_as_properties(&self, address: &str) -> Result<Properties> {
        let mut stream = fetch::url_as_stream(address)?;
        Properties::load(&mut stream)
    }

    /// Resolve a qualified type name over the default chain.
    pub fn type_for_name(&self, name: &str) -> Result<TypeHandle> {
        let chain = self.resolver.chain(None);
        self.resolver.load_type(name, &chain)
    }

    fn open(
        &self,
        explicit: Option<Arc<dyn Source>>,
        resource: &str,
    ) -> Result<Box<dyn Read + Send>> {
        let chain = self.resolver.chain(explicit);
        self.resolver
            .find_stream(resource, &chain)
            .ok_or_else(|| Error::NotFound(resource.to_string()))
    }

    fn locate(&self, explicit: Option<Arc<dyn Source>>, resource: &str) -> Result<Url> {
        let chain = self.resolver.chain(explicit);
        self.resolver
            .find_url(resource, &chain)
            .ok_or_else(|| Error::NotFound(resource.to_string()))
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}
