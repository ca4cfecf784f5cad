//! Filesystem-backed sources.

use std::{
    env,
    fs::File,
    io::Read,
    path::{Component, Path, PathBuf},
};

use tracing::warn;
use url::Url;

use super::Source;

/// Environment variable listing the system-wide search roots, delimited by
/// the platform path separator.
pub const SEARCH_PATH_ENV: &str = "SOURCEFALL_PATH";

/// Source serving resources beneath a single filesystem root.
///
/// A single leading separator on the resource name is ignored, so `foo.txt`
/// and `/foo.txt` name the same file. Names that would escape the root are
/// rejected and reported as misses.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Source rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory resources are served from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let trimmed = name.strip_prefix('/').unwrap_or(name);
        let relative = Path::new(trimmed);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            warn!("ignoring resource name {:?}: escapes source root", name);
            return None;
        }

        let path = self.root.join(relative);
        path.is_file().then_some(path)
    }
}

impl Source for DirSource {
    fn describe(&self) -> String {
        format!("dir:{}", self.root.display())
    }

    fn open(&self, name: &str) -> Option<Box<dyn Read + Send>> {
        let path = self.resolve(name)?;
        File::open(path)
            .ok()
            .map(|file| Box::new(file) as Box<dyn Read + Send>)
    }

    fn locate(&self, name: &str) -> Option<Url> {
        let path = self.resolve(name)?;
        let absolute = path.canonicalize().ok()?;
        Url::from_file_path(absolute).ok()
    }
}

/// Ordered list of filesystem roots searched in sequence.
///
/// The search-path analog of a chain of [`DirSource`]s: earlier roots
/// shadow later ones.
#[derive(Debug, Clone, Default)]
pub struct PathSource {
    roots: Vec<PathBuf>,
}

impl PathSource {
    /// Source searching the given roots in order.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from the [`SEARCH_PATH_ENV`] environment variable. An unset
    /// variable yields an empty source that misses everything.
    pub fn from_env() -> Self {
        match env::var_os(SEARCH_PATH_ENV) {
            Some(value) => Self {
                roots: env::split_paths(&value).collect(),
            },
            None => Self::default(),
        }
    }

    /// Roots in search order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Append a root at the lowest priority.
    pub fn push_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    fn sources(&self) -> impl Iterator<Item = DirSource> + '_ {
        self.roots.iter().map(|root| DirSource::new(root.clone()))
    }
}

impl Source for PathSource {
    fn describe(&self) -> String {
        format!("path:[{} roots]", self.roots.len())
    }

    fn open(&self, name: &str) -> Option<Box<dyn Read + Send>> {
        self.sources().find_map(|source| source.open(name))
    }

    fn locate(&self, name: &str) -> Option<Url> {
        self.sources().find_map(|source| source.locate(name))
    }
}
