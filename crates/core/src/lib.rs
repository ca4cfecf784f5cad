#![warn(clippy::all, missing_docs)]

//! Chained resource resolution for the sourcefall project.
//!
//! This crate locates named resources (byte streams, addressable locators,
//! key-value property sets, registered types) by falling through an ordered
//! chain of pluggable sources, smoothing over environment-specific
//! differences in where resources live at runtime.

pub mod config;
pub mod error;
pub mod fetch;
pub mod properties;
pub mod resolver;
pub mod resources;
pub mod source;
pub mod text;

pub use crate::config::AppConfig;
pub use error::{Error, Result};
pub use properties::Properties;
pub use resolver::{Chain, Resolver};
pub use resources::Resources;
pub use source::{
    ambient_source, set_ambient_source, take_ambient_source, DirSource, MemorySource, PathSource,
    Source, TypeHandle,
};
pub use text::{Charset, TextReader};
