//! propconf-core: property file loading with `${key}` placeholder resolution
//!
//! This crate reads `.properties` resources (files, URLs, ant path
//! patterns), merges them, and expands `${key}` placeholders against the
//! loaded properties, the process-wide system properties and the
//! environment (`${env.NAME}`).
//!
//! # Example
//!
//! ```rust
//! use propconf_core::{Properties, PropertyResolver};
//!
//! let props = Properties::parse("host=localhost\nurl=http://${host}:${port}/\n").unwrap();
//! let resolver = PropertyResolver::with_builtins();
//!
//! let url = resolver.resolve("url", &props, None).unwrap();
//! assert_eq!(url.as_deref(), Some("http://localhost:${port}/"));
//! ```

pub mod error;
pub mod expansion;
pub mod guard;
pub mod pattern;
pub mod properties;
pub mod reader;
pub mod resolver;
pub mod resource;
pub mod writer;

pub use error::{Error, ErrorKind, LoadErrorKind, Result};
pub use expansion::ExpansionBuffer;
pub use guard::ResolutionGuard;
pub use properties::Properties;
pub use reader::{resolve_all, PropertiesReader, ReadOptions};
pub use resolver::{
    clear_system_property, set_system_property, FnSource, PropertyResolver, ValueSource,
};
pub use resource::Resource;
pub use writer::{validate_output, write_properties, WriteOptions};
