//! Reading property sets from files, URLs and ant patterns
//!
//! A [`PropertiesReader`] loads every configured resource into one mapping,
//! in order (files, then URLs, then pattern matches; later resources
//! override earlier ones), and finally rewrites every value with its
//! resolved form.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::pattern;
use crate::properties::Properties;
use crate::resolver::{PropertyResolver, ENV_PREFIX};
use crate::resource::{self, Resource};

/// Placeholder prefix that makes the reader snapshot the environment
const ENV_PLACEHOLDER: &str = "${env.";

/// Options controlling which resources are read and how
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Property files, read in order
    pub files: Vec<PathBuf>,
    /// URLs, read after the files
    pub urls: Vec<String>,
    /// Ant path patterns, expanded and read last
    pub includes: Vec<String>,
    /// Skip missing files and URLs instead of failing
    pub quiet: bool,
    /// Prefix prepended to every key read from a resource
    pub key_prefix: Option<String>,
    /// Do not read anything
    pub skip: bool,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property file
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Add a URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.urls.push(url.into());
        self
    }

    /// Add an ant path pattern
    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.includes.push(pattern.into());
        self
    }

    /// Set quiet mode for missing resources
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Set the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Skip reading entirely
    pub fn with_skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }
}

/// Loads and resolves property resources
#[derive(Debug, Clone, Default)]
pub struct PropertiesReader {
    options: ReadOptions,
    resolver: PropertyResolver,
    environment: Option<Properties>,
}

impl PropertiesReader {
    /// Create a reader with the built-in resolver tiers
    pub fn new(options: ReadOptions) -> Self {
        Self {
            options,
            resolver: PropertyResolver::with_builtins(),
            environment: None,
        }
    }

    /// Use a custom resolver
    pub fn with_resolver(mut self, resolver: PropertyResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Use a fixed environment mapping instead of the process environment
    pub fn with_environment(mut self, environment: Properties) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Load all resources into `target` and resolve every value in place.
    ///
    /// A circular definition aborts the read with `target` holding the
    /// loaded, unresolved values.
    pub fn read(&self, target: &mut Properties) -> Result<()> {
        if self.options.skip {
            log::warn!("The properties are ignored");
            return Ok(());
        }

        self.load_into(target)?;
        *target = self.resolve(target)?;
        Ok(())
    }

    /// Load and resolve into a fresh mapping
    pub fn read_properties(&self) -> Result<Properties> {
        let mut props = Properties::new();
        self.read(&mut props)?;
        Ok(props)
    }

    /// Load all resources into `target` without resolving placeholders
    pub fn load_into(&self, target: &mut Properties) -> Result<()> {
        for file in &self.options.files {
            self.load(&Resource::file(file), target)?;
        }

        for url in &self.options.urls {
            self.load(&Resource::url(url)?, target)?;
        }

        for include in &self.options.includes {
            for path in pattern::files_matching(include)? {
                log::debug!(
                    "Found potential properties file '{}' by ant path pattern: '{}'",
                    path.display(),
                    include
                );
                self.merge(&Resource::file(path), target)?;
            }
        }

        Ok(())
    }

    /// Resolve every key of `props` against the environment, if needed
    pub fn resolve(&self, props: &Properties) -> Result<Properties> {
        let environment = self.environment_for(props);
        self.resolver.resolve_all(props, environment.as_ref())
    }

    /// Resolve a single key of `props`
    pub fn resolve_key(&self, key: &str, props: &Properties) -> Result<Option<String>> {
        let environment = if key.starts_with(ENV_PREFIX) {
            Some(self.environment())
        } else {
            self.environment_for(props)
        };
        self.resolver.resolve(key, props, environment.as_ref())
    }

    fn environment_for(&self, props: &Properties) -> Option<Properties> {
        props
            .values()
            .any(|v| v.contains(ENV_PLACEHOLDER))
            .then(|| self.environment())
    }

    fn environment(&self) -> Properties {
        self.environment
            .clone()
            .unwrap_or_else(Properties::from_env)
    }

    fn load(&self, resource: &Resource, target: &mut Properties) -> Result<()> {
        if !resource.can_be_opened() {
            return self.missing(resource, Error::resource_not_found(resource.to_string()));
        }
        match self.merge(resource, target) {
            Err(e) if resource::is_missing(&e) => self.missing(resource, e),
            other => other,
        }
    }

    fn missing(&self, resource: &Resource, err: Error) -> Result<()> {
        if !self.options.quiet {
            return Err(err);
        }
        log::info!(
            "Quiet processing - ignoring properties cannot be loaded from {}",
            resource
        );
        Ok(())
    }

    fn merge(&self, resource: &Resource, target: &mut Properties) -> Result<()> {
        log::debug!("Loading properties from {}", resource);
        let loaded = resource.load()?;
        let prefix = self.options.key_prefix.as_deref().unwrap_or_default();

        for (key, value) in loaded.iter() {
            let key = format!("{}{}", prefix, key);
            if let Some(current) = target.get(&key) {
                if current != value {
                    log::warn!(
                        "Property {} is already defined. New value {} redefined current value {}",
                        key,
                        value,
                        current
                    );
                }
            }
            target.insert(key, value);
        }

        Ok(())
    }
}

/// Resolve every key of `properties` with the built-in tiers
pub fn resolve_all(properties: &Properties, environment: Option<&Properties>) -> Result<Properties> {
    PropertyResolver::with_builtins().resolve_all(properties, environment)
}
