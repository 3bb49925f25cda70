//! Placeholder resolution
//!
//! A [`PropertyResolver`] expands `${key}` references inside property
//! values. Raw values come from an ordered list of [`ValueSource`] tiers:
//! the property mapping itself, process-wide system properties, then the
//! environment for keys prefixed with `env.`.
//!
//! ```rust
//! use propconf_core::{Properties, PropertyResolver};
//!
//! let props: Properties = [("host", "localhost"), ("url", "http://${host}:8080")]
//!     .into_iter()
//!     .collect();
//!
//! let resolver = PropertyResolver::with_builtins();
//! let url = resolver.resolve("url", &props, None).unwrap();
//! assert_eq!(url.as_deref(), Some("http://localhost:8080"));
//! ```

use std::sync::{Arc, OnceLock, RwLock};

use crate::error::Result;
use crate::expansion::ExpansionBuffer;
use crate::guard::ResolutionGuard;
use crate::properties::Properties;

/// Prefix marking a key that may be looked up in the environment
pub const ENV_PREFIX: &str = "env.";

// Process-wide system properties, the second lookup tier
static SYSTEM_PROPERTIES: OnceLock<RwLock<Properties>> = OnceLock::new();

/// Get the process-wide system properties.
///
/// Lazily initialized empty. Resolution only ever takes the read lock.
pub fn system_properties() -> &'static RwLock<Properties> {
    SYSTEM_PROPERTIES.get_or_init(|| RwLock::new(Properties::new()))
}

/// Set a process-wide system property, returning the previous value
pub fn set_system_property(key: impl Into<String>, value: impl Into<String>) -> Option<String> {
    system_properties()
        .write()
        .expect("System properties lock poisoned")
        .insert(key, value)
}

/// Remove a process-wide system property
pub fn clear_system_property(key: &str) -> Option<String> {
    system_properties()
        .write()
        .expect("System properties lock poisoned")
        .remove(key)
}

/// A lookup tier that may supply the raw value of a key
pub trait ValueSource: Send + Sync {
    /// Look up the raw, unexpanded value for `key`
    ///
    /// # Arguments
    /// * `key` - The property key being resolved
    /// * `properties` - The property mapping being resolved against
    /// * `environment` - The environment mapping, if one was supplied
    fn raw_value(
        &self,
        key: &str,
        properties: &Properties,
        environment: Option<&Properties>,
    ) -> Option<String>;

    /// Get the name of this source
    fn name(&self) -> &str;

    /// Whether this source is consulted when the previous one yielded an
    /// empty value. Sources are always consulted after an absent one.
    fn replaces_empty(&self) -> bool {
        true
    }
}

/// Looks keys up in the property mapping being resolved
pub struct ProjectSource;

impl ValueSource for ProjectSource {
    fn raw_value(&self, key: &str, properties: &Properties, _: Option<&Properties>) -> Option<String> {
        properties.get(key).map(str::to_string)
    }

    fn name(&self) -> &str {
        "project"
    }
}

/// Looks keys up in the process-wide system properties
pub struct SystemSource;

impl ValueSource for SystemSource {
    fn raw_value(&self, key: &str, _: &Properties, _: Option<&Properties>) -> Option<String> {
        system_properties()
            .read()
            .expect("System properties lock poisoned")
            .get(key)
            .map(str::to_string)
    }

    fn name(&self) -> &str {
        "system"
    }
}

/// Looks `env.NAME` keys up as `NAME` in the environment mapping
pub struct EnvSource;

impl ValueSource for EnvSource {
    fn raw_value(
        &self,
        key: &str,
        _: &Properties,
        environment: Option<&Properties>,
    ) -> Option<String> {
        let name = key.strip_prefix(ENV_PREFIX)?;
        environment?.get(name).map(str::to_string)
    }

    fn name(&self) -> &str {
        "env"
    }

    // An empty system property hides the environment variable
    fn replaces_empty(&self) -> bool {
        false
    }
}

/// A simple function-based source
pub struct FnSource<F>
where
    F: Fn(&str, &Properties, Option<&Properties>) -> Option<String> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnSource<F>
where
    F: Fn(&str, &Properties, Option<&Properties>) -> Option<String> + Send + Sync,
{
    /// Create a new function-based source
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> ValueSource for FnSource<F>
where
    F: Fn(&str, &Properties, Option<&Properties>) -> Option<String> + Send + Sync,
{
    fn raw_value(
        &self,
        key: &str,
        properties: &Properties,
        environment: Option<&Properties>,
    ) -> Option<String> {
        (self.func)(key, properties, environment)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Expands `${key}` placeholders against an ordered chain of sources
#[derive(Clone)]
pub struct PropertyResolver {
    sources: Vec<Arc<dyn ValueSource>>,
}

impl Default for PropertyResolver {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for PropertyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyResolver")
            .field("sources", &self.source_names())
            .finish()
    }
}

impl PropertyResolver {
    /// Create a resolver with no sources
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Create a resolver with the standard tiers: project, system, env
    pub fn with_builtins() -> Self {
        let mut resolver = Self::new();
        resolver.register(Arc::new(ProjectSource));
        resolver.register(Arc::new(SystemSource));
        resolver.register(Arc::new(EnvSource));
        resolver
    }

    /// Append a source; it is consulted after the ones already registered
    pub fn register(&mut self, source: Arc<dyn ValueSource>) {
        self.sources.push(source);
    }

    /// Names of the registered sources, in lookup order
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// The non-empty raw value of `key`, walking the sources in order.
    ///
    /// A source is consulted while the previous one had no value, or had an
    /// empty value and the source [replaces empty](ValueSource::replaces_empty)
    /// ones.
    pub fn raw_value(
        &self,
        key: &str,
        properties: &Properties,
        environment: Option<&Properties>,
    ) -> Option<String> {
        let mut current: Option<String> = None;
        for source in &self.sources {
            match current.as_deref() {
                Some(value) if !value.is_empty() => break,
                Some(_) if !source.replaces_empty() => break,
                _ => {}
            }
            current = source.raw_value(key, properties, environment);
        }
        current.filter(|value| !value.is_empty())
    }

    /// Resolve `key` with a fresh guard.
    ///
    /// Returns `Ok(None)` when no source has a value for the key. Nested
    /// placeholders that cannot be resolved are kept verbatim. The only
    /// error is a circular definition.
    pub fn resolve(
        &self,
        key: &str,
        properties: &Properties,
        environment: Option<&Properties>,
    ) -> Result<Option<String>> {
        self.resolve_with_guard(key, properties, environment, &ResolutionGuard::new())
    }

    /// Resolve `key` with the keys already on `guard` treated as ancestors
    pub fn resolve_with_guard(
        &self,
        key: &str,
        properties: &Properties,
        environment: Option<&Properties>,
        guard: &ResolutionGuard,
    ) -> Result<Option<String>> {
        if guard.is_visited(key) {
            return Err(guard.circular_error(key));
        }

        let Some(raw) = self.raw_value(key, properties, environment) else {
            return Ok(None);
        };

        let mut buffer = ExpansionBuffer::new(Some(&raw));
        let nested_guard = guard.with_key(key);

        while !buffer.is_fully_resolved() {
            let Some(nested_key) = buffer.extract_next_key() else {
                break;
            };
            buffer.advance_past_placeholder();
            log::trace!(
                "Expanding '${{{}}}' in value of '{}' at depth {}",
                nested_key,
                key,
                nested_guard.depth()
            );

            match self.resolve_with_guard(&nested_key, properties, environment, &nested_guard)? {
                Some(value) => buffer.append_resolved(&value),
                None => buffer.append_resolved(&format!("${{{}}}", nested_key)),
            }
        }

        buffer.fully_resolved().map(|s| Some(s.to_string()))
    }

    /// Resolve every key of `properties`.
    ///
    /// Each key is resolved against the raw input, so earlier results never
    /// change what later keys see. Keys without a value map to an empty
    /// string.
    pub fn resolve_all(
        &self,
        properties: &Properties,
        environment: Option<&Properties>,
    ) -> Result<Properties> {
        let mut resolved = Properties::new();
        for key in properties.keys() {
            let value = self.resolve(key, properties, environment)?;
            resolved.insert(key, value.unwrap_or_default());
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn props(entries: &[(&str, &str)]) -> Properties {
        entries.iter().copied().collect()
    }

    fn resolve(key: &str, properties: &Properties) -> Result<Option<String>> {
        PropertyResolver::with_builtins().resolve(key, properties, None)
    }

    #[test]
    fn test_no_placeholder_passthrough() {
        let p = props(&[("plain", "just a value with $ and {braces}")]);
        assert_eq!(
            resolve("plain", &p).unwrap().as_deref(),
            Some("just a value with $ and {braces}")
        );
    }

    #[test]
    fn test_simple_substitution() {
        let p = props(&[("a", "1"), ("b", "${a}")]);
        assert_eq!(resolve("b", &p).unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_chained_substitution() {
        let p = props(&[("a", "${b}"), ("b", "${c}"), ("c", "X")]);
        assert_eq!(resolve("a", &p).unwrap().as_deref(), Some("X"));
    }

    #[test]
    fn test_substitution_inside_text() {
        let p = props(&[
            ("host", "db.local"),
            ("port", "5432"),
            ("url", "jdbc:postgresql://${host}:${port}/app"),
        ]);
        assert_eq!(
            resolve("url", &p).unwrap().as_deref(),
            Some("jdbc:postgresql://db.local:5432/app")
        );
    }

    #[test]
    fn test_unresolved_placeholder_preserved() {
        let p = props(&[("a", "${propconf.test.missing}")]);
        assert_eq!(
            resolve("a", &p).unwrap().as_deref(),
            Some("${propconf.test.missing}")
        );
    }

    #[test]
    fn test_partially_resolved_value() {
        let p = props(&[("a", "${x}-${propconf.test.later}"), ("x", "1")]);
        assert_eq!(
            resolve("a", &p).unwrap().as_deref(),
            Some("1-${propconf.test.later}")
        );
    }

    #[test]
    fn test_missing_key_is_none() {
        let p = props(&[("a", "1")]);
        assert_eq!(resolve("propconf.test.absent", &p).unwrap(), None);
    }

    #[test]
    fn test_empty_value_is_none() {
        let p = props(&[("empty", ""), ("ref", "[${empty}]")]);
        assert_eq!(resolve("empty", &p).unwrap(), None);
        assert_eq!(resolve("ref", &p).unwrap().as_deref(), Some("[${empty}]"));
    }

    #[test]
    fn test_direct_cycle_detection() {
        let p = props(&[("a", "${b}"), ("b", "${a}")]);
        let err = resolve("a", &p).unwrap_err();

        assert_eq!(err.kind, ErrorKind::CircularReference);
        assert!(err.to_string().contains("a --> b --> a"));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let p = props(&[("test", "${test}")]);
        let err = resolve("test", &p).unwrap_err();

        assert!(err.is_circular());
        assert!(err.to_string().contains("test --> test"));
    }

    #[test]
    fn test_deep_cycle_aborts_whole_resolution() {
        let p = props(&[
            ("top", "ok ${a}"),
            ("a", "${b}"),
            ("b", "${c}"),
            ("c", "${a}"),
        ]);
        let err = resolve("top", &p).unwrap_err();
        assert!(err.to_string().contains("top --> a --> b --> c --> a"));
    }

    #[test]
    fn test_repeated_reference_is_not_a_cycle() {
        let p = props(&[("a", "${x}${x}"), ("x", "${y}"), ("y", "1")]);
        assert_eq!(resolve("a", &p).unwrap().as_deref(), Some("11"));
    }

    #[test]
    fn test_environment_fallback() {
        let p = props(&[("greeting", "home is ${env.HOME}")]);
        let env = props(&[("HOME", "/root")]);
        let resolver = PropertyResolver::with_builtins();

        assert_eq!(
            resolver.resolve("env.HOME", &p, Some(&env)).unwrap().as_deref(),
            Some("/root")
        );
        assert_eq!(
            resolver.resolve("greeting", &p, Some(&env)).unwrap().as_deref(),
            Some("home is /root")
        );
    }

    #[test]
    fn test_environment_requires_prefix() {
        let p = Properties::new();
        let env = props(&[("PROPCONF_TEST_ONLY_ENV", "x")]);
        let resolver = PropertyResolver::with_builtins();

        assert_eq!(
            resolver.resolve("PROPCONF_TEST_ONLY_ENV", &p, Some(&env)).unwrap(),
            None
        );
    }

    #[test]
    fn test_environment_without_mapping_keeps_placeholder() {
        let p = props(&[("a", "${env.PROPCONF_TEST_NOPE}")]);
        assert_eq!(
            resolve("a", &p).unwrap().as_deref(),
            Some("${env.PROPCONF_TEST_NOPE}")
        );
    }

    #[test]
    fn test_project_value_shadows_environment() {
        let p = props(&[("env.HOME", "/project-home")]);
        let env = props(&[("HOME", "/root")]);
        let resolver = PropertyResolver::with_builtins();

        assert_eq!(
            resolver.resolve("env.HOME", &p, Some(&env)).unwrap().as_deref(),
            Some("/project-home")
        );
    }

    #[test]
    fn test_tier_precedence() {
        set_system_property("propconf.test.precedence", "from-system");
        let p = props(&[("propconf.test.precedence", "from-project")]);

        assert_eq!(
            resolve("propconf.test.precedence", &p).unwrap().as_deref(),
            Some("from-project")
        );

        clear_system_property("propconf.test.precedence");
    }

    #[test]
    fn test_system_property_fallback() {
        set_system_property("propconf.test.fallback", "from-system");
        let p = props(&[("a", "${propconf.test.fallback}"), ("propconf.test.empty", "")]);

        assert_eq!(resolve("a", &p).unwrap().as_deref(), Some("from-system"));

        clear_system_property("propconf.test.fallback");
        assert_eq!(
            resolve("a", &p).unwrap().as_deref(),
            Some("${propconf.test.fallback}")
        );
    }

    #[test]
    fn test_empty_project_value_falls_through_to_system() {
        set_system_property("propconf.test.blank", "system-value");
        let p = props(&[("propconf.test.blank", "")]);

        assert_eq!(
            resolve("propconf.test.blank", &p).unwrap().as_deref(),
            Some("system-value")
        );

        clear_system_property("propconf.test.blank");
    }

    #[test]
    fn test_empty_system_property_hides_environment() {
        set_system_property("env.PROPCONF_TEST_HIDDEN", "");
        let env = props(&[("PROPCONF_TEST_HIDDEN", "from-env")]);
        let resolver = PropertyResolver::with_builtins();

        assert_eq!(
            resolver
                .resolve("env.PROPCONF_TEST_HIDDEN", &Properties::new(), Some(&env))
                .unwrap(),
            None
        );

        clear_system_property("env.PROPCONF_TEST_HIDDEN");
        assert_eq!(
            resolver
                .resolve("env.PROPCONF_TEST_HIDDEN", &Properties::new(), Some(&env))
                .unwrap()
                .as_deref(),
            Some("from-env")
        );
    }

    #[test]
    fn test_empty_project_value_still_reaches_environment() {
        let p = props(&[("env.PROPCONF_TEST_REACHED", "")]);
        let env = props(&[("PROPCONF_TEST_REACHED", "from-env")]);

        assert_eq!(
            PropertyResolver::with_builtins()
                .resolve("env.PROPCONF_TEST_REACHED", &p, Some(&env))
                .unwrap()
                .as_deref(),
            Some("from-env")
        );
    }

    #[test]
    fn test_idempotence() {
        let p = props(&[("a", "stable")]);
        let first = resolve("a", &p).unwrap();
        let second = resolve("a", &p).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sibling_independence() {
        let p = props(&[("a", "${x}${y}"), ("x", "1"), ("y", "2")]);
        let resolver = PropertyResolver::with_builtins();

        assert_eq!(resolver.resolve("a", &p, None).unwrap().as_deref(), Some("12"));
        assert_eq!(resolver.resolve("x", &p, None).unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_sibling_sharing_a_dependency() {
        let p = props(&[("a", "${x}/${y}"), ("x", "${z}"), ("y", "${z}"), ("z", "v")]);
        assert_eq!(resolve("a", &p).unwrap().as_deref(), Some("v/v"));
    }

    #[test]
    fn test_resolve_with_existing_guard() {
        let p = props(&[("a", "${b}"), ("b", "1")]);
        let resolver = PropertyResolver::with_builtins();
        let guard = ResolutionGuard::new().with_key("b");

        let err = resolver.resolve_with_guard("a", &p, None, &guard).unwrap_err();
        assert!(err.to_string().contains("b --> a --> b"));
    }

    #[test]
    fn test_resolution_does_not_mutate_inputs() {
        let p = props(&[("a", "${b}"), ("b", "1")]);
        let before = p.clone();
        let _ = resolve("a", &p).unwrap();
        assert_eq!(p, before);
    }

    #[test]
    fn test_nested_brace_uses_inner_placeholder() {
        let p = props(&[("a", "${outer${inner}}"), ("inner", "X")]);
        assert_eq!(resolve("a", &p).unwrap().as_deref(), Some("${outerX}"));
    }

    #[test]
    fn test_unterminated_placeholder_passes_through() {
        let p = props(&[("a", "broken ${unterminated")]);
        assert_eq!(
            resolve("a", &p).unwrap().as_deref(),
            Some("broken ${unterminated")
        );
    }

    #[test]
    fn test_custom_source_is_consulted_last() {
        let mut resolver = PropertyResolver::with_builtins();
        resolver.register(Arc::new(FnSource::new("defaults", |key, _, _| {
            (key == "propconf.test.port").then(|| "8080".to_string())
        })));

        let p = props(&[("url", "http://localhost:${propconf.test.port}")]);
        assert_eq!(
            resolver.resolve("url", &p, None).unwrap().as_deref(),
            Some("http://localhost:8080")
        );
        assert_eq!(resolver.source_names(), vec!["project", "system", "env", "defaults"]);
    }

    #[test]
    fn test_empty_resolver_resolves_nothing() {
        let p = props(&[("a", "1")]);
        assert_eq!(PropertyResolver::new().resolve("a", &p, None).unwrap(), None);
    }

    #[test]
    fn test_resolve_all() {
        let p = props(&[("a", "${b}-${c}"), ("b", "1"), ("c", "${b}"), ("e", "")]);
        let resolved = PropertyResolver::with_builtins().resolve_all(&p, None).unwrap();

        assert_eq!(resolved.get("a"), Some("1-1"));
        assert_eq!(resolved.get("c"), Some("1"));
        assert_eq!(resolved.get("e"), Some(""));
        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec!["a", "b", "c", "e"]);
    }

    #[test]
    fn test_resolve_all_fails_on_cycle() {
        let p = props(&[("ok", "1"), ("a", "${a}")]);
        let err = PropertyResolver::with_builtins().resolve_all(&p, None).unwrap_err();
        assert!(err.is_circular());
    }
}
