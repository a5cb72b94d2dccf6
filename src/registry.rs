//! Filter Registry - Name to Engine Resolution
//!
//! Maps filter names (and aliases) to engine constructors. Unknown names do
//! not fail: they produce an unresolved [`Filter`] that never fires.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::engines::{BannerEngine, ReplaceEngine};
use crate::filter::{EngineConstructor, Filter, FilterEngine};

/// Constructs named filters for an asset.
pub trait FilterFactory: Send + Sync {
    fn make(&self, name: &str, arguments: Vec<String>, environment: &str) -> Filter;
}

#[derive(Default)]
pub struct FilterRegistry {
    constructors: HashMap<String, EngineConstructor>,
    aliases: BTreeMap<String, String>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in engines registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ReplaceEngine::NAME, ReplaceEngine::from_arguments);
        registry.register(BannerEngine::NAME, BannerEngine::from_arguments);
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&[String]) -> Result<Box<dyn FilterEngine>, String> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
        self
    }

    pub fn alias(&mut self, alias: impl Into<String>, target: impl Into<String>) -> &mut Self {
        self.aliases.insert(alias.into(), target.into());
        self
    }

    /// Resolve an alias to the engine name it stands for.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }
}

impl FilterFactory for FilterRegistry {
    fn make(&self, name: &str, arguments: Vec<String>, environment: &str) -> Filter {
        let engine_name = self.resolve(name);
        match self.constructors.get(engine_name) {
            Some(constructor) => Filter::from_parts(
                name.to_string(),
                Some(engine_name.to_string()),
                arguments,
                environment.to_string(),
                Some(Arc::clone(constructor)),
            ),
            None => {
                debug!(filter = name, "no engine registered, filter left unresolved");
                Filter::unresolved(name, arguments, environment)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = FilterRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["Banner", "Replace"]);
    }

    #[test]
    fn test_make_known_filter() {
        let registry = FilterRegistry::with_defaults();
        let filter = registry.make("Replace", vec!["a".into(), "b".into()], "production");
        assert!(filter.is_resolvable());
        assert_eq!(filter.name(), "Replace");
        assert_eq!(filter.engine_name(), Some("Replace"));
        assert_eq!(filter.environment(), "production");
        assert_eq!(filter.arguments(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_alias_resolution() {
        let mut registry = FilterRegistry::with_defaults();
        registry.alias("Swap", "Replace");
        let filter = registry.make("Swap", vec!["a".into()], "testing");
        assert_eq!(filter.name(), "Swap");
        assert_eq!(filter.engine_name(), Some("Replace"));
        assert!(filter.instantiate().is_ok());
    }

    #[test]
    fn test_unknown_filter_is_unresolved() {
        let registry = FilterRegistry::with_defaults();
        let filter = registry.make("FooFilter", vec![], "testing");
        assert_eq!(filter.name(), "FooFilter");
        assert!(!filter.is_resolvable());
    }
}
