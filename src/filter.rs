//! Filters - Restriction-Guarded Transformations
//!
//! A [`Filter`] names a transformation engine, the arguments it is built
//! with and the restrictions deciding whether it fires for a given asset.
//! Engines are constructed fresh for every build.

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::group::AssetGroup;

/// Error raised by an engine while transforming content.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// Builds an engine instance from the filter's arguments.
pub type EngineConstructor =
    Arc<dyn Fn(&[String]) -> Result<Box<dyn FilterEngine>, String> + Send + Sync>;

type BeforeFiltering = Arc<dyn Fn(&mut dyn FilterEngine) + Send + Sync>;

/// Capability every transformation engine provides.
pub trait FilterEngine: Send {
    /// Setup before any content is rewritten. May record metadata.
    fn filter_load(&mut self, context: &mut FilterContext) -> Result<(), EngineError>;

    /// Rewrite the content left by the previous filter.
    fn filter_dump(&mut self, context: &mut FilterContext) -> Result<(), EngineError>;

    /// Adjust a named option. Returns false if the option is unknown.
    fn configure(&mut self, _option: &str, _value: &str) -> bool {
        false
    }
}

/// Content and metadata shared by every filter in one build.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    relative_path: String,
    content: String,
    metadata: BTreeMap<String, String>,
}

impl FilterContext {
    pub fn new(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.metadata
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    #[default]
    Development,
    Production,
}

/// Snapshot of the owning asset that restrictions are evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct RestrictionContext<'a> {
    pub group: AssetGroup,
    pub relative_path: &'a str,
    pub build: BuildKind,
}

#[derive(Debug, Clone)]
pub enum Restriction {
    Group(AssetGroup),
    /// Passes when the filter's environment is any of these.
    Environment(Vec<String>),
    Pattern(GlobMatcher),
    Build(BuildKind),
}

impl Restriction {
    fn allows(&self, context: &RestrictionContext<'_>, environment: &str) -> bool {
        match self {
            Self::Group(group) => *group == context.group,
            Self::Environment(envs) => envs.iter().any(|e| e == environment),
            Self::Pattern(matcher) => matcher.is_match(context.relative_path),
            Self::Build(kind) => *kind == context.build,
        }
    }
}

impl PartialEq for Restriction {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Group(a), Self::Group(b)) => a == b,
            (Self::Environment(a), Self::Environment(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.glob().glob() == b.glob().glob(),
            (Self::Build(a), Self::Build(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid asset pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("No engine registered for filter {0}")]
    Unresolved(String),

    #[error("Filter {filter} could not be constructed: {message}")]
    Construction { filter: String, message: String },
}

pub struct Filter {
    name: String,
    engine_name: Option<String>,
    arguments: Vec<String>,
    environment: String,
    restrictions: Vec<Restriction>,
    constructor: Option<EngineConstructor>,
    before_filtering: Vec<BeforeFiltering>,
}

impl Filter {
    /// Filter backed directly by a constructor function.
    pub fn new<F>(name: impl Into<String>, environment: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&[String]) -> Result<Box<dyn FilterEngine>, String> + Send + Sync + 'static,
    {
        let name = name.into();
        Self::from_parts(
            name.clone(),
            Some(name),
            Vec::new(),
            environment.into(),
            Some(Arc::new(constructor)),
        )
    }

    /// Filter whose engine could not be resolved. It is kept for
    /// introspection but never fires.
    pub fn unresolved(
        name: impl Into<String>,
        arguments: Vec<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self::from_parts(name.into(), None, arguments, environment.into(), None)
    }

    pub(crate) fn from_parts(
        name: String,
        engine_name: Option<String>,
        arguments: Vec<String>,
        environment: String,
        constructor: Option<EngineConstructor>,
    ) -> Self {
        Self {
            name,
            engine_name,
            arguments,
            environment,
            restrictions: Vec::new(),
            constructor,
            before_filtering: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the engine this filter resolved to, after alias lookup.
    pub fn engine_name(&self) -> Option<&str> {
        self.engine_name.as_deref()
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn is_resolvable(&self) -> bool {
        self.constructor.is_some()
    }

    fn restrict(&mut self, restriction: Restriction) -> &mut Self {
        if !self.restrictions.contains(&restriction) {
            self.restrictions.push(restriction);
        }
        self
    }

    pub fn when_asset_is_javascript(&mut self) -> &mut Self {
        self.restrict(Restriction::Group(AssetGroup::Javascripts))
    }

    pub fn when_asset_is_stylesheet(&mut self) -> &mut Self {
        self.restrict(Restriction::Group(AssetGroup::Stylesheets))
    }

    /// Fire only for assets whose relative path matches `pattern`.
    /// `*` also crosses directory separators, so `*.js` matches `lib/app.js`.
    pub fn when_asset_is(&mut self, pattern: &str) -> Result<&mut Self, FilterError> {
        let matcher = Glob::new(pattern)
            .map_err(|source| FilterError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?
            .compile_matcher();
        Ok(self.restrict(Restriction::Pattern(matcher)))
    }

    /// Fire only in one of `environments`. An empty list adds no restriction.
    pub fn when_environment_is<I, S>(&mut self, environments: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let environments: Vec<String> = environments.into_iter().map(Into::into).collect();
        if environments.is_empty() {
            return self;
        }
        self.restrict(Restriction::Environment(environments))
    }

    pub fn when_production_build(&mut self) -> &mut Self {
        self.restrict(Restriction::Build(BuildKind::Production))
    }

    pub fn when_development_build(&mut self) -> &mut Self {
        self.restrict(Restriction::Build(BuildKind::Development))
    }

    /// Run `callback` on every freshly constructed engine before it filters.
    pub fn before_filtering<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&mut dyn FilterEngine) + Send + Sync + 'static,
    {
        self.before_filtering.push(Arc::new(callback));
        self
    }

    /// All restrictions must pass; no restrictions means always active.
    pub fn is_active(&self, context: &RestrictionContext<'_>) -> bool {
        self.restrictions
            .iter()
            .all(|r| r.allows(context, &self.environment))
    }

    pub fn instantiate(&self) -> Result<Box<dyn FilterEngine>, ResolutionError> {
        let constructor = self
            .constructor
            .as_ref()
            .ok_or_else(|| ResolutionError::Unresolved(self.name.clone()))?;

        let mut engine = constructor(&self.arguments).map_err(|message| {
            ResolutionError::Construction {
                filter: self.name.clone(),
                message,
            }
        })?;

        for callback in &self.before_filtering {
            callback(engine.as_mut());
        }

        Ok(engine)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("engine_name", &self.engine_name)
            .field("arguments", &self.arguments)
            .field("environment", &self.environment)
            .field("restrictions", &self.restrictions)
            .field("resolvable", &self.is_resolvable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl FilterEngine for Upper {
        fn filter_load(&mut self, _context: &mut FilterContext) -> Result<(), EngineError> {
            Ok(())
        }

        fn filter_dump(&mut self, context: &mut FilterContext) -> Result<(), EngineError> {
            let upper = context.content().to_uppercase();
            context.set_content(upper);
            Ok(())
        }
    }

    fn upper(environment: &str) -> Filter {
        Filter::new("Upper", environment, |_| Ok(Box::new(Upper) as Box<dyn FilterEngine>))
    }

    fn context(group: AssetGroup, path: &str) -> RestrictionContext<'_> {
        RestrictionContext {
            group,
            relative_path: path,
            build: BuildKind::Development,
        }
    }

    #[test]
    fn test_unrestricted_filter_always_active() {
        let filter = upper("testing");
        assert!(filter.is_active(&context(AssetGroup::Stylesheets, "a.css")));
        assert!(filter.is_active(&context(AssetGroup::Javascripts, "b.js")));
    }

    #[test]
    fn test_group_restriction() {
        let mut filter = upper("testing");
        filter.when_asset_is_javascript();
        assert!(!filter.is_active(&context(AssetGroup::Stylesheets, "a.css")));
        assert!(filter.is_active(&context(AssetGroup::Javascripts, "a.js")));
    }

    #[test]
    fn test_environment_restriction_any_of() {
        let mut filter = upper("staging");
        filter.when_environment_is(["production", "staging"]);
        assert!(filter.is_active(&context(AssetGroup::Stylesheets, "a.css")));

        let mut filter = upper("testing");
        filter.when_environment_is(["production"]);
        assert!(!filter.is_active(&context(AssetGroup::Stylesheets, "a.css")));
    }

    #[test]
    fn test_empty_environment_list_is_ignored() {
        let mut filter = upper("testing");
        filter.when_environment_is(Vec::<String>::new());
        assert!(filter.restrictions().is_empty());
        assert!(filter.is_active(&context(AssetGroup::Stylesheets, "a.css")));
    }

    #[test]
    fn test_pattern_restriction_crosses_directories() {
        let mut filter = upper("testing");
        filter.when_asset_is("*.sass").unwrap();
        assert!(filter.is_active(&context(AssetGroup::Stylesheets, "foo/bar.sass")));
        assert!(!filter.is_active(&context(AssetGroup::Stylesheets, "foo/bar.js")));
    }

    #[test]
    fn test_invalid_pattern_fails_fast() {
        let mut filter = upper("testing");
        let err = filter.when_asset_is("foo/[bar").unwrap_err();
        assert!(err.to_string().contains("foo/[bar"));
        assert!(filter.restrictions().is_empty());
    }

    #[test]
    fn test_restrictions_are_conjunctive() {
        let mut filter = upper("testing");
        filter.when_asset_is_stylesheet().when_production_build();
        assert!(!filter.is_active(&context(AssetGroup::Stylesheets, "a.css")));

        let production = RestrictionContext {
            build: BuildKind::Production,
            ..context(AssetGroup::Stylesheets, "a.css")
        };
        assert!(filter.is_active(&production));
    }

    #[test]
    fn test_duplicate_restrictions_collapse() {
        let mut filter = upper("testing");
        filter.when_asset_is_javascript().when_asset_is_javascript();
        filter.when_asset_is("*.js").unwrap();
        filter.when_asset_is("*.js").unwrap();
        assert_eq!(filter.restrictions().len(), 2);
    }

    #[test]
    fn test_unresolved_filter_cannot_instantiate() {
        let filter = Filter::unresolved("Missing", vec![], "testing");
        assert!(!filter.is_resolvable());
        assert_eq!(filter.engine_name(), None);
        assert_eq!(
            filter.instantiate().err(),
            Some(ResolutionError::Unresolved("Missing".to_string()))
        );
    }

    #[test]
    fn test_constructor_failure_is_resolution_error() {
        let filter = Filter::new("Broken", "testing", |_| Err("needs arguments".to_string()));
        match filter.instantiate() {
            Err(ResolutionError::Construction { filter, message }) => {
                assert_eq!(filter, "Broken");
                assert_eq!(message, "needs arguments");
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_instantiated_engine_transforms() {
        let filter = upper("testing");
        let mut engine = filter.instantiate().unwrap();
        let mut ctx = FilterContext::new("a.css", "body {}");
        engine.filter_load(&mut ctx).unwrap();
        engine.filter_dump(&mut ctx).unwrap();
        assert_eq!(ctx.content(), "BODY {}");
    }
}
