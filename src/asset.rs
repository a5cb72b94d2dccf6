//! Assets - Source Files and their Filter Chains
//!
//! An [`Asset`] owns its path metadata, its group, its ordered filter
//! mapping and the content of its last build.
//!
//! CRITICAL: `build` is the only place content changes. A failed build leaves
//! the previous content in place.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::filesystem::{Filesystem, FilesystemError};
use crate::filter::{
    BuildKind, EngineError, Filter, FilterContext, FilterEngine, RestrictionContext,
};
use crate::group::AssetGroup;
use crate::paths;
use crate::registry::FilterFactory;

/// Order of assets that were never given one. Sorts after every explicit order.
pub const UNORDERED: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPhase {
    Load,
    Dump,
}

impl fmt::Display for FilterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Dump => f.write_str("dump"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to read {asset}: {source}")]
    Io {
        asset: String,
        #[source]
        source: FilesystemError,
    },

    #[error("Filter {filter} failed during {phase} of {asset}: {source}")]
    Transform {
        filter: String,
        asset: String,
        phase: FilterPhase,
        #[source]
        source: EngineError,
    },
}

/// What to hand to [`Asset::apply`].
#[derive(Debug)]
pub enum FilterSpec {
    ByName { name: String, arguments: Vec<String> },
    ByInstance(Filter),
}

impl FilterSpec {
    pub fn named(name: impl Into<String>, arguments: Vec<String>) -> Self {
        Self::ByName {
            name: name.into(),
            arguments,
        }
    }
}

impl From<&str> for FilterSpec {
    fn from(name: &str) -> Self {
        Self::named(name, Vec::new())
    }
}

impl From<String> for FilterSpec {
    fn from(name: String) -> Self {
        Self::named(name, Vec::new())
    }
}

impl From<Filter> for FilterSpec {
    fn from(filter: Filter) -> Self {
        Self::ByInstance(filter)
    }
}

/// The active subset of an asset's filters, in insertion order, each with
/// the engine it will run.
pub struct PreparedFilters<'a> {
    filters: Vec<(&'a Filter, Box<dyn FilterEngine>)>,
}

impl<'a> PreparedFilters<'a> {
    pub fn has(&self, name: &str) -> bool {
        self.filters.iter().any(|(f, _)| f.name() == name)
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.filters.iter().map(|(f, _)| (*f).name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Filter> + '_ {
        self.filters.iter().map(|(f, _)| *f)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for PreparedFilters<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

pub struct Asset {
    files: Arc<dyn Filesystem>,
    factory: Arc<dyn FilterFactory>,
    environment: String,
    absolute_path: String,
    relative_path: String,
    group: Option<AssetGroup>,
    order: u32,
    excluded: bool,
    raw: bool,
    filters: Vec<Filter>,
    last_modified: Option<i64>,
    content: Option<String>,
}

impl Asset {
    /// Create an asset. Local assets read their modification time here, so a
    /// missing file fails construction.
    pub fn new(
        files: Arc<dyn Filesystem>,
        factory: Arc<dyn FilterFactory>,
        environment: impl Into<String>,
        absolute_path: impl Into<String>,
        relative_path: impl Into<String>,
    ) -> Result<Self, FilesystemError> {
        let absolute_path = absolute_path.into();
        let last_modified = if paths::is_remote(&absolute_path) {
            None
        } else {
            Some(files.last_modified(&absolute_path)?)
        };

        Ok(Self {
            files,
            factory,
            environment: environment.into(),
            absolute_path,
            relative_path: relative_path.into(),
            group: None,
            order: UNORDERED,
            excluded: false,
            raw: false,
            filters: Vec::new(),
            last_modified,
            content: None,
        })
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn absolute_path(&self) -> &str {
        &self.absolute_path
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn last_modified(&self) -> Option<i64> {
        self.last_modified
    }

    /// Content of the last successful build.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn is_remote(&self) -> bool {
        paths::is_remote(&self.absolute_path)
    }

    pub fn usable_extension(&self) -> &str {
        paths::usable_extension(paths::extension(&self.relative_path))
    }

    pub fn usable_path(&self) -> String {
        paths::usable_path(&self.relative_path)
    }

    /// Usable path carrying a digest of the last built content. Before the
    /// first build the digest covers the relative path alone.
    pub fn fingerprinted_path(&self) -> String {
        paths::fingerprinted_path(&self.relative_path, self.content().unwrap_or(""))
    }

    // --- Group ---

    pub fn set_group(&mut self, group: Option<AssetGroup>) -> &mut Self {
        self.group = group;
        self
    }

    /// The explicitly assigned group, if any.
    pub fn group(&self) -> Option<AssetGroup> {
        self.group
    }

    /// Explicit group, or one inferred from the usable extension.
    pub fn effective_group(&self) -> AssetGroup {
        self.group
            .unwrap_or_else(|| AssetGroup::from_usable_extension(self.usable_extension()))
    }

    pub fn is_stylesheet(&self) -> bool {
        self.effective_group() == AssetGroup::Stylesheets
    }

    pub fn is_javascript(&self) -> bool {
        self.effective_group() == AssetGroup::Javascripts
    }

    // --- Flags ---

    pub fn exclude(&mut self) -> &mut Self {
        self.excluded = true;
        self
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Mark the asset to be served as-is by downstream writers.
    pub fn raw(&mut self) -> &mut Self {
        self.raw = true;
        self
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    // --- Ordering ---

    pub fn set_order(&mut self, order: NonZeroU32) -> &mut Self {
        self.order = order.get();
        self
    }

    pub fn first(&mut self) -> &mut Self {
        self.order = 1;
        self
    }

    pub fn second(&mut self) -> &mut Self {
        self.order = 2;
        self
    }

    pub fn third(&mut self) -> &mut Self {
        self.order = 3;
        self
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    // --- Filters ---

    /// Register a filter and return it for chaining restrictions.
    /// Re-applying a name replaces the earlier filter and moves it to the end.
    pub fn apply(&mut self, spec: impl Into<FilterSpec>) -> &mut Filter {
        let filter = match spec.into() {
            FilterSpec::ByName { name, arguments } => {
                self.factory.make(&name, arguments, &self.environment)
            }
            FilterSpec::ByInstance(filter) => filter,
        };

        self.filters.retain(|f| f.name() != filter.name());
        self.filters.push(filter);
        let idx = self.filters.len() - 1;
        &mut self.filters[idx]
    }

    pub fn apply_with(&mut self, name: impl Into<String>, arguments: Vec<String>) -> &mut Filter {
        self.apply(FilterSpec::named(name, arguments))
    }

    /// Every registered filter, active or not.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn filter(&self, name: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.name() == name)
    }

    pub fn prepare_filters(&self) -> PreparedFilters<'_> {
        self.prepare_filters_for(BuildKind::Development)
    }

    /// Filters whose restrictions all pass for this asset, paired with a
    /// freshly constructed engine. Filters that cannot be constructed are
    /// dropped with a warning.
    pub fn prepare_filters_for(&self, kind: BuildKind) -> PreparedFilters<'_> {
        let context = RestrictionContext {
            group: self.effective_group(),
            relative_path: &self.relative_path,
            build: kind,
        };

        let filters = self
            .filters
            .iter()
            .filter(|filter| filter.is_active(&context))
            .filter_map(|filter| match filter.instantiate() {
                Ok(engine) => Some((filter, engine)),
                Err(e) => {
                    warn!(
                        asset = %self.relative_path,
                        filter = filter.name(),
                        error = %e,
                        "filter will not run"
                    );
                    None
                }
            })
            .collect();

        PreparedFilters { filters }
    }

    // --- Build ---

    pub fn build(&mut self) -> Result<String, BuildError> {
        self.build_for(BuildKind::Development)
    }

    /// Load the source and fold it through the active filter chain: every
    /// load hook first, then every dump hook, both in chain order.
    pub fn build_for(&mut self, kind: BuildKind) -> Result<String, BuildError> {
        let source = self.load_source()?;
        let mut context = FilterContext::new(&self.relative_path, source);

        let mut prepared = self.prepare_filters_for(kind);

        debug!(
            asset = %self.relative_path,
            filters = prepared.len(),
            ?kind,
            "building asset"
        );

        for (filter, engine) in prepared.filters.iter_mut() {
            engine
                .filter_load(&mut context)
                .map_err(|source| self.transform_error(filter.name(), FilterPhase::Load, source))?;
        }

        for (filter, engine) in prepared.filters.iter_mut() {
            engine
                .filter_dump(&mut context)
                .map_err(|source| self.transform_error(filter.name(), FilterPhase::Dump, source))?;
        }

        // Prepared filters borrow the mapping until dropped
        drop(prepared);
        let content = context.into_content();
        self.content = Some(content.clone());
        Ok(content)
    }

    fn load_source(&self) -> Result<String, BuildError> {
        let result = if self.is_remote() {
            self.files.get_remote(&self.absolute_path)
        } else {
            self.files.get_contents(&self.absolute_path)
        };

        result.map_err(|source| BuildError::Io {
            asset: self.relative_path.clone(),
            source,
        })
    }

    fn transform_error(&self, filter: &str, phase: FilterPhase, source: EngineError) -> BuildError {
        BuildError::Transform {
            filter: filter.to_string(),
            asset: self.relative_path.clone(),
            phase,
            source,
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("absolute_path", &self.absolute_path)
            .field("relative_path", &self.relative_path)
            .field("environment", &self.environment)
            .field("group", &self.group)
            .field("order", &self.order)
            .field("excluded", &self.excluded)
            .field("raw", &self.raw)
            .field("filters", &self.filters)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}
