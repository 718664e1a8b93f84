//! Explicitly constructed framework context
//!
//! Holds what would otherwise be process-wide state: the container registry,
//! discovery extensions, the active tag selection, discovery options and the
//! project base run config. It is passed into discovery and activation calls
//! instead of being looked up globally.

use crate::container::{Container, ContainerRegistry, ContainerType};
use crate::discovery::{DiscoveryExtension, DiscoveryOptions, ManifestIndexer, ScopeIndexer};
use crate::error::DiscoveryResult;
use crate::run_config::RunConfig;
use crate::tag::{TagFilter, TagSelection};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct FrameworkContext {
    registry: ContainerRegistry,
    extensions: Vec<Arc<dyn DiscoveryExtension>>,
    tag_filter: Arc<dyn TagFilter>,
    options: DiscoveryOptions,
    indexer: Arc<dyn ScopeIndexer>,
    /// Starting config units layer their own settings on
    base_config: RunConfig,
}

impl Default for FrameworkContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameworkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameworkContext")
            .field("registry", &self.registry)
            .field("extensions", &self.extensions.len())
            .field("options", &self.options)
            .field("base_config", &self.base_config)
            .finish_non_exhaustive()
    }
}

impl FrameworkContext {
    /// Empty registry, no extensions, every tag admitted, manifest indexing
    pub fn new() -> Self {
        Self {
            registry: ContainerRegistry::new(),
            extensions: Vec::new(),
            tag_filter: Arc::new(TagSelection::all()),
            options: DiscoveryOptions::default(),
            indexer: Arc::new(ManifestIndexer::new()),
            base_config: RunConfig::default(),
        }
    }

    pub fn with_registry(mut self, registry: ContainerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Append an extension; extensions run in the order they were added
    pub fn with_extension(mut self, extension: impl DiscoveryExtension + 'static) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    pub fn with_tag_filter(mut self, filter: impl TagFilter + 'static) -> Self {
        self.tag_filter = Arc::new(filter);
        self
    }

    pub fn with_options(mut self, options: DiscoveryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_indexer(mut self, indexer: impl ScopeIndexer + 'static) -> Self {
        self.indexer = Arc::new(indexer);
        self
    }

    /// Project defaults handed to container factories
    pub fn with_base_config(mut self, config: RunConfig) -> Self {
        self.base_config = config;
        self
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ContainerRegistry {
        &mut self.registry
    }

    pub fn extensions(&self) -> &[Arc<dyn DiscoveryExtension>] {
        &self.extensions
    }

    pub fn tag_filter(&self) -> &dyn TagFilter {
        self.tag_filter.as_ref()
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    pub fn indexer(&self) -> Arc<dyn ScopeIndexer> {
        Arc::clone(&self.indexer)
    }

    pub fn base_config(&self) -> &RunConfig {
        &self.base_config
    }

    /// Instantiate a discovered type on the base config
    pub fn instantiate(&self, container: &ContainerType) -> DiscoveryResult<Box<dyn Container>> {
        self.registry.instantiate_with(container, &self.base_config)
    }
}
