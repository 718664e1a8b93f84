//! Test container discovery
//!
//! Maps a [`DiscoveryRequest`] to a deterministic, ordered list of runnable
//! container types:
//! 1. Explicit names, if any, are resolved against the container registry.
//!    Otherwise every manifest reachable from the search scopes is indexed.
//! 2. Only concrete container types are kept; abstract types and singletons
//!    are dropped.
//! 3. Discovery extensions are applied in registration order.
//! 4. The result is sorted by simple name and de-duplicated.
//!
//! Discovery is all-or-nothing: any failure aborts the call without a
//! partial result.

pub mod index;

use crate::container::{ContainerId, ContainerType, TypeKind};
use crate::context::FrameworkContext;
use crate::error::{DiscoveryError, DiscoveryResult};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

pub use index::{
    index_in_background, ManifestIndexer, ScopeIndexer, TypeIndex, DEFAULT_EXCLUDED_NAMESPACES,
    MANIFEST_SUFFIX,
};

/// Default indexing ceiling
pub const DEFAULT_INDEX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Focuses the scope of which containers to discover
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryRequest {
    /// Roots to search for type manifests
    pub search_scopes: Vec<PathBuf>,
    /// If non-empty, used instead of searching
    pub explicit_names: Vec<String>,
}

impl DiscoveryRequest {
    pub fn from_scopes<I, P>(scopes: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_scopes: scopes.into_iter().map(Into::into).collect(),
            explicit_names: Vec::new(),
        }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            search_scopes: Vec::new(),
            explicit_names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// True if explicit names take precedence over scope search
    pub fn is_explicit(&self) -> bool {
        !self.explicit_names.is_empty()
    }
}

/// Hook applied to the candidate list after scanning.
///
/// Each extension sees the previous extension's output and may filter,
/// reorder or extend it.
pub trait DiscoveryExtension: Send + Sync {
    fn after_scan(&self, candidates: Vec<ContainerType>) -> Vec<ContainerType>;
}

impl<F> DiscoveryExtension for F
where
    F: Fn(Vec<ContainerType>) -> Vec<ContainerType> + Send + Sync,
{
    fn after_scan(&self, candidates: Vec<ContainerType>) -> Vec<ContainerType> {
        self(candidates)
    }
}

/// Discovery tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Ceiling for the background indexing worker
    pub index_timeout: Duration,
    /// Root namespaces excluded in addition to [`DEFAULT_EXCLUDED_NAMESPACES`]
    pub exclude_namespaces: BTreeSet<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            index_timeout: DEFAULT_INDEX_TIMEOUT,
            exclude_namespaces: BTreeSet::new(),
        }
    }
}

impl DiscoveryOptions {
    pub fn with_index_timeout(mut self, timeout: Duration) -> Self {
        self.index_timeout = timeout;
        self
    }

    pub fn with_excluded_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.exclude_namespaces.insert(namespace.into());
        self
    }

    /// Built-in denylist plus configured additions
    pub fn denylist(&self) -> BTreeSet<String> {
        DEFAULT_EXCLUDED_NAMESPACES
            .iter()
            .map(|ns| ns.to_string())
            .chain(self.exclude_namespaces.iter().cloned())
            .collect()
    }
}

/// Ordered, duplicate-free discovery output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredContainers {
    containers: Vec<ContainerType>,
}

impl DiscoveredContainers {
    /// Sort by simple name (fully-qualified name breaks ties) and drop duplicates
    pub fn new(mut containers: Vec<ContainerType>) -> Self {
        containers.sort_by(|a, b| {
            a.id.simple_name()
                .cmp(b.id.simple_name())
                .then_with(|| a.id.cmp(&b.id))
        });
        containers.dedup_by(|a, b| a.id == b.id);
        Self { containers }
    }

    pub fn containers(&self) -> &[ContainerType] {
        &self.containers
    }

    pub fn ids(&self) -> impl Iterator<Item = &ContainerId> {
        self.containers.iter().map(|c| &c.id)
    }

    /// Fully-qualified names in run order
    pub fn names(&self) -> Vec<&str> {
        self.ids().map(ContainerId::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

impl IntoIterator for DiscoveredContainers {
    type Item = ContainerType;
    type IntoIter = std::vec::IntoIter<ContainerType>;

    fn into_iter(self) -> Self::IntoIter {
        self.containers.into_iter()
    }
}

/// Discovery engine bound to a framework context
pub struct Discovery<'a> {
    context: &'a FrameworkContext,
}

impl<'a> Discovery<'a> {
    pub fn new(context: &'a FrameworkContext) -> Self {
        Self { context }
    }

    /// Discover the containers to run for `request`
    #[tracing::instrument(
        skip_all,
        fields(scopes = request.search_scopes.len(), names = request.explicit_names.len())
    )]
    pub fn discover(&self, request: &DiscoveryRequest) -> DiscoveryResult<DiscoveredContainers> {
        let candidates = if request.is_explicit() {
            self.load_named(&request.explicit_names)?
        } else {
            self.scan(&request.search_scopes)?
        };

        let candidates: Vec<ContainerType> = candidates
            .into_iter()
            .filter(|ty| {
                if !ty.is_container {
                    tracing::warn!(name = %ty.id, "not a test container, skipping");
                }
                ty.is_container
            })
            // abstract parents exist only to be specialised
            .filter(|ty| ty.kind != TypeKind::Abstract)
            // singletons are never constructed by discovery
            .filter(|ty| ty.kind != TypeKind::Singleton)
            .collect();

        let candidates = self
            .context
            .extensions()
            .iter()
            .fold(candidates, |acc, extension| extension.after_scan(acc));

        let discovered = DiscoveredContainers::new(candidates);
        tracing::debug!(count = discovered.len(), "discovery finished");
        Ok(discovered)
    }

    /// Resolve every explicit name; the first unknown name fails the call
    fn load_named(&self, names: &[String]) -> DiscoveryResult<Vec<ContainerType>> {
        names
            .iter()
            .map(|name| {
                self.context
                    .registry()
                    .resolve(name)
                    .ok_or_else(|| DiscoveryError::container_not_found(name.as_str()))
            })
            .collect()
    }

    /// Index the search scopes on a background worker and keep container types
    fn scan(&self, scopes: &[PathBuf]) -> DiscoveryResult<Vec<ContainerType>> {
        let options = self.context.options();
        let index = index_in_background(
            self.context.indexer(),
            scopes.to_vec(),
            TypeIndex::with_denylist(options.denylist()),
            options.index_timeout,
        )?;
        tracing::debug!(indexed = index.len(), "search scopes indexed");
        Ok(index.containers().cloned().collect())
    }
}
