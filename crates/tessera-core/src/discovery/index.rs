//! Search-scope indexing
//!
//! Search scopes are directories (or single files) holding build-time
//! manifests named `*.tessera.toml`. Each manifest lists the types a
//! compilation unit defines:
//!
//! ```toml
//! [[type]]
//! name = "acme::specs::AlphaSpec"
//! kind = "concrete"
//! container = true
//! ```
//!
//! Indexing runs on a single background worker bounded by a ceiling; see
//! [`index_in_background`].

use crate::container::{ContainerId, ContainerType, TypeKind};
use crate::error::{DiscoveryError, DiscoveryResult};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use walkdir::WalkDir;

/// File name suffix of a type manifest
pub const MANIFEST_SUFFIX: &str = ".tessera.toml";

/// Platform namespaces that never contain test containers
pub const DEFAULT_EXCLUDED_NAMESPACES: &[&str] = &["std", "core", "alloc", "proc_macro", "test"];

/// Types found in the search scopes, keyed by fully-qualified name
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    types: BTreeMap<ContainerId, ContainerType>,
    excluded_namespaces: BTreeSet<String>,
}

impl TypeIndex {
    /// Empty index that drops types from the given root namespaces
    pub fn with_denylist<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: BTreeMap::new(),
            excluded_namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a type. Returns `false` if it is denylisted or already indexed;
    /// the first entry for a name wins.
    pub fn insert(&mut self, ty: ContainerType) -> bool {
        if self.is_excluded(&ty.id) {
            return false;
        }
        if self.types.contains_key(&ty.id) {
            tracing::debug!(name = %ty.id, "type indexed twice, keeping first entry");
            return false;
        }
        self.types.insert(ty.id.clone(), ty);
        true
    }

    pub fn is_excluded(&self, id: &ContainerId) -> bool {
        self.excluded_namespaces.contains(id.root_namespace())
    }

    pub fn get(&self, name: &str) -> Option<&ContainerType> {
        self.types.get(name)
    }

    /// Every indexed type satisfying the container capability
    pub fn containers(&self) -> impl Iterator<Item = &ContainerType> {
        self.types.values().filter(|ty| ty.is_container)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Fills a [`TypeIndex`] from search-scope locators.
///
/// Implementations should poll `cancel` and return early once it is set; the
/// result is discarded at that point.
pub trait ScopeIndexer: Send + Sync {
    fn index(&self, scopes: &[PathBuf], index: &mut TypeIndex, cancel: &AtomicBool)
        -> DiscoveryResult<()>;
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default, rename = "type")]
    types: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestEntry {
    name: String,
    #[serde(default)]
    kind: TypeKind,
    #[serde(default)]
    container: bool,
}

/// Default indexer reading `*.tessera.toml` manifests
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestIndexer;

impl ManifestIndexer {
    pub fn new() -> Self {
        Self
    }

    fn is_manifest(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(MANIFEST_SUFFIX))
            .unwrap_or(false)
    }

    fn index_manifest(path: &Path, index: &mut TypeIndex) -> DiscoveryResult<()> {
        let content = fs::read_to_string(path).map_err(|e| DiscoveryError::io(path, e))?;
        let manifest: Manifest =
            toml::from_str(&content).map_err(|e| DiscoveryError::invalid_manifest(path, e))?;

        for entry in manifest.types {
            if entry.name.trim().is_empty() {
                return Err(DiscoveryError::invalid_manifest(path, "type name cannot be empty"));
            }
            index.insert(ContainerType {
                id: ContainerId::new(entry.name),
                kind: entry.kind,
                is_container: entry.container,
            });
        }
        Ok(())
    }
}

impl ScopeIndexer for ManifestIndexer {
    fn index(
        &self,
        scopes: &[PathBuf],
        index: &mut TypeIndex,
        cancel: &AtomicBool,
    ) -> DiscoveryResult<()> {
        for scope in scopes {
            // walkdir reports a missing root as an error entry too, but the
            // explicit check keeps the scope path in the message
            fs::metadata(scope).map_err(|e| DiscoveryError::io(scope, e))?;

            for entry in WalkDir::new(scope).follow_links(true).sort_by_file_name() {
                if cancel.load(Ordering::Relaxed) {
                    return Ok(());
                }
                let entry = entry.map_err(|e| {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| scope.clone());
                    DiscoveryError::io(path, e.into())
                })?;

                if entry.file_type().is_file() && Self::is_manifest(entry.path()) {
                    Self::index_manifest(entry.path(), index)?;
                }
            }
        }
        Ok(())
    }
}

/// Run `indexer` on one dedicated worker thread and wait at most `ceiling`.
///
/// On timeout the cancellation flag is raised so a cooperative indexer stops
/// at its next check, and the call returns immediately: the worker is
/// detached and whatever it produces later is dropped. The worker is joined
/// on every other path.
pub fn index_in_background(
    indexer: Arc<dyn ScopeIndexer>,
    scopes: Vec<PathBuf>,
    index: TypeIndex,
    ceiling: Duration,
) -> DiscoveryResult<TypeIndex> {
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();

    let worker = {
        let cancel = Arc::clone(&cancel);
        thread::Builder::new()
            .name("tessera-indexer".to_string())
            .spawn(move || {
                let mut index = index;
                let result = indexer.index(&scopes, &mut index, &cancel).map(|()| index);
                // receiver is gone only after a timeout
                let _ = tx.send(result);
            })
            .map_err(|e| DiscoveryError::WorkerFailed(e.to_string()))?
    };

    let outcome = match rx.recv_timeout(ceiling) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!(?ceiling, "indexing exceeded ceiling, cancelling and detaching worker");
            cancel.store(true, Ordering::Relaxed);
            return Err(DiscoveryError::IndexTimeout { limit: ceiling });
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(DiscoveryError::WorkerFailed(
            "indexing worker exited without a result".to_string(),
        )),
    };

    if worker.join().is_err() {
        tracing::warn!("indexing worker panicked");
    }

    outcome
}
