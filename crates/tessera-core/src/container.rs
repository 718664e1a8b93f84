//! Container capability and the explicit container registry
//!
//! Containers group related test units. Since there is no runtime type
//! scanning, every container type a process can run registers itself with a
//! [`ContainerRegistry`] at startup. Discovery resolves explicit names against
//! the registry, and the execution engine instantiates discovered types
//! through it.

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::name_path::NamePath;
use crate::run_config::RunConfig;
use crate::test_unit::TestUnit;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Fully-qualified, `::`-separated container type name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Fully-qualified name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment (`acme::specs::AlphaSpec` -> `AlphaSpec`)
    pub fn simple_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    /// Everything before the last segment; empty for unqualified names
    pub fn namespace(&self) -> &str {
        match self.0.rfind("::") {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// First path segment, used for namespace denylisting
    pub fn root_namespace(&self) -> &str {
        self.0.split("::").next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ContainerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContainerId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ContainerId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// How a type is exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Constructible type
    #[default]
    Concrete,
    /// Exists only to be specialised; never run directly
    Abstract,
    /// Exposed as a pre-built single instance; never constructed by discovery
    Singleton,
}

/// A type known to discovery
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerType {
    pub id: ContainerId,
    pub kind: TypeKind,
    /// Whether the type satisfies the container capability
    pub is_container: bool,
}

impl ContainerType {
    pub fn concrete(id: impl Into<ContainerId>) -> Self {
        Self {
            id: id.into(),
            kind: TypeKind::Concrete,
            is_container: true,
        }
    }

    pub fn with_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Concrete, constructible container
    pub fn is_runnable(&self) -> bool {
        self.is_container && self.kind == TypeKind::Concrete
    }
}

/// Anything that groups test units
pub trait Container: Send + Sync {
    /// Identity of the container within the run
    fn name_path(&self) -> NamePath;

    /// Units registered by the container, in declaration order
    fn units(&self) -> &[TestUnit];
}

/// Builds a fresh container instance from the project base config
pub type ContainerFactory = Arc<dyn Fn(&RunConfig) -> Box<dyn Container> + Send + Sync>;

#[derive(Clone)]
enum Registration {
    Concrete(ContainerFactory),
    Abstract,
    Singleton(Arc<dyn Container>),
    /// Known type that is not a container
    Plain,
}

impl Registration {
    fn kind(&self) -> TypeKind {
        match self {
            Registration::Concrete(_) | Registration::Plain => TypeKind::Concrete,
            Registration::Abstract => TypeKind::Abstract,
            Registration::Singleton(_) => TypeKind::Singleton,
        }
    }
}

/// Explicit self-registration table for container types
#[derive(Clone, Default)]
pub struct ContainerRegistry {
    entries: BTreeMap<ContainerId, Registration>,
}

impl fmt::Debug for ContainerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(id, reg)| (id, reg.kind())))
            .finish()
    }
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructible container type whose units carry their own
    /// complete configs
    pub fn register_concrete<F, C>(&mut self, id: impl Into<ContainerId>, factory: F) -> &mut Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Container + 'static,
    {
        self.register_configured(id, move |_: &RunConfig| factory())
    }

    /// Register a constructible container type built from the project base
    /// config.
    ///
    /// The factory layers each unit's explicit settings over `base`, usually
    /// with [`RunConfig::merge`], so a unit's own `enabled` or tags always win
    /// over project defaults.
    pub fn register_configured<F, C>(&mut self, id: impl Into<ContainerId>, factory: F) -> &mut Self
    where
        F: Fn(&RunConfig) -> C + Send + Sync + 'static,
        C: Container + 'static,
    {
        let factory: ContainerFactory =
            Arc::new(move |base: &RunConfig| Box::new(factory(base)) as Box<dyn Container>);
        self.entries
            .insert(id.into(), Registration::Concrete(factory));
        self
    }

    /// Register an abstract container type
    pub fn register_abstract(&mut self, id: impl Into<ContainerId>) -> &mut Self {
        self.entries.insert(id.into(), Registration::Abstract);
        self
    }

    /// Register a container exposed as a pre-built single instance
    pub fn register_singleton(
        &mut self,
        id: impl Into<ContainerId>,
        instance: Arc<dyn Container>,
    ) -> &mut Self {
        self.entries
            .insert(id.into(), Registration::Singleton(instance));
        self
    }

    /// Register a type that is resolvable by name but is not a container
    pub fn register_type(&mut self, id: impl Into<ContainerId>) -> &mut Self {
        self.entries.insert(id.into(), Registration::Plain);
        self
    }

    /// Look up a type by fully-qualified name
    pub fn resolve(&self, name: &str) -> Option<ContainerType> {
        let (id, registration) = self.entries.get_key_value(name)?;
        Some(ContainerType {
            id: id.clone(),
            kind: registration.kind(),
            is_container: !matches!(registration, Registration::Plain),
        })
    }

    /// Construct a fresh instance of a concrete container type on the
    /// built-in default config
    pub fn instantiate(&self, container: &ContainerType) -> DiscoveryResult<Box<dyn Container>> {
        self.instantiate_with(container, &RunConfig::default())
    }

    /// Construct a fresh instance of a concrete container type on `base`
    pub fn instantiate_with(
        &self,
        container: &ContainerType,
        base: &RunConfig,
    ) -> DiscoveryResult<Box<dyn Container>> {
        match self.entries.get(&container.id) {
            Some(Registration::Concrete(factory)) => Ok(factory(base)),
            Some(Registration::Abstract) => Err(DiscoveryError::not_instantiable(
                container.id.as_str(),
                "abstract type",
            )),
            Some(Registration::Singleton(_)) => Err(DiscoveryError::not_instantiable(
                container.id.as_str(),
                "singleton instances are never constructed",
            )),
            Some(Registration::Plain) => Err(DiscoveryError::not_instantiable(
                container.id.as_str(),
                "not a container",
            )),
            None => Err(DiscoveryError::container_not_found(container.id.as_str())),
        }
    }

    /// The existing instance of a singleton container
    pub fn singleton(&self, id: &ContainerId) -> Option<Arc<dyn Container>> {
        match self.entries.get(id) {
            Some(Registration::Singleton(instance)) => Some(Arc::clone(instance)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Plain list-of-units container, for hand-assembled suites
#[derive(Clone)]
pub struct UnitList {
    name: NamePath,
    units: Vec<TestUnit>,
}

impl UnitList {
    pub fn new(name: NamePath) -> Self {
        Self {
            name,
            units: Vec::new(),
        }
    }

    pub fn with_unit(mut self, unit: TestUnit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn push(&mut self, unit: TestUnit) {
        self.units.push(unit);
    }
}

impl Container for UnitList {
    fn name_path(&self) -> NamePath {
        self.name.clone()
    }

    fn units(&self) -> &[TestUnit] {
        &self.units
    }
}
