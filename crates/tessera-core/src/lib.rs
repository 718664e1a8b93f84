//! Tessera core
//!
//! The discovery-and-configuration core of the Tessera test framework:
//! - Hierarchical test identities ([`NamePath`])
//! - Per-unit run configuration with override merging ([`RunConfig`])
//! - Test units and their activation gating ([`TestUnit`])
//! - Outcome classification ([`TestStatus`], [`TestResult`])
//! - Container discovery from build-time manifests or explicit names ([`Discovery`])
//!
//! # Example
//!
//! ```no_run
//! use tessera_core::{Discovery, DiscoveryRequest, FrameworkContext};
//!
//! let context = FrameworkContext::new();
//! let request = DiscoveryRequest::from_scopes(["target/tessera"]);
//! let discovered = Discovery::new(&context).discover(&request).unwrap();
//! for name in discovered.names() {
//!     println!("{}", name);
//! }
//! ```

pub mod container;
pub mod context;
pub mod discovery;
pub mod error;
pub mod name_path;
pub mod outcome;
pub mod run_config;
pub mod tag;
pub mod test_unit;

// Re-export main types
pub use container::{
    Container, ContainerFactory, ContainerId, ContainerRegistry, ContainerType, TypeKind, UnitList,
};
pub use context::FrameworkContext;
pub use discovery::{
    Discovery, DiscoveryExtension, DiscoveredContainers, DiscoveryOptions, DiscoveryRequest,
    ManifestIndexer, ScopeIndexer, TypeIndex,
};
pub use error::{DiscoveryError, DiscoveryResult, InvalidRunConfig};
pub use name_path::NamePath;
pub use outcome::{TestFailure, TestResult, TestStatus};
pub use run_config::{InvocationContext, Interceptor, RunConfig, RunConfigOverrides, Timeout};
pub use tag::{Tag, TagFilter, TagSelection};
pub use test_unit::{TestBody, TestUnit};
