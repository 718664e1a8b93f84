//! Reference execution engine for Tessera
//!
//! Runs discovered containers honouring each unit's [`tessera_core::RunConfig`]:
//! activation, repeated invocations on a bounded pool, per-invocation
//! timeouts and interceptors.
//!
//! ```no_run
//! use tessera_core::{Discovery, DiscoveryRequest, FrameworkContext};
//! use tessera_runner::{RunSummary, Runner};
//!
//! let context = FrameworkContext::new();
//! let discovered = Discovery::new(&context)
//!     .discover(&DiscoveryRequest::from_scopes(["target/tessera"]))
//!     .unwrap();
//! let reports = Runner::new(&context).run_discovered(&discovered);
//! assert!(RunSummary::from_reports(&reports).is_success());
//! ```

pub mod invocation;
pub mod report;
pub mod runner;

pub use invocation::{DEFAULT_CANCEL_GRACE, SKIPPED_BY_INTERCEPTOR};
pub use report::{ContainerReport, RunSummary, UnitReport};
pub use runner::Runner;
