//! A single runnable test bound to its container and configuration

use crate::container::ContainerId;
use crate::name_path::NamePath;
use crate::outcome::TestFailure;
use crate::run_config::{InvocationContext, RunConfig, RunConfigOverrides};
use crate::tag::TagFilter;
use std::fmt;
use std::sync::Arc;

/// The callable test itself
pub type TestBody = Arc<dyn Fn(&InvocationContext<'_>) -> Result<(), TestFailure> + Send + Sync>;

/// Why an inactive unit is skipped
pub const DISABLED_REASON: &str = "disabled via config";
pub const TAG_EXCLUDED_REASON: &str = "excluded by tag filter";

/// A runnable test
///
/// The config is held behind an `Arc` and replaced, never mutated, by
/// [`TestUnit::reconfigure`]; readers holding the previous `Arc` keep a
/// consistent snapshot.
#[derive(Clone)]
pub struct TestUnit {
    // names of all enclosing scopes plus this one
    name: NamePath,
    // owning container, for reporting only
    container: ContainerId,
    body: TestBody,
    // first line of the test in its source file
    line: u32,
    config: Arc<RunConfig>,
}

impl fmt::Debug for TestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestUnit")
            .field("name", &self.name)
            .field("container", &self.container)
            .field("line", &self.line)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TestUnit {
    /// Create a unit with the default run configuration
    pub fn new<F>(name: NamePath, container: impl Into<ContainerId>, line: u32, body: F) -> Self
    where
        F: Fn(&InvocationContext<'_>) -> Result<(), TestFailure> + Send + Sync + 'static,
    {
        Self {
            name,
            container: container.into(),
            body: Arc::new(body),
            line,
            config: Arc::new(RunConfig::default()),
        }
    }

    /// Set the initial configuration at construction time
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn name(&self) -> &NamePath {
        &self.name
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn body(&self) -> &TestBody {
        &self.body
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> Arc<RunConfig> {
        Arc::clone(&self.config)
    }

    /// Replace the configuration with `config.merge(overrides)`.
    /// This is the only way a unit changes after construction.
    pub fn reconfigure(&mut self, overrides: &RunConfigOverrides) {
        self.config = Arc::new(self.config.merge(overrides));
    }

    /// True iff the unit is enabled and the tag filter admits its tags
    pub fn activate(&self, filter: &dyn TagFilter) -> bool {
        self.inactive_reason(filter).is_none()
    }

    /// Why the unit would be skipped, or `None` if it is active
    pub fn inactive_reason(&self, filter: &dyn TagFilter) -> Option<&'static str> {
        if !self.config.enabled() {
            return Some(DISABLED_REASON);
        }
        if !filter.is_active(self.config.tags()) {
            return Some(TAG_EXCLUDED_REASON);
        }
        None
    }
}
