//! Test runner - execute discovered containers

use crate::invocation::{self, DEFAULT_CANCEL_GRACE};
use crate::report::{ContainerReport, UnitReport};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::{
    Container, ContainerType, DiscoveredContainers, FrameworkContext, RunConfig, TestFailure,
    TestResult, TestUnit,
};

/// Runs units against the context's registry and tag filter.
///
/// Discovered containers are instantiated on the context's base config, so
/// project defaults reach units through their container factories and never
/// override a unit's own settings.
pub struct Runner<'a> {
    context: &'a FrameworkContext,
    /// Whether units of a container run in parallel
    parallel: bool,
    /// Wait for a timed-out invocation to honour cancellation
    cancel_grace: Duration,
}

impl<'a> Runner<'a> {
    pub fn new(context: &'a FrameworkContext) -> Self {
        Self {
            context,
            parallel: false,
            cancel_grace: DEFAULT_CANCEL_GRACE,
        }
    }

    /// Set whether units of one container run in parallel
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// How long a timed-out invocation keeps its pool slot while it winds
    /// down; past that its thread is abandoned
    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    /// Run every discovered container in order.
    ///
    /// A container that cannot be instantiated gets a single Error result;
    /// the remaining containers still run.
    pub fn run_discovered(&self, discovered: &DiscoveredContainers) -> Vec<ContainerReport> {
        discovered
            .containers()
            .iter()
            .map(|container_type| self.run_container_type(container_type))
            .collect()
    }

    fn run_container_type(&self, container_type: &ContainerType) -> ContainerReport {
        let _span = tracing::info_span!("container", id = %container_type.id).entered();

        match self.context.instantiate(container_type) {
            Ok(container) => ContainerReport {
                container: container_type.id.clone(),
                setup: None,
                units: self.run_container(container.as_ref()),
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to instantiate container");
                ContainerReport {
                    container: container_type.id.clone(),
                    setup: Some(TestResult::error(TestFailure::error(e))),
                    units: Vec::new(),
                }
            }
        }
    }

    /// Run every unit of `container` in declaration order
    pub fn run_container(&self, container: &dyn Container) -> Vec<UnitReport> {
        let units = container.units();
        tracing::debug!(container = %container.name_path(), units = units.len(), "running container");

        if self.parallel {
            units.par_iter().map(|unit| self.run_unit(unit)).collect()
        } else {
            units.iter().map(|unit| self.run_unit(unit)).collect()
        }
    }

    /// Run one unit: a single Ignored result if inactive, otherwise one
    /// result per invocation
    pub fn run_unit(&self, unit: &TestUnit) -> UnitReport {
        let results = match unit.inactive_reason(self.context.tag_filter()) {
            Some(reason) => {
                tracing::debug!(test = %unit.name(), reason, "skipping unit");
                vec![TestResult::ignored(Some(reason.to_string()))]
            }
            None => self.run_invocations(unit),
        };

        UnitReport {
            name: unit.name().clone(),
            container: unit.container().clone(),
            results,
        }
    }

    fn run_invocations(&self, unit: &TestUnit) -> Vec<TestResult> {
        let config: Arc<RunConfig> = unit.config();
        if let Err(e) = config.validate() {
            return vec![TestResult::error(TestFailure::error(e))];
        }

        let invocations = config.invocations();
        let threads = config.threads().min(invocations);
        let invoke =
            |i: u32| invocation::invoke(unit.name(), unit.body(), &config, i, self.cancel_grace);

        if threads <= 1 {
            return (0..invocations).map(invoke).collect();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .thread_name(|i| format!("tessera-worker-{}", i))
            .build();

        match pool {
            Ok(pool) => pool.install(|| (0..invocations).into_par_iter().map(invoke).collect()),
            Err(e) => vec![TestResult::error(TestFailure::error(format!(
                "failed to build invocation pool: {}",
                e
            )))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{NamePath, TestStatus};

    fn unit(config: RunConfig) -> TestUnit {
        TestUnit::new(NamePath::root("Spec").append("case"), "acme::Spec", 1, |_| Ok(()))
            .with_config(config)
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let context = FrameworkContext::new();
        let report = Runner::new(&context).run_unit(&unit(RunConfig::new().with_invocations(0)));

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.status(), TestStatus::Error);
    }

    #[test]
    fn test_reconfigured_unit_runs_with_new_config() {
        let context = FrameworkContext::new();
        let mut unit = unit(RunConfig::default());
        unit.reconfigure(&tessera_core::RunConfigOverrides::new().invocations(2));

        let report = Runner::new(&context).run_unit(&unit);

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.status(), TestStatus::Success);
    }
}
