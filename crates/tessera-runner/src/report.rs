//! Reports produced by a run

use serde_json::json;
use tessera_core::{ContainerId, NamePath, TestResult, TestStatus};

/// Every invocation result of one unit, in invocation order
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub name: NamePath,
    pub container: ContainerId,
    pub results: Vec<TestResult>,
}

impl UnitReport {
    /// First Error or Failure in invocation order; Ignored only when every
    /// invocation was ignored
    pub fn status(&self) -> TestStatus {
        if let Some(result) = self.results.iter().find(|r| r.status.is_failure_like()) {
            return result.status;
        }
        if self.results.iter().any(|r| r.status.is_success()) {
            TestStatus::Success
        } else {
            TestStatus::Ignored
        }
    }

    /// Results that did not succeed or get ignored
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| r.status.is_failure_like())
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "name": self.name.to_string(),
            "container": self.container.as_str(),
            "status": self.status(),
            "results": self.results,
        })
    }
}

/// Outcome of running one discovered container
#[derive(Debug, Clone)]
pub struct ContainerReport {
    pub container: ContainerId,
    /// Set when the container could not be instantiated
    pub setup: Option<TestResult>,
    pub units: Vec<UnitReport>,
}

impl ContainerReport {
    pub fn status(&self) -> TestStatus {
        if let Some(setup) = &self.setup {
            return setup.status;
        }
        let statuses: Vec<TestStatus> = self.units.iter().map(UnitReport::status).collect();
        if let Some(status) = statuses.iter().find(|s| s.is_failure_like()) {
            *status
        } else if statuses.iter().any(TestStatus::is_success) {
            TestStatus::Success
        } else {
            TestStatus::Ignored
        }
    }
}

/// Unit counts by aggregated status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub success: usize,
    pub failure: usize,
    pub error: usize,
    pub ignored: usize,
}

impl RunSummary {
    /// Count units; a container that failed to instantiate counts as one error
    pub fn from_reports(reports: &[ContainerReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            if let Some(setup) = &report.setup {
                summary.record(setup.status);
            }
            for unit in &report.units {
                summary.record(unit.status());
            }
        }
        summary
    }

    fn record(&mut self, status: TestStatus) {
        match status {
            TestStatus::Success => self.success += 1,
            TestStatus::Failure => self.failure += 1,
            TestStatus::Error => self.error += 1,
            TestStatus::Ignored => self.ignored += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failure + self.error + self.ignored
    }

    pub fn is_success(&self) -> bool {
        self.failure == 0 && self.error == 0
    }
}
