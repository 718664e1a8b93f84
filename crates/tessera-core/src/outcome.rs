//! Outcome model - classified result of one invocation of a test unit

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Status of a single invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// The test was skipped completely
    Ignored,
    /// The test ran and passed
    Success,
    /// Something other than an assertion broke while running the test
    Error,
    /// The test ran but an assertion failed
    Failure,
}

impl TestStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Success)
    }

    /// Error or Failure
    pub fn is_failure_like(&self) -> bool {
        matches!(self, TestStatus::Error | TestStatus::Failure)
    }
}

/// A failure captured at the unit boundary.
///
/// Only [`TestFailure::Assertion`] classifies as [`TestStatus::Failure`];
/// every other kind is an [`TestStatus::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TestFailure {
    #[error("assertion failed: {message}")]
    Assertion {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        actual: Option<String>,
    },

    #[error("{message}")]
    Error { message: String },

    #[error("test panicked: {message}")]
    Panic { message: String },

    #[error("test timed out after {limit:?}")]
    Timeout { limit: Duration },
}

impl TestFailure {
    /// Create an assertion failure
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Create an assertion failure comparing two rendered values
    pub fn mismatch(
        message: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::Assertion {
            message: message.into(),
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
        }
    }

    /// Create a non-assertion error
    pub fn error(message: impl ToString) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result of running one invocation of a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub status: TestStatus,
    /// Present iff status is Error or Failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<TestFailure>,
    /// Mainly meaningful for Ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Engine-produced values; not interpreted by the core
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TestResult {
    pub fn success() -> Self {
        Self {
            status: TestStatus::Success,
            failure: None,
            reason: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn ignored(reason: Option<String>) -> Self {
        Self {
            status: TestStatus::Ignored,
            failure: None,
            reason,
            metadata: BTreeMap::new(),
        }
    }

    /// Unexpected failure raised by the test body or its harness
    pub fn error(failure: TestFailure) -> Self {
        Self {
            status: TestStatus::Error,
            failure: Some(failure),
            reason: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Failure produced by an assertion mechanism
    pub fn failure(failure: TestFailure) -> Self {
        Self {
            status: TestStatus::Failure,
            failure: Some(failure),
            reason: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Classify a captured failure by its kind
    pub fn from_failure(failure: TestFailure) -> Self {
        if failure.is_assertion() {
            Self::failure(failure)
        } else {
            Self::error(failure)
        }
    }

    /// Attach an engine-produced metadata value
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
