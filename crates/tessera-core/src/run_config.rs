//! Run configuration for a single test unit
//!
//! A [`RunConfig`] is an immutable value. Changes are expressed as a sparse
//! [`RunConfigOverrides`] and applied with [`RunConfig::merge`], which builds a
//! new config where every field takes the supplied value or keeps the previous
//! one.

use crate::error::InvalidRunConfig;
use crate::name_path::NamePath;
use crate::tag::Tag;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Time limit for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeout {
    #[default]
    Unlimited,
    After(Duration),
}

impl Timeout {
    pub fn from_millis(ms: u64) -> Self {
        Self::After(Duration::from_millis(ms))
    }

    /// The limit, or `None` when unlimited
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Unlimited => None,
            Self::After(limit) => Some(*limit),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

/// What an interceptor or test body sees about the invocation it runs in
#[derive(Debug, Clone, Copy)]
pub struct InvocationContext<'a> {
    pub name: &'a NamePath,
    /// Zero-based invocation index
    pub invocation: u32,
    pub config: &'a RunConfig,
    /// Raised by the engine once the invocation has timed out
    pub cancel: &'a AtomicBool,
}

impl InvocationContext<'_> {
    /// True once the invocation has timed out; long-running bodies and
    /// interceptors should poll this and return early
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Side-effect wrapper around a test body.
///
/// Receives the invocation context and a `next` capability that runs the rest
/// of the chain. Not calling `next` skips the body.
pub type Interceptor = Arc<dyn Fn(&InvocationContext<'_>, &mut dyn FnMut()) + Send + Sync>;

/// Immutable configuration for one test unit
#[derive(Clone)]
pub struct RunConfig {
    enabled: bool,
    invocations: u32,
    timeout: Timeout,
    threads: u32,
    tags: BTreeSet<Tag>,
    interceptors: Vec<Interceptor>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            invocations: 1,
            timeout: Timeout::Unlimited,
            threads: 1,
            tags: BTreeSet::new(),
            interceptors: Vec::new(),
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("enabled", &self.enabled)
            .field("invocations", &self.invocations)
            .field("timeout", &self.timeout)
            .field("threads", &self.threads)
            .field("tags", &self.tags)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_invocations(mut self, invocations: u32) -> Self {
        self.invocations = invocations;
        self
    }

    pub fn with_timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Fold a single tag into the tag set
    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_interceptor(mut self, interceptor: Interceptor) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn invocations(&self) -> u32 {
        self.invocations
    }

    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    pub fn tags(&self) -> &BTreeSet<Tag> {
        &self.tags
    }

    pub fn interceptors(&self) -> &[Interceptor] {
        &self.interceptors
    }

    /// Build a new config from this one with the supplied overrides applied.
    ///
    /// Tags and interceptors are replaced wholesale when supplied.
    pub fn merge(&self, overrides: &RunConfigOverrides) -> RunConfig {
        RunConfig {
            enabled: overrides.enabled.unwrap_or(self.enabled),
            invocations: overrides.invocations.unwrap_or(self.invocations),
            timeout: overrides.timeout.unwrap_or(self.timeout),
            threads: overrides.threads.unwrap_or(self.threads),
            tags: overrides
                .tags
                .clone()
                .unwrap_or_else(|| self.tags.clone()),
            interceptors: overrides
                .interceptors
                .clone()
                .unwrap_or_else(|| self.interceptors.clone()),
        }
    }

    /// Caller-side sanity check. `merge` never validates.
    pub fn validate(&self) -> Result<(), InvalidRunConfig> {
        if self.invocations == 0 {
            return Err(InvalidRunConfig::ZeroInvocations);
        }
        if self.threads == 0 {
            return Err(InvalidRunConfig::ZeroThreads);
        }
        if self.timeout == Timeout::After(Duration::ZERO) {
            return Err(InvalidRunConfig::ZeroTimeout);
        }
        Ok(())
    }
}

/// Sparse set of config changes; `None` keeps the current value
#[derive(Clone, Default)]
pub struct RunConfigOverrides {
    pub enabled: Option<bool>,
    pub invocations: Option<u32>,
    pub timeout: Option<Timeout>,
    pub threads: Option<u32>,
    pub tags: Option<BTreeSet<Tag>>,
    pub interceptors: Option<Vec<Interceptor>>,
}

impl fmt::Debug for RunConfigOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfigOverrides")
            .field("enabled", &self.enabled)
            .field("invocations", &self.invocations)
            .field("timeout", &self.timeout)
            .field("threads", &self.threads)
            .field("tags", &self.tags)
            .field("interceptors", &self.interceptors.as_ref().map(Vec::len))
            .finish()
    }
}

impl RunConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn invocations(mut self, invocations: u32) -> Self {
        self.invocations = Some(invocations);
        self
    }

    pub fn timeout(mut self, timeout: Timeout) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn threads(mut self, threads: u32) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = Some(tags.into_iter().collect());
        self
    }

    pub fn interceptors(mut self, interceptors: Vec<Interceptor>) -> Self {
        self.interceptors = Some(interceptors);
        self
    }

    /// True if applying these overrides would change nothing
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.invocations.is_none()
            && self.timeout.is_none()
            && self.threads.is_none()
            && self.tags.is_none()
            && self.interceptors.is_none()
    }

    /// Combine two override sets; values in `later` win per field
    pub fn and_then(&self, later: &RunConfigOverrides) -> RunConfigOverrides {
        RunConfigOverrides {
            enabled: later.enabled.or(self.enabled),
            invocations: later.invocations.or(self.invocations),
            timeout: later.timeout.or(self.timeout),
            threads: later.threads.or(self.threads),
            tags: later.tags.clone().or_else(|| self.tags.clone()),
            interceptors: later
                .interceptors
                .clone()
                .or_else(|| self.interceptors.clone()),
        }
    }
}
