//! Single invocation of a unit: interceptor chain, failure capture, timeout

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tessera_core::{
    InvocationContext, Interceptor, NamePath, RunConfig, TestBody, TestFailure, TestResult,
};

/// Reason recorded when an interceptor does not call `next`
pub const SKIPPED_BY_INTERCEPTOR: &str = "skipped by interceptor";

/// How long a timed-out invocation may take to honour cancellation before its
/// thread is abandoned
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Wrap `body` in `interceptors`, the first one outermost
fn intercept(ctx: &InvocationContext<'_>, interceptors: &[Interceptor], body: &mut dyn FnMut()) {
    match interceptors.split_first() {
        None => body(),
        Some((outer, rest)) => outer(ctx, &mut || intercept(ctx, rest, &mut *body)),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Run one invocation on the current thread. Never panics.
pub fn run_invocation(
    name: &NamePath,
    body: &TestBody,
    config: &RunConfig,
    invocation: u32,
    cancel: &AtomicBool,
) -> TestResult {
    let ctx = InvocationContext {
        name,
        invocation,
        config,
        cancel,
    };
    let mut outcome: Option<Result<(), TestFailure>> = None;

    let caught = panic::catch_unwind(AssertUnwindSafe(|| {
        intercept(&ctx, config.interceptors(), &mut || {
            outcome = Some(body(&ctx));
        });
    }));

    match (caught, outcome) {
        (Err(payload), _) => TestResult::error(TestFailure::Panic {
            message: panic_message(payload),
        }),
        (Ok(()), Some(Ok(()))) => TestResult::success(),
        (Ok(()), Some(Err(failure))) => TestResult::from_failure(failure),
        (Ok(()), None) => TestResult::ignored(Some(SKIPPED_BY_INTERCEPTOR.to_string())),
    }
}

/// Run one invocation on its own thread and cancel it after `limit`.
///
/// On timeout the cancellation flag seen through
/// [`InvocationContext::is_cancelled`] is raised and the caller keeps waiting
/// up to `grace` for the body to return, so the invocation keeps its pool
/// slot. A body that is still running after that is abandoned: its thread is
/// detached and the result is tagged with `abandoned` metadata.
pub fn run_invocation_with_timeout(
    name: &NamePath,
    body: &TestBody,
    config: &Arc<RunConfig>,
    invocation: u32,
    limit: Duration,
    grace: Duration,
) -> TestResult {
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let spawned = {
        let name = name.clone();
        let body = Arc::clone(body);
        let config = Arc::clone(config);
        let cancel = Arc::clone(&cancel);
        thread::Builder::new()
            .name(format!("tessera-invocation-{}", invocation))
            .spawn(move || {
                let _ = tx.send(run_invocation(&name, &body, &config, invocation, &cancel));
            })
    };

    let worker = match spawned {
        Ok(worker) => worker,
        Err(e) => {
            return TestResult::error(TestFailure::error(format!(
                "failed to spawn invocation thread: {}",
                e
            )))
        }
    };

    match rx.recv_timeout(limit) {
        Ok(result) => {
            let _ = worker.join();
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!(test = %name, invocation, ?limit, "invocation timed out, cancelling");
            cancel.store(true, Ordering::Relaxed);
            let result = TestResult::error(TestFailure::Timeout { limit });

            match rx.recv_timeout(grace) {
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        test = %name,
                        invocation,
                        ?grace,
                        "invocation ignored cancellation, abandoning its thread"
                    );
                    result.with_metadata("abandoned", true)
                }
                Ok(_) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                    let _ = worker.join();
                    result
                }
            }
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            let _ = worker.join();
            TestResult::error(TestFailure::error(
                "invocation thread exited without a result",
            ))
        }
    }
}

/// Run invocation `invocation` honouring the configured timeout and record
/// `invocation` and `duration_ms` metadata.
pub fn invoke(
    name: &NamePath,
    body: &TestBody,
    config: &Arc<RunConfig>,
    invocation: u32,
    grace: Duration,
) -> TestResult {
    let start = Instant::now();
    let result = match config.timeout().as_duration() {
        None => run_invocation(name, body, config, invocation, &AtomicBool::new(false)),
        Some(limit) => run_invocation_with_timeout(name, body, config, invocation, limit, grace),
    };
    let elapsed = start.elapsed();

    tracing::debug!(test = %name, invocation, status = ?result.status, ?elapsed, "invocation finished");

    result
        .with_metadata("invocation", invocation)
        .with_metadata("duration_ms", duration_millis(elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tessera_core::TestStatus;

    fn body<F>(f: F) -> TestBody
    where
        F: Fn(&InvocationContext<'_>) -> Result<(), TestFailure> + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    fn name() -> NamePath {
        NamePath::root("Spec").append("case")
    }

    #[test]
    fn test_body_outcomes_are_classified() {
        let config = RunConfig::default();

        let ok = run_invocation(&name(), &body(|_| Ok(())), &config, 0, &AtomicBool::new(false));
        assert_eq!(ok.status, TestStatus::Success);

        let assertion = run_invocation(
            &name(),
            &body(|_| Err(TestFailure::assertion("expected 4"))),
            &config,
            0,
            &AtomicBool::new(false),
        );
        assert_eq!(assertion.status, TestStatus::Failure);

        let error = run_invocation(
            &name(),
            &body(|_| Err(TestFailure::error("io"))),
            &config,
            0,
            &AtomicBool::new(false),
        );
        assert_eq!(error.status, TestStatus::Error);
    }

    #[test]
    fn test_panic_is_captured_as_error() {
        let result = run_invocation(
            &name(),
            &body(|_| panic!("kaboom")),
            &RunConfig::default(),
            0,
            &AtomicBool::new(false),
        );
        assert_eq!(result.status, TestStatus::Error);
        assert_eq!(
            result.failure,
            Some(TestFailure::Panic {
                message: "kaboom".to_string()
            })
        );
    }

    #[test]
    fn test_interceptors_wrap_first_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let tracer = |label: &'static str, log: Arc<Mutex<Vec<String>>>| -> Interceptor {
            Arc::new(move |_: &InvocationContext<'_>, next: &mut dyn FnMut()| {
                log.lock().unwrap().push(format!("{label}:before"));
                next();
                log.lock().unwrap().push(format!("{label}:after"));
            })
        };
        let config = RunConfig::new()
            .with_interceptor(tracer("outer", Arc::clone(&log)))
            .with_interceptor(tracer("inner", Arc::clone(&log)));

        let body_log = Arc::clone(&log);
        let result = run_invocation(
            &name(),
            &body(move |_| {
                body_log.lock().unwrap().push("body".to_string());
                Ok(())
            }),
            &config,
            0,
            &AtomicBool::new(false),
        );

        assert!(result.is_success());
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "outer:before",
                "inner:before",
                "body",
                "inner:after",
                "outer:after"
            ]
        );
    }

    #[test]
    fn test_interceptor_that_skips_next() {
        let config = RunConfig::new()
            .with_interceptor(Arc::new(|_: &InvocationContext<'_>, _: &mut dyn FnMut()| {}));
        let result = run_invocation(&name(), &body(|_| Ok(())), &config, 0, &AtomicBool::new(false));

        assert_eq!(result.status, TestStatus::Ignored);
        assert_eq!(result.reason.as_deref(), Some(SKIPPED_BY_INTERCEPTOR));
    }

    #[test]
    fn test_timeout_reports_error() {
        let config = Arc::new(RunConfig::default());
        let slow = body(|_| {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });

        let result = run_invocation_with_timeout(
            &name(),
            &slow,
            &config,
            0,
            Duration::from_millis(20),
            DEFAULT_CANCEL_GRACE,
        );
        assert_eq!(result.status, TestStatus::Error);
        assert!(!result.metadata.contains_key("abandoned"));
        assert!(result.failure.unwrap().is_timeout());
    }

    #[test]
    fn test_timeout_raises_cancellation() {
        let config = Arc::new(RunConfig::default());
        let saw_cancel = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&saw_cancel);
        let cooperative = body(move |ctx| {
            while !ctx.is_cancelled() {
                thread::sleep(Duration::from_millis(2));
            }
            seen.store(true, Ordering::SeqCst);
            Ok(())
        });

        let start = Instant::now();
        let result = run_invocation_with_timeout(
            &name(),
            &cooperative,
            &config,
            0,
            Duration::from_millis(20),
            Duration::from_secs(10),
        );

        assert!(result.failure.unwrap().is_timeout());
        assert!(saw_cancel.load(Ordering::SeqCst));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_uncooperative_body_is_abandoned_after_grace() {
        let config = Arc::new(RunConfig::default());
        let stubborn = body(|_| {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });

        let result = run_invocation_with_timeout(
            &name(),
            &stubborn,
            &config,
            0,
            Duration::from_millis(10),
            Duration::from_millis(10),
        );

        assert_eq!(result.status, TestStatus::Error);
        assert_eq!(result.metadata.get("abandoned"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn test_duration_millis_saturates() {
        assert_eq!(duration_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_invoke_records_metadata() {
        let config = Arc::new(RunConfig::default());
        let result = invoke(&name(), &body(|_| Ok(())), &config, 3, DEFAULT_CANCEL_GRACE);
        assert_eq!(result.metadata.get("invocation"), Some(&serde_json::json!(3)));
        assert!(result.metadata.contains_key("duration_ms"));
    }
}
