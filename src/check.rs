//! Per-target check pipeline and concurrent fan-out
//!
//! Each attempt runs `decrypt -> trust policy -> create -> connect -> probe ->
//! verify`, stopping at the first failure. Release always runs once a backend
//! exists, under its own grace period so cleanup survives the attempt deadline.

use crate::{
    backends::{Backend, BackendFactory, Registry},
    outcome::{Outcome, Report, Status, millis},
    target::{Kind, Target},
    tls::{self, TrustError, TrustProfile, TrustRequest},
    vault::{self, Secret, VaultKey},
};
use futures::FutureExt;
use std::{
    any::Any,
    collections::BTreeMap,
    fmt::{self, Display},
    future::Future,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{Semaphore, mpsc},
    time::{Instant, timeout, timeout_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const RELEASE_GRACE: Duration = Duration::from_secs(5);

// about 30 years
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Deadline for each target, measured from when its attempt starts
    pub timeout: Duration,
    /// Maximum checks in flight, 0 for unbounded
    pub concurrency: usize,
    pub cancel: CancellationToken,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            concurrency: 0,
            cancel: CancellationToken::new(),
        }
    }
}

/// Why a guarded step did not produce a value
#[derive(Debug)]
enum StepError<E> {
    Failed(E),
    TimedOut,
    Cancelled,
    Panicked(String),
}

impl<E: Display> Display for StepError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(err) => err.fmt(f),
            Self::TimedOut => f.write_str("timed out"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Panicked(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

/// Deadline `timeout` from now, saturating far in the future
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + FAR_FUTURE)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run one step bounded by the deadline and the cancellation token
async fn guarded<T, E, F>(
    fut: F,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<T, StepError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    let fut = AssertUnwindSafe(fut).catch_unwind();

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(StepError::Cancelled),
        result = timeout_at(deadline, fut) => match result {
            Err(_) => Err(StepError::TimedOut),
            Ok(Err(panic)) => Err(StepError::Panicked(panic_message(panic.as_ref()))),
            Ok(Ok(result)) => result.map_err(StepError::Failed),
        },
    }
}

/// Connect, probe and verify; returns whether a health query ran
async fn drive(
    backend: &mut dyn Backend,
    target: &Target,
    secret: &Secret,
    policy: &tls::TrustPolicy,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<bool, (Status, String)> {
    guarded(backend.connect(target, secret, policy), deadline, cancel)
        .await
        .map_err(|e| (Status::ConnectFailed, format!("connect: {e}")))?;
    debug!(target = %target.id, step = "connect", "connected");

    guarded(backend.probe(), deadline, cancel)
        .await
        .map_err(|e| (Status::ProbeFailed, format!("probe: {e}")))?;
    debug!(target = %target.id, step = "probe", "probe ok");

    let Some(query) = target.health_query() else {
        debug!(target = %target.id, step = "verify", "no health query, skipping");
        return Ok(false);
    };

    guarded(backend.verify(query), deadline, cancel)
        .await
        .map_err(|e| (Status::HealthCheckFailed, format!("health query: {e}")))?;

    Ok(true)
}

async fn release(backend: &mut dyn Backend, target: &Target) -> Option<String> {
    let result = timeout(RELEASE_GRACE, AssertUnwindSafe(backend.release()).catch_unwind()).await;

    let error = match result {
        Ok(Ok(Ok(()))) => return None,
        Ok(Ok(Err(err))) => err.to_string(),
        Ok(Err(panic)) => format!("release panicked: {}", panic_message(panic.as_ref())),
        Err(_) => format!("release timed out after {}s", RELEASE_GRACE.as_secs()),
    };

    warn!(target = %target.id, kind = %target.kind, step = "release", error = %error, "release failed");
    Some(error)
}

/// One complete attempt against a target, never fails
async fn attempt(
    target: &Target,
    key: &VaultKey,
    factory: &dyn BackendFactory,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Outcome {
    let started = Instant::now();
    let fail = |status: Status, cause: String| {
        warn!(target = %target.id, kind = %target.kind, status = %status, cause = %cause, "check failed");
        Outcome::failure(&target.id, &target.kind, status, cause, started.elapsed())
    };

    let secret = match vault::decrypt_secret(&target.encrypted_secret, key) {
        Ok(secret) => secret,
        Err(err) => return fail(Status::DecryptionFailed, format!("decrypt password: {err}")),
    };

    let profile = target
        .kind
        .parse::<Kind>()
        .map_or(TrustProfile::GENERIC, TrustProfile::for_kind);

    let policy = match guarded(
        tls::build(&TrustRequest::from_target(target), profile),
        deadline,
        cancel,
    )
    .await
    {
        Ok(policy) => policy,
        Err(StepError::Failed(err @ TrustError::UnsupportedMode(_))) => {
            return fail(Status::UnsupportedTrustMode, err.to_string());
        }
        Err(err) => return fail(Status::InvalidTrustMaterial, format!("trust policy: {err}")),
    };

    let mut backend = match factory.create(&target.kind) {
        Ok(backend) => backend,
        Err(err) => return fail(Status::UnsupportedKind, err.to_string()),
    };

    let result = drive(backend.as_mut(), target, &secret, &policy, deadline, cancel).await;
    let release_error = release(backend.as_mut(), target).await;
    drop(secret);

    let mut outcome = match result {
        Ok(verified) => {
            info!(
                target = %target.id,
                kind = %target.kind,
                verified,
                elapsed_ms = millis(started.elapsed()),
                "check succeeded"
            );
            Outcome::success(&target.id, &target.kind, verified, started.elapsed())
        }
        Err((status, cause)) => fail(status, cause),
    };
    outcome.release_error = release_error;

    outcome
}

/// Check a single target with the built-in backends
pub async fn run_one(target: &Target, key: &VaultKey, options: &CheckOptions) -> Outcome {
    run_one_with(&Registry, target, key, options).await
}

/// Check a single target, the attempt runs on the calling task
pub async fn run_one_with(
    factory: &dyn BackendFactory,
    target: &Target,
    key: &VaultKey,
    options: &CheckOptions,
) -> Outcome {
    attempt(target, key, factory, deadline_after(options.timeout), &options.cancel).await
}

/// Check every target concurrently with the built-in backends
pub async fn run_all(targets: Vec<Target>, key: Arc<VaultKey>, options: &CheckOptions) -> Report {
    run_all_with(Arc::new(Registry), targets, key, options).await
}

/// Check every target concurrently
///
/// One task per target; outcomes flow over a channel to this task, which owns
/// the report. A task that ends without reporting is recorded as aborted.
pub async fn run_all_with(
    factory: Arc<dyn BackendFactory>,
    targets: Vec<Target>,
    key: Arc<VaultKey>,
    options: &CheckOptions,
) -> Report {
    let started = Instant::now();
    let mut report = Report::new();

    let semaphore = (options.concurrency > 0).then(|| Arc::new(Semaphore::new(options.concurrency)));
    let (tx, mut rx) = mpsc::channel::<Outcome>(targets.len().max(1));
    let mut expected = BTreeMap::new();

    for target in targets {
        expected.insert(target.id.clone(), target.kind.clone());

        let tx = tx.clone();
        let key = Arc::clone(&key);
        let factory = Arc::clone(&factory);
        let semaphore = semaphore.clone();
        let cancel = options.cancel.clone();
        let attempt_timeout = options.timeout;

        tokio::spawn(async move {
            let _permit = match semaphore {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };

            // waiting for a permit does not count against the attempt
            let deadline = deadline_after(attempt_timeout);
            let outcome = attempt(&target, &key, factory.as_ref(), deadline, &cancel).await;
            if tx.send(outcome).await.is_err() {
                debug!(target = %target.id, "report collector is gone");
            }
        });
    }
    drop(tx);

    while let Some(outcome) = rx.recv().await {
        report.insert(outcome);
    }

    for (id, kind) in expected {
        if !report.contains(&id) {
            warn!(target = %id, kind = %kind, "check ended without an outcome");
            report.insert(Outcome::failure(
                &id,
                &kind,
                Status::Aborted,
                "check task ended without reporting an outcome",
                started.elapsed(),
            ));
        }
    }

    report.finish(started.elapsed());
    report
}
