//! Step descriptors and the runner that applies their timeout and retry
//! policy.
//!
//! Idempotent steps (lookups, downloads) retry with exponential backoff.
//! Mutating steps run at most twice so a retry cannot silently duplicate
//! inserts beyond what the step itself cleans up.

use std::{future::Future, time::Duration};

use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
  Error, Result,
  config::StepPolicy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
  Idempotent,
  Mutating,
}

const MAX_MUTATING_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
  pub name:         &'static str,
  pub timeout:      Duration,
  pub max_attempts: u32,
  pub kind:         StepKind,
  /// Delay before the first retry.
  pub backoff:      Duration,
}

impl StepDescriptor {
  pub fn new(name: &'static str, kind: StepKind, policy: StepPolicy) -> Self {
    let attempts = match kind {
      StepKind::Idempotent => policy.attempts.max(1),
      StepKind::Mutating => policy.attempts.clamp(1, MAX_MUTATING_ATTEMPTS),
    };
    Self {
      name,
      timeout: policy.timeout(),
      max_attempts: attempts,
      kind,
      backoff: Duration::from_secs(1),
    }
  }

  pub fn idempotent(name: &'static str, policy: StepPolicy) -> Self {
    Self::new(name, StepKind::Idempotent, policy)
  }

  pub fn mutating(name: &'static str, policy: StepPolicy) -> Self {
    Self::new(name, StepKind::Mutating, policy)
  }

  pub fn with_backoff(mut self, backoff: Duration) -> Self {
    self.backoff = backoff;
    self
  }

  fn delay_before(&self, attempt: u32) -> Duration {
    self.backoff.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
  }
}

/// Resolves once the flag is raised. A dropped sender never cancels.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
  if rx.wait_for(|c| *c).await.is_err() {
    std::future::pending::<()>().await;
  }
}

/// Run `op` under `step`'s policy. Cancellation is checked before each
/// attempt and raced against the attempt in flight.
pub async fn run_step<T, F, Fut>(
  step: &StepDescriptor,
  cancel: &mut watch::Receiver<bool>,
  mut op: F,
) -> Result<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let mut attempt = 0;
  loop {
    attempt += 1;

    let outcome = tokio::select! {
      biased;
      _ = cancelled(cancel) => return Err(Error::Cancelled),
      outcome = tokio::time::timeout(step.timeout, op()) => outcome,
    };

    let err = match outcome {
      Ok(Ok(value)) => {
        info!(step = step.name, attempt, "step succeeded");
        return Ok(value);
      }
      Ok(Err(Error::Cancelled)) => return Err(Error::Cancelled),
      Ok(Err(e)) => e,
      Err(_) => Error::StepTimedOut { step: step.name, after: step.timeout },
    };

    if attempt >= step.max_attempts || !err.is_transient() {
      return Err(Error::StepFailed {
        step:     step.name,
        attempts: attempt,
        source:   Box::new(err),
      });
    }

    let delay = step.delay_before(attempt);
    warn!(step = step.name, attempt, error = %err, ?delay, "step failed, retrying");
    tokio::select! {
      biased;
      _ = cancelled(cancel) => return Err(Error::Cancelled),
      _ = tokio::time::sleep(delay) => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
  };

  use super::*;

  fn policy(attempts: u32) -> StepPolicy { StepPolicy::new(5, attempts) }

  fn idle() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    std::mem::forget(tx);
    rx
  }

  fn transient() -> Error { Error::ReleaseInfo("unavailable".into()) }

  #[test]
  fn mutating_steps_are_capped() {
    assert_eq!(StepDescriptor::mutating("load", policy(9)).max_attempts, 2);
    assert_eq!(StepDescriptor::mutating("load", policy(0)).max_attempts, 1);
    assert_eq!(StepDescriptor::idempotent("fetch", policy(9)).max_attempts, 9);
  }

  #[test]
  fn backoff_doubles() {
    let step = StepDescriptor::idempotent("fetch", policy(4)).with_backoff(Duration::from_secs(2));
    assert_eq!(step.delay_before(1), Duration::from_secs(2));
    assert_eq!(step.delay_before(3), Duration::from_secs(8));
  }

  #[tokio::test]
  async fn idempotent_step_retries_until_success() {
    let step =
      StepDescriptor::idempotent("fetch", policy(3)).with_backoff(Duration::from_millis(1));
    let calls = Arc::new(AtomicU32::new(0));

    let value = run_step(&step, &mut idle(), || {
      let calls = calls.clone();
      async move {
        if calls.fetch_add(1, Ordering::SeqCst) < 2 { Err(transient()) } else { Ok(42) }
      }
    })
    .await
    .unwrap();

    assert_eq!(value, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn exhausted_retries_report_attempts() {
    let step =
      StepDescriptor::mutating("orthologs", policy(5)).with_backoff(Duration::from_millis(1));
    let calls = AtomicU32::new(0);

    let err = run_step(&step, &mut idle(), || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err::<(), _>(transient()) }
    })
    .await
    .unwrap_err();

    assert!(matches!(err, Error::StepFailed { step: "orthologs", attempts: 2, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn data_errors_are_not_retried() {
    let step = StepDescriptor::idempotent("genes", policy(5));
    let calls = AtomicU32::new(0);

    let err = run_step(&step, &mut idle(), || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err::<(), _>(Error::UnknownTaxon(9606)) }
    })
    .await
    .unwrap_err();

    assert!(matches!(err.root(), Error::UnknownTaxon(9606)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn slow_step_times_out() {
    let step = StepDescriptor {
      name:         "download",
      timeout:      Duration::from_millis(10),
      max_attempts: 1,
      kind:         StepKind::Idempotent,
      backoff:      Duration::from_millis(1),
    };
    let err = run_step(&step, &mut idle(), || async {
      tokio::time::sleep(Duration::from_secs(5)).await;
      Ok(())
    })
    .await
    .unwrap_err();
    assert!(matches!(err.root(), Error::StepTimedOut { step: "download", .. }));
  }

  #[tokio::test]
  async fn raised_flag_cancels_before_running() {
    let (tx, mut rx) = watch::channel(false);
    tx.send(true).unwrap();
    let step = StepDescriptor::idempotent("check", policy(3));
    let err = run_step(&step, &mut rx, || async { Ok(()) }).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
  }

  #[tokio::test]
  async fn raised_flag_interrupts_running_step() {
    let (tx, mut rx) = watch::channel(false);
    let step = StepDescriptor::idempotent("fetch", policy(1));
    let canceller = tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(10)).await;
      tx.send(true).unwrap();
    });
    let err = run_step(&step, &mut rx, || async {
      tokio::time::sleep(Duration::from_secs(2)).await;
      Ok(())
    })
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    canceller.await.unwrap();
  }
}
