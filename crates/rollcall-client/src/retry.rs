//! Bounded retries with exponential backoff.
//!
//! Two profiles are used in practice: [`RetryPolicy::requests`] for every
//! remote call (short, uncapped, deterministic) and [`RetryPolicy::delivery`]
//! for report delivery (capped, jittered so parallel runs don't thunder).

use std::{future::Future, time::Duration};

use rand::RngExt;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub base_delay:   Duration,
  pub max_delay:    Option<Duration>,
  pub jitter:       bool,
}

impl RetryPolicy {
  /// Profile for ordinary API requests: 3 attempts, 1s doubling backoff.
  pub fn requests() -> Self {
    Self {
      max_attempts: 3,
      base_delay:   Duration::from_secs(1),
      max_delay:    None,
      jitter:       false,
    }
  }

  /// Profile for report delivery: 3 attempts, 1s doubling backoff capped at
  /// 60s, each delay scaled by a random factor in `[0.9, 1.1]`.
  pub fn delivery() -> Self {
    Self {
      max_attempts: 3,
      base_delay:   Duration::from_secs(1),
      max_delay:    Some(Duration::from_secs(60)),
      jitter:       true,
    }
  }

  fn delay_for(&self, attempt: u32) -> Duration {
    let exponent = (attempt - 1).min(16);
    let mut delay = self.base_delay.saturating_mul(1u32 << exponent);
    if let Some(cap) = self.max_delay {
      delay = delay.min(cap);
    }
    if self.jitter {
      let factor: f64 = rand::rng().random_range(0.9..=1.1);
      delay = delay.mul_f64(factor);
    }
    delay
  }

  /// Run `op`, retrying every error up to `max_attempts` total attempts.
  pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, E>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
  {
    self.run_if(op, |_| true).await
  }

  /// Run `op`, retrying only errors for which `retryable` holds. The last
  /// error is returned once attempts are exhausted.
  pub async fn run_if<T, E, F, Fut, P>(&self, mut op: F, retryable: P) -> Result<T, E>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
  {
    let mut attempt = 1;
    loop {
      match op().await {
        Ok(value) => return Ok(value),
        Err(error) if attempt < self.max_attempts && retryable(&error) => {
          let delay = self.delay_for(attempt);
          tracing::warn!(
            "attempt {attempt}/{} failed: {error}; retrying in {delay:?}",
            self.max_attempts
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(error) => return Err(error),
      }
    }
  }

  /// Run `op`, retrying both errors and `Ok` values that `accept` rejects.
  /// Once attempts are exhausted the last value is returned as-is, rejected
  /// or not.
  pub async fn run_accept<T, E, F, Fut, P>(&self, mut op: F, accept: P) -> Result<T, E>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&T) -> bool,
  {
    let mut attempt = 1;
    loop {
      let outcome = op().await;
      let retry = match &outcome {
        Ok(value) => !accept(value),
        Err(_) => true,
      };
      if !retry || attempt >= self.max_attempts {
        return outcome;
      }
      let delay = self.delay_for(attempt);
      match &outcome {
        Ok(_) => tracing::warn!(
          "attempt {attempt}/{} rejected; retrying in {delay:?}",
          self.max_attempts
        ),
        Err(error) => tracing::warn!(
          "attempt {attempt}/{} failed: {error}; retrying in {delay:?}",
          self.max_attempts
        ),
      }
      tokio::time::sleep(delay).await;
      attempt += 1;
    }
  }
}
