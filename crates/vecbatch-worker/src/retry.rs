use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
  /// `base * 2^attempt`
  Exponential { base: Duration },
  Fixed(Duration),
}

/// Bounded retry with a delay after every failed attempt.
///
/// The delay also follows the final failure, so five exponential attempts
/// with a one second base sleep 1, 2, 4, 8 and 16 seconds in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  max_attempts: usize,
  backoff: Backoff,
}

/// Every attempt failed; carries the error of the last one
#[derive(Debug)]
pub struct Exhausted<E> {
  pub attempts: usize,
  pub last_error: E,
}

impl RetryPolicy {
  pub fn exponential(max_attempts: usize, base: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      backoff: Backoff::Exponential { base },
    }
  }

  pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      backoff: Backoff::Fixed(delay),
    }
  }

  /// Delay slept after the failure of attempt `attempt` (zero based)
  pub fn delay_for(&self, attempt: usize) -> Duration {
    match self.backoff {
      Backoff::Exponential { base } => {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        base.saturating_mul(factor)
      }
      Backoff::Fixed(delay) => delay,
    }
  }

  /// Run `op` until it succeeds or the attempts are used up. `op` receives the
  /// zero based attempt index.
  pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, Exhausted<E>>
  where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
  {
    let mut attempt = 0;
    loop {
      match op(attempt).await {
        Ok(value) => return Ok(value),
        Err(e) => {
          let delay = self.delay_for(attempt);
          warn!(
            attempt = attempt + 1,
            max_attempts = self.max_attempts,
            delay = ?delay,
            error = %e,
            "Attempt failed"
          );
          sleep(delay).await;

          attempt += 1;
          if attempt >= self.max_attempts {
            return Err(Exhausted {
              attempts: attempt,
              last_error: e,
            });
          }
        }
      }
    }
  }
}
