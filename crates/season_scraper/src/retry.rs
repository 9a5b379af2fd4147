use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backoff {
	/// Delay before the second attempt, in milliseconds.
	pub initial_delay_ms: u64,
	/// Linear growth added per further attempt.
	pub step_ms: u64,
	/// Exponential growth factor applied per further attempt.
	pub multiplier: f64,
	pub max_delay_ms: u64,
	/// Upper bound of the uniform jitter added to every delay.
	pub jitter_ms: u64,
}

impl Default for Backoff {
	fn default() -> Self {
		Self {
			initial_delay_ms: 1_000,
			step_ms: 3_000,
			multiplier: 1.0,
			max_delay_ms: 60_000,
			jitter_ms: 2_000,
		}
	}
}

impl Backoff {
	/// Deterministic part of the delay after `attempt` failed (1-based).
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss, clippy::cast_possible_wrap)]
	pub fn base_delay(&self, attempt: u32) -> Duration {
		let n = attempt.saturating_sub(1);
		let grown = (self.initial_delay_ms as f64 * self.multiplier.powi(n as i32)) as u64;
		let ms = grown.saturating_add(self.step_ms.saturating_mul(u64::from(n))).min(self.max_delay_ms);
		Duration::from_millis(ms)
	}

	pub fn schedule(&self) -> BackoffSchedule<'_> {
		BackoffSchedule {
			backoff: self,
			previous: Duration::ZERO,
		}
	}
}

/// Stateful view over a [`Backoff`] that never hands out a shorter delay than the one before.
pub struct BackoffSchedule<'a> {
	backoff: &'a Backoff,
	previous: Duration,
}

impl BackoffSchedule<'_> {
	pub fn next_delay<R: Rng + ?Sized>(&mut self, attempt: u32, rng: &mut R) -> Duration {
		let jitter = if self.backoff.jitter_ms == 0 { 0 } else { rng.gen_range(0..=self.backoff.jitter_ms) };
		let delay = (self.backoff.base_delay(attempt) + Duration::from_millis(jitter)).max(self.previous);
		self.previous = delay;
		delay
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Total number of tries, including the first one.
	pub max_attempts: u32,
	pub backoff: Backoff,
	/// Allow a single re-fetch when a page downloads but does not parse.
	pub refetch_on_parse_failure: bool,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			backoff: Backoff::default(),
			refetch_on_parse_failure: false,
		}
	}
}

impl RetryPolicy {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_attempts == 0 {
			return Err(ConfigError::InvalidRetry("max_attempts must be at least 1".to_string()));
		}
		if !self.backoff.multiplier.is_finite() || self.backoff.multiplier < 1.0 {
			return Err(ConfigError::InvalidRetry(format!("multiplier must be >= 1.0, got {}", self.backoff.multiplier)));
		}
		Ok(())
	}
}

#[async_trait]
pub trait Sleeper: Send + Sync {
	async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
	async fn sleep(&self, duration: Duration) {
		tokio::time::sleep(duration).await;
	}
}

/// How a failed attempt should be treated by [`retry_async`].
#[derive(Debug)]
pub enum Retry<E> {
	Transient(E),
	Permanent(E),
}

/// Retry an async operation until it succeeds, fails permanently, or `max_attempts` is reached.
/// - `operation` receives the 1-based attempt number
/// - a `Retry::Permanent` error stops immediately, without sleeping
/// - between transient failures the sleeper is invoked with non-decreasing delays
///
/// Returns `Ok(T)` on success or the error of the last attempt.
pub async fn retry_async<F, Fut, T, E>(policy: &RetryPolicy, sleeper: &dyn Sleeper, mut operation: F) -> Result<T, E>
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<T, Retry<E>>>,
{
	let mut schedule = policy.backoff.schedule();
	let mut attempt = 0;

	loop {
		attempt += 1;
		match operation(attempt).await {
			Ok(result) => return Ok(result),
			Err(Retry::Permanent(err)) => return Err(err),
			Err(Retry::Transient(err)) if attempt >= policy.max_attempts => return Err(err),
			Err(Retry::Transient(_)) => {
				let delay = schedule.next_delay(attempt, &mut rand::thread_rng());
				tracing::debug!(attempt, delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "backing off before retry");
				sleeper.sleep(delay).await;
			}
		}
	}
}
