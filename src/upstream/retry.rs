//! Bounded exponential backoff for transport failures.

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

/// Retry budget applied to provider calls that fail at the transport layer.
///
/// `max_attempts` counts the first call, so `1` disables retries. The delay before retry
/// `n` (1-based) is `base_delay * 2^(n-1)`, capped at `max_delay`, then jittered into the
/// upper half of that window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total attempts including the first call.
	pub max_attempts: u32,
	/// Delay before the first retry.
	pub base_delay: StdDuration,
	/// Upper bound for any single delay.
	pub max_delay: StdDuration,
}
impl RetryPolicy {
	const DEFAULT_MAX_ATTEMPTS: u32 = 3;
	const DEFAULT_BASE_DELAY: StdDuration = StdDuration::from_millis(200);
	const DEFAULT_MAX_DELAY: StdDuration = StdDuration::from_secs(2);

	/// Creates a policy; `max_attempts` below one is raised to one.
	pub fn new(max_attempts: u32, base_delay: StdDuration, max_delay: StdDuration) -> Self {
		Self { max_attempts: max_attempts.max(1), base_delay, max_delay: max_delay.max(base_delay) }
	}

	/// Policy that never retries.
	pub fn disabled() -> Self {
		Self::new(1, StdDuration::ZERO, StdDuration::ZERO)
	}

	/// Overrides the attempt budget.
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts.max(1);

		self
	}

	/// Returns `true` when another attempt may follow attempt number `attempt` (1-based).
	pub fn allows_retry_after(&self, attempt: u32) -> bool {
		attempt < self.max_attempts
	}

	/// Un-jittered delay before retry number `retry` (1-based).
	pub fn ceiling_for(&self, retry: u32) -> StdDuration {
		let factor = 1_u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);

		self.base_delay.saturating_mul(factor).min(self.max_delay)
	}

	/// Jittered delay before retry number `retry` (1-based), in `[ceiling / 2, ceiling]`.
	pub fn delay_for(&self, retry: u32) -> StdDuration {
		let ceiling = self.ceiling_for(retry);
		let ceiling_ms = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);

		if ceiling_ms < 2 {
			return ceiling;
		}

		let jittered = rand::rng().random_range(ceiling_ms / 2..=ceiling_ms);

		StdDuration::from_millis(jittered)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_BASE_DELAY, Self::DEFAULT_MAX_DELAY)
	}
}
