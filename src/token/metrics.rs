//! Counters describing how the token cache answered its callers.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// How a single `ensure_token` call was answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheEvent {
	/// The call performed an identity exchange that produced a credential.
	Exchanged,
	/// The call was served a credential without exchanging, either from the cache or
	/// from a concurrent caller's exchange.
	Reused,
	/// The call performed an identity exchange that failed.
	Failed,
	/// The call waited on another caller's exchange and received its failure.
	SharedFailure,
}
impl CacheEvent {
	const COUNT: usize = 4;

	const fn slot(self) -> usize {
		match self {
			CacheEvent::Exchanged => 0,
			CacheEvent::Reused => 1,
			CacheEvent::Failed => 2,
			CacheEvent::SharedFailure => 3,
		}
	}
}

/// Point-in-time copy of [`ExchangeMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExchangeCounts {
	/// Identity exchanges that produced a credential.
	pub exchanges: u64,
	/// Calls answered without an exchange of their own.
	pub reuses: u64,
	/// Identity exchanges that failed.
	pub failures: u64,
	/// Calls that received a failure from an exchange they waited on.
	pub shared_failures: u64,
}

/// Token cache counters, updated without locking.
#[derive(Debug, Default)]
pub struct ExchangeMetrics {
	counters: [AtomicU64; CacheEvent::COUNT],
}
impl ExchangeMetrics {
	/// Copies every counter.
	pub fn snapshot(&self) -> ExchangeCounts {
		ExchangeCounts {
			exchanges: self.count(CacheEvent::Exchanged),
			reuses: self.count(CacheEvent::Reused),
			failures: self.count(CacheEvent::Failed),
			shared_failures: self.count(CacheEvent::SharedFailure),
		}
	}

	/// Number of calls answered with `event`.
	pub fn count(&self, event: CacheEvent) -> u64 {
		self.counters[event.slot()].load(Ordering::Relaxed)
	}

	/// Identity exchanges that produced a credential.
	pub fn exchanges(&self) -> u64 {
		self.count(CacheEvent::Exchanged)
	}

	/// Calls answered without an exchange of their own.
	pub fn reuses(&self) -> u64 {
		self.count(CacheEvent::Reused)
	}

	/// Identity exchanges that failed.
	pub fn failures(&self) -> u64 {
		self.count(CacheEvent::Failed)
	}

	pub(crate) fn record(&self, event: CacheEvent) {
		self.counters[event.slot()].fetch_add(1, Ordering::Relaxed);
	}
}
