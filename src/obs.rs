//! Observability helpers for relay operations.
//!
//! Every operation runs inside a `tracing` span named `igdb_relay.op` carrying the `op`
//! and `stage` fields. With the `metrics` feature enabled, the `igdb_relay_op_total`
//! counter is incremented for every attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod span;

pub use metrics::*;
pub use span::*;

// crates.io
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
// self
use crate::_prelude::*;

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "igdb_relay=info,tower_http=info";

/// Relay operations observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Client-credentials exchange at the identity endpoint.
	IdentityExchange,
	/// Authenticated call to the metadata provider.
	UpstreamFetch,
	/// Inbound relay request at the HTTP boundary.
	Relay,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::IdentityExchange => "identity_exchange",
			OpKind::UpstreamFetch => "upstream_fetch",
			OpKind::Relay => "relay",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Installs the global `tracing` subscriber (fmt layer + `RUST_LOG` filter).
///
/// Falls back to [`DEFAULT_LOG_FILTER`] when `RUST_LOG` is unset or unparsable. Calling
/// this more than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing() {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
	let _ = tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_target(true))
		.try_init();
}
