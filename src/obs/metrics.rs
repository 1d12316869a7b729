// self
use crate::obs::{OpKind, OpOutcome};

/// Counter incremented for every relay operation attempt, success, and failure.
pub const OP_COUNTER: &str = "igdb_relay_op_total";

/// `op` and `outcome` labels attached to one [`OP_COUNTER`] increment.
pub fn op_labels(kind: OpKind, outcome: OpOutcome) -> [(&'static str, &'static str); 2] {
	[("op", kind.as_str()), ("outcome", outcome.as_str())]
}

/// Bumps [`OP_COUNTER`]; compiled out unless the `metrics` feature is on.
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		let labels = op_labels(kind, outcome)
			.into_iter()
			.map(|(key, value)| metrics::Label::new(key, value))
			.collect::<Vec<_>>();

		metrics::counter!(OP_COUNTER, labels).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}
