//! Operation counters exported through the `metrics` facade.

// self
use crate::obs::{OperationKind, OperationOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"fabric_airflow_client_operation_total",
			"operation" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcome_of_result() {
		assert_eq!(OperationOutcome::of(&Ok::<_, ()>(1)), OperationOutcome::Success);
		assert_eq!(OperationOutcome::of(&Err::<(), _>("x")), OperationOutcome::Failure);

		record_operation_outcome(OperationKind::ApiRequest, OperationOutcome::Failure);
	}
}
