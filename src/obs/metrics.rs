// self
use crate::{
	matrix::ProbeKind,
	obs::{Stage, StageOutcome},
	report::Verdict,
};

/// Records a stage outcome via the global metrics recorder (when enabled).
pub fn record_stage_outcome(stage: Stage, outcome: StageOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"authz_assess_stage_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

/// Records one graded probe via the global metrics recorder (when enabled).
pub fn record_probe_outcome(kind: ProbeKind, verdict: Verdict) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"authz_assess_probe_total",
			"kind" => kind.as_str(),
			"verdict" => verdict.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, verdict);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_stage_outcome(Stage::Discovery, StageOutcome::Failure);
		record_probe_outcome(ProbeKind::WrongScope, Verdict::Fail);
	}
}
