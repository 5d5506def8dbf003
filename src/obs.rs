//! Optional observability helpers for assessment stages.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `authz_assess.stage` with the `stage` and
//!   `owner` fields, plus events for token acquisition and divergent target behavior.
//! - Enable `metrics` to increment the `authz_assess_stage_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`, and the `authz_assess_probe_total`
//!   counter labeled by probe `kind` + `verdict`.
//!
//! Secrets never reach either sink; tokens are identified by their fingerprint.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed per descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Descriptor validation.
	Validation,
	/// OIDC discovery.
	Discovery,
	/// Client-credentials token acquisition for one scope.
	TokenAcquisition,
	/// One probe against the target API.
	Probe,
	/// The whole assessment of one descriptor.
	Assessment,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Validation => "validation",
			Stage::Discovery => "discovery",
			Stage::TokenAcquisition => "token_acquisition",
			Stage::Probe => "probe",
			Stage::Assessment => "assessment",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
