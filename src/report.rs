//! Probe outcomes and the per-descriptor assessment result.

// self
use crate::{
	_prelude::*,
	auth::Scope,
	descriptor::Verb,
	matrix::{ProbeKind, StatusContract},
};

/// Binary verdict for a probe or a whole assessment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
	/// Every expectation held.
	Pass,
	/// At least one expectation did not hold.
	Fail,
}
impl Verdict {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Verdict::Pass => "pass",
			Verdict::Fail => "fail",
		}
	}
}
impl Display for Verdict {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Identity of a probe as carried by its outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeLabel {
	/// What the probe checked.
	pub kind: ProbeKind,
	/// Request method.
	pub verb: Verb,
	/// Target URL.
	pub url: String,
	/// Scope the method requires, for authenticated methods.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<Scope>,
	/// Human-readable description.
	pub description: String,
}

/// Graded result of one probe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum Outcome {
	/// Observed status satisfied the contract.
	Pass {
		/// Probe identity.
		#[serde(flatten)]
		label: ProbeLabel,
		/// Observed status.
		observed: u16,
		/// Contract applied.
		expected: StatusContract,
		/// Set when the accepted status is a server error, a sign of divergent target behavior.
		#[serde(default, skip_serializing_if = "std::ops::Not::not")]
		flagged: bool,
	},
	/// Observed status violated the contract.
	Fail {
		/// Probe identity.
		#[serde(flatten)]
		label: ProbeLabel,
		/// Observed status.
		observed: u16,
		/// Contract applied.
		expected: StatusContract,
	},
	/// No status could be observed; counts as a failure.
	Error {
		/// Probe identity.
		#[serde(flatten)]
		label: ProbeLabel,
		/// Contract that would have applied.
		expected: StatusContract,
		/// Why nothing was observed.
		message: String,
	},
}
impl Outcome {
	/// Probe identity.
	pub fn label(&self) -> &ProbeLabel {
		match self {
			Self::Pass { label, .. } | Self::Fail { label, .. } | Self::Error { label, .. } => label,
		}
	}

	/// Verdict of this outcome; errors count as failures.
	pub fn verdict(&self) -> Verdict {
		match self {
			Self::Pass { .. } => Verdict::Pass,
			Self::Fail { .. } | Self::Error { .. } => Verdict::Fail,
		}
	}

	/// Returns true for a pass.
	pub fn is_pass(&self) -> bool {
		matches!(self, Self::Pass { .. })
	}

	/// Returns true for a pass that accepted a server error.
	pub fn is_flagged(&self) -> bool {
		matches!(self, Self::Pass { flagged: true, .. })
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Pass { label, observed, expected, flagged } => {
				write!(f, "pass: {} (observed {observed}, expected {expected})", label.description)?;

				if *flagged {
					f.write_str(" [flagged: server error accepted]")?;
				}

				Ok(())
			},
			Self::Fail { label, observed, expected } =>
				write!(f, "fail: {} (observed {observed}, expected {expected})", label.description),
			Self::Error { label, expected, message } =>
				write!(f, "fail: {} (error: {message}; expected {expected})", label.description),
		}
	}
}

/// Grades an observed status, or the reason none was observed, against a contract.
pub fn classify(
	label: ProbeLabel,
	observed: Result<u16, String>,
	expected: &StatusContract,
) -> Outcome {
	let expected = expected.clone();

	match observed {
		Ok(status) if expected.accepts(status) =>
			Outcome::Pass { label, observed: status, expected, flagged: status >= 500 },
		Ok(status) => Outcome::Fail { label, observed: status, expected },
		Err(message) => Outcome::Error { label, expected, message },
	}
}

/// Verdict and ordered outcomes for one descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
	/// Descriptor owner.
	pub owner: String,
	/// One outcome per probe, in execution order.
	pub outcomes: Vec<Outcome>,
	/// When the assessment began.
	#[serde(with = "time::serde::rfc3339")]
	pub started_at: OffsetDateTime,
	/// When the last probe was graded.
	#[serde(with = "time::serde::rfc3339")]
	pub finished_at: OffsetDateTime,
}
impl AssessmentResult {
	/// Pass iff every outcome passed. An empty run passes.
	pub fn verdict(&self) -> Verdict {
		if self.outcomes.iter().all(Outcome::is_pass) { Verdict::Pass } else { Verdict::Fail }
	}

	/// Number of passing probes.
	pub fn passed(&self) -> usize {
		self.outcomes.iter().filter(|outcome| outcome.is_pass()).count()
	}

	/// Number of probes.
	pub fn total(&self) -> usize {
		self.outcomes.len()
	}

	/// Failing or erroring outcomes, in execution order.
	pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
		self.outcomes.iter().filter(|outcome| !outcome.is_pass())
	}
}
impl Display for AssessmentResult {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		for outcome in &self.outcomes {
			writeln!(f, "{outcome}")?;
		}

		writeln!(f, "total probes: {}", self.total())?;
		write!(f, "{}", self.verdict())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros::datetime;
	// self
	use super::*;

	fn label(description: &str) -> ProbeLabel {
		ProbeLabel {
			kind: ProbeKind::CorruptedToken,
			verb: Verb::Put,
			url: "https://api.example.com/orders".into(),
			scope: Some(Scope::new("write")),
			description: description.into(),
		}
	}

	fn result(outcomes: Vec<Outcome>) -> AssessmentResult {
		AssessmentResult {
			owner: "team-7".into(),
			outcomes,
			started_at: datetime!(2026-01-02 03:04:05 UTC),
			finished_at: datetime!(2026-01-02 03:04:06 UTC),
		}
	}

	#[test]
	fn classification_follows_the_contract() {
		let contract = StatusContract::any_of([401, 403, 404, 500]);

		assert!(matches!(
			classify(label("a"), Ok(401), &contract),
			Outcome::Pass { observed: 401, flagged: false, .. }
		));
		assert!(classify(label("a"), Ok(500), &contract).is_flagged());
		assert!(matches!(classify(label("a"), Ok(200), &contract), Outcome::Fail { observed: 200, .. }));
		assert_eq!(classify(label("a"), Err("refused".into()), &contract).verdict(), Verdict::Fail);
	}

	#[test]
	fn outcomes_render_one_line_each() {
		let contract = StatusContract::any_of([401, 403]);

		assert_eq!(
			classify(label("PUT x"), Ok(200), &contract).to_string(),
			"fail: PUT x (observed 200, expected one of 401, 403)",
		);
		assert_eq!(
			classify(label("PUT x"), Err("token unavailable".into()), &contract).to_string(),
			"fail: PUT x (error: token unavailable; expected one of 401, 403)",
		);
		assert_eq!(
			classify(label("PUT x"), Ok(500), &StatusContract::any_of([500])).to_string(),
			"pass: PUT x (observed 500, expected 500) [flagged: server error accepted]",
		);
	}

	#[test]
	fn verdict_requires_every_probe_to_pass() {
		let contract = StatusContract::Exact(200);
		let passing = result(vec![classify(label("a"), Ok(200), &contract)]);
		let failing = result(vec![
			classify(label("a"), Ok(200), &contract),
			classify(label("b"), Ok(404), &contract),
		]);

		assert_eq!(passing.verdict(), Verdict::Pass);
		assert_eq!(result(Vec::new()).verdict(), Verdict::Pass);
		assert_eq!(failing.verdict(), Verdict::Fail);
		assert_eq!(failing.passed(), 1);
		assert_eq!(failing.failures().count(), 1);
		assert_eq!(
			failing.to_string(),
			"pass: a (observed 200, expected 200)\nfail: b (observed 404, expected 200)\ntotal \
			 probes: 2\nfail",
		);
	}

	#[test]
	fn result_serializes_with_tagged_outcomes() {
		let rendered = serde_json::to_value(result(vec![classify(
			label("a"),
			Ok(500),
			&StatusContract::any_of([500]),
		)]))
		.expect("Result should serialize.");

		assert_eq!(
			rendered,
			json!({
				"owner": "team-7",
				"outcomes": [{
					"verdict": "pass",
					"kind": "corrupted_token",
					"verb": "PUT",
					"url": "https://api.example.com/orders",
					"scope": "write",
					"description": "a",
					"observed": 500,
					"expected": [500],
					"flagged": true,
				}],
				"started_at": "2026-01-02T03:04:05Z",
				"finished_at": "2026-01-02T03:04:06Z",
			}),
		);
	}
}
