//! Expected-status contracts and the policy that assigns them to probe kinds.

// self
use crate::{_prelude::*, matrix::ProbeKind};

/// Statuses a probe may observe and still pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusContract {
	/// Exactly one status.
	Exact(u16),
	/// Any member of the set.
	AnyOf(BTreeSet<u16>),
}
impl StatusContract {
	/// Builds a set contract.
	pub fn any_of(statuses: impl IntoIterator<Item = u16>) -> Self {
		Self::AnyOf(statuses.into_iter().collect())
	}

	/// Exact contracts require equality; set contracts require membership.
	pub fn accepts(&self, status: u16) -> bool {
		match self {
			Self::Exact(expected) => *expected == status,
			Self::AnyOf(expected) => expected.contains(&status),
		}
	}

	/// Returns a copy without the given status.
	pub fn without(&self, status: u16) -> Self {
		match self {
			Self::AnyOf(expected) =>
				Self::AnyOf(expected.iter().copied().filter(|s| *s != status).collect()),
			exact => exact.clone(),
		}
	}
}
impl Display for StatusContract {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Exact(status) => write!(f, "{status}"),
			Self::AnyOf(statuses) if statuses.len() == 1 =>
				write!(f, "{}", statuses.iter().copied().next().unwrap_or_default()),
			Self::AnyOf(statuses) => {
				f.write_str("one of ")?;

				for (idx, status) in statuses.iter().enumerate() {
					if idx > 0 {
						f.write_str(", ")?;
					}

					write!(f, "{status}")?;
				}

				Ok(())
			},
		}
	}
}

/// Acceptable statuses per probe kind.
///
/// [`StatusPolicy::lenient`] (the default) accepts a 500 for a corrupted token;
/// [`StatusPolicy::strict`] does not. Every accepted 5xx is flagged on the outcome either way.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPolicy {
	/// Valid credentials, including any token for an unscoped method.
	pub allowed: StatusContract,
	/// API key absent.
	pub missing_api_key: StatusContract,
	/// Bearer token absent on an authenticated method.
	pub missing_token: StatusContract,
	/// Token truncated by one character.
	pub corrupted_token: StatusContract,
	/// Token issued for a different scope.
	pub wrong_scope: StatusContract,
	/// Method outside public and authenticated.
	pub forbidden_method: StatusContract,
	/// Randomly generated path under the base URL.
	pub unmapped_path: StatusContract,
}
impl StatusPolicy {
	/// Lenient contract: a corrupted token may surface as a 500.
	pub fn lenient() -> Self {
		Self {
			allowed: StatusContract::any_of([200, 201]),
			missing_api_key: StatusContract::any_of([403, 404]),
			missing_token: StatusContract::any_of([401, 403, 404]),
			corrupted_token: StatusContract::any_of([401, 403, 404, 500]),
			wrong_scope: StatusContract::any_of([401, 403, 404]),
			forbidden_method: StatusContract::any_of([403, 404, 405]),
			unmapped_path: StatusContract::any_of([403, 404]),
		}
	}

	/// Strict contract: no server error is ever acceptable.
	pub fn strict() -> Self {
		let lenient = Self::lenient();

		Self { corrupted_token: lenient.corrupted_token.without(500), ..lenient }
	}

	/// Contract applied to a probe kind.
	pub fn contract(&self, kind: ProbeKind) -> &StatusContract {
		match kind {
			ProbeKind::Allowed | ProbeKind::AnyScope => &self.allowed,
			ProbeKind::MissingApiKey => &self.missing_api_key,
			ProbeKind::MissingToken => &self.missing_token,
			ProbeKind::CorruptedToken => &self.corrupted_token,
			ProbeKind::WrongScope => &self.wrong_scope,
			ProbeKind::ForbiddenMethod => &self.forbidden_method,
			ProbeKind::UnmappedPath => &self.unmapped_path,
		}
	}
}
impl Default for StatusPolicy {
	fn default() -> Self {
		Self::lenient()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn contracts_check_equality_or_membership() {
		assert!(StatusContract::Exact(200).accepts(200));
		assert!(!StatusContract::Exact(200).accepts(201));
		assert!(StatusContract::any_of([403, 404]).accepts(404));
		assert!(!StatusContract::any_of([403, 404]).accepts(401));
	}

	#[test]
	fn contracts_render_for_humans() {
		assert_eq!(StatusContract::Exact(200).to_string(), "200");
		assert_eq!(StatusContract::any_of([405]).to_string(), "405");
		assert_eq!(StatusContract::any_of([404, 403]).to_string(), "one of 403, 404");
	}

	#[test]
	fn strict_policy_rejects_server_errors() {
		let lenient = StatusPolicy::lenient();
		let strict = StatusPolicy::strict();

		assert!(lenient.contract(ProbeKind::CorruptedToken).accepts(500));
		assert!(!strict.contract(ProbeKind::CorruptedToken).accepts(500));
		assert!(strict.contract(ProbeKind::CorruptedToken).accepts(401));
		assert_eq!(strict.allowed, lenient.allowed);
		assert_eq!(StatusPolicy::default(), lenient);
	}

	#[test]
	fn unscoped_probes_share_the_allowed_contract() {
		let policy = StatusPolicy::lenient();

		assert_eq!(policy.contract(ProbeKind::AnyScope), &StatusContract::any_of([200, 201]));
		assert_eq!(
			policy.contract(ProbeKind::ForbiddenMethod),
			&StatusContract::any_of([403, 404, 405])
		);
	}
}
