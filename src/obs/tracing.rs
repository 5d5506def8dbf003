// self
use crate::{_prelude::*, auth::Scope, error::TokenError, obs::Stage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// A span builder used by assessment stages.
#[derive(Clone, Debug)]
pub struct StageSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl StageSpan {
	/// Creates a new span tagged with the provided stage + descriptor owner.
	pub fn new(stage: Stage, owner: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("authz_assess.stage", stage = stage.as_str(), owner);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, owner);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> StageSpanGuard {
		#[cfg(feature = "tracing")]
		{
			StageSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			StageSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`StageSpan::entered`].
pub struct StageSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for StageSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StageSpanGuard(..)")
	}
}

/// Emits a debug event for an issued token, identified by fingerprint only.
pub fn token_acquired(owner: &str, scope: &Scope, fingerprint: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(owner, scope = scope.as_str(), fingerprint, "token acquired");
	#[cfg(not(feature = "tracing"))]
	let _ = (owner, scope, fingerprint);
}

/// Emits a warning for a scope whose token could not be acquired.
pub fn token_failed(owner: &str, scope: &Scope, err: &TokenError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		owner,
		scope = scope.as_str(),
		error = %crate::error::render_chain(err),
		"token unavailable"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (owner, scope, err);
}

/// Emits a warning when a probe passed only because the policy tolerates a server error.
pub fn probe_diverged(owner: &str, description: &str, status: u16) {
	#[cfg(feature = "tracing")]
	tracing::warn!(owner, status, description, "server error accepted by status policy");
	#[cfg(not(feature = "tracing"))]
	let _ = (owner, description, status);
}

/// Emits an error event for a descriptor whose assessment was aborted.
pub fn descriptor_aborted(owner: Option<&str>, err: &Error) {
	#[cfg(feature = "tracing")]
	tracing::error!(
		owner = owner.unwrap_or("<unknown>"),
		error = %crate::error::render_chain(err),
		"assessment aborted"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (owner, err);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn stage_span_noop_without_tracing() {
		let _guard = StageSpan::new(Stage::Validation, "owner").entered();
		// Compile-time smoke test ensures the guard exists even when tracing is disabled.
	}

	#[cfg(feature = "tracing")]
	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = StageSpan::new(Stage::Probe, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
