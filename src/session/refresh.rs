//! Single-flight refresh coordination.
//!
//! Callers pass the store generation they observed when their request was rejected. The
//! coordinator serializes exchanges behind one async guard; a caller that acquires the guard
//! after the store has moved past its observed generation reuses the settled outcome instead of
//! starting another exchange. Outcomes are therefore never lost to late joiners, and a burst of
//! rejected calls costs exactly one network refresh.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use http::header::CONTENT_TYPE;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	config::Endpoints,
	error::RefreshError,
	http::OutgoingRequest,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	pipeline::ResponseFuture,
	store::TokenStore,
};

/// Whether a refresh exchange is currently running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshState {
	/// No exchange in flight.
	Idle,
	/// An exchange is running; new callers will wait for it.
	InFlight,
}

#[derive(Debug)]
struct SettledFailure {
	generation: u64,
	error: RefreshError,
}

/// Coordinates refresh exchanges so concurrent callers share one outcome.
#[derive(Debug)]
pub struct RefreshCoordinator {
	store: Arc<TokenStore>,
	flight: AsyncMutex<()>,
	in_flight: AtomicBool,
	last_failure: Mutex<Option<SettledFailure>>,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates a coordinator that publishes refreshed tokens into `store`.
	pub fn new(store: Arc<TokenStore>) -> Self {
		Self {
			store,
			flight: AsyncMutex::new(()),
			in_flight: AtomicBool::new(false),
			last_failure: Mutex::new(None),
			metrics: Default::default(),
		}
	}

	/// Store receiving refreshed tokens.
	pub fn store(&self) -> &Arc<TokenStore> {
		&self.store
	}

	/// Counters for exchanges and joined callers.
	pub fn metrics(&self) -> &Arc<RefreshMetrics> {
		&self.metrics
	}

	/// Current coordinator state.
	pub fn state(&self) -> RefreshState {
		if self.in_flight.load(Ordering::Acquire) { RefreshState::InFlight } else { RefreshState::Idle }
	}

	/// Returns `true` while an exchange is running.
	pub fn is_in_flight(&self) -> bool {
		self.state() == RefreshState::InFlight
	}

	/// Obtains a fresh token, running `exchange` only if no exchange settled after `observed`.
	///
	/// On success the token is published to the store before any waiter resumes. On failure the
	/// store is cleared and every caller that observed the same generation receives a clone of
	/// the same error.
	pub async fn refresh<F, Fut>(
		&self,
		observed: u64,
		exchange: F,
	) -> Result<AccessToken, RefreshError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<AccessToken, RefreshError>>,
	{
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");

		span.instrument(async move {
			let _flight = self.flight.lock().await;

			if let Some(settled) = self.settled_since(observed) {
				self.metrics.record_join();
				obs::flow_debug(KIND, "refresh", "joined settled refresh");

				return settled;
			}

			obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
			obs::flow_debug(KIND, "refresh", "refresh started");
			self.metrics.record_exchange();

			let marker = InFlightMarker::set(&self.in_flight);
			let result = exchange().await;

			match &result {
				Ok(token) => {
					self.store.set(token.clone());
					*self.last_failure.lock() = None;
					self.metrics.record_success();
				},
				Err(err) => {
					let generation = self.store.clear();

					*self.last_failure.lock() =
						Some(SettledFailure { generation, error: err.clone() });
					self.metrics.record_failure();
					obs::flow_warn(KIND, "refresh", err);
				},
			}

			drop(marker);
			obs::record_result(KIND, &result);

			result
		})
		.await
	}

	fn settled_since(&self, observed: u64) -> Option<Result<AccessToken, RefreshError>> {
		let snapshot = self.store.snapshot();

		if snapshot.generation <= observed {
			return None;
		}
		if let Some(token) = snapshot.token {
			return Some(Ok(token));
		}

		self.last_failure
			.lock()
			.as_ref()
			.filter(|failure| failure.generation == snapshot.generation)
			.map(|failure| Err(failure.error.clone()))
	}
}

struct InFlightMarker<'a>(&'a AtomicBool);
impl<'a> InFlightMarker<'a> {
	fn set(flag: &'a AtomicBool) -> Self {
		flag.store(true, Ordering::Release);

		Self(flag)
	}
}
impl Drop for InFlightMarker<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

/// Builds the cookie-authenticated refresh request.
pub(crate) fn refresh_request(endpoints: &Endpoints) -> OutgoingRequest {
	OutgoingRequest::post(endpoints.refresh.clone())
		.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
		.body(b"{}".to_vec())
		.with_credentials(true)
}

#[derive(Deserialize)]
struct RefreshBody {
	access_token: AccessToken,
}

/// Awaits a dispatched refresh request and extracts the new access token.
pub(crate) async fn settle_refresh(
	dispatched: ResponseFuture<'_>,
) -> Result<AccessToken, RefreshError> {
	let response = dispatched.await.map_err(RefreshError::upstream)?;

	if !response.is_success() {
		let status = response.status();
		let detail = response.into_failure().detail();

		return Err(RefreshError::Rejected { status, detail });
	}

	match response.json::<RefreshBody>() {
		Ok(body) => Ok(body.access_token),
		Err(Error::Decode { source, .. }) =>
			Err(RefreshError::MalformedResponse { message: source.to_string() }),
		Err(err) => Err(RefreshError::upstream(err)),
	}
}
