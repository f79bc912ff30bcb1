//! Outermost pipeline layer: attach the bearer, refresh once on an authorization failure, and
//! retry the original call exactly once.
//!
//! The per-call decision logic is an explicit state machine:
//!
//! ```text
//! Dispatch(first) --2xx/other/transport error--> return
//!        |
//!        +--authorization failure--> AwaitRefresh --error--> Err(Refresh)
//!                                         |
//!                                         +--token--> Dispatch(retry) --any outcome--> return
//! ```
//!
//! Auth endpoints bypass the machine entirely: they carry the session cookie but never a bearer,
//! and their failures are never retried.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	classify::{FailureClassifier, FailureContext, FailureKind},
	config::Endpoints,
	http::{ApiResponse, OutgoingRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	pipeline::{Middleware, Next, ResponseFuture},
	session::refresh::{self, RefreshCoordinator},
};

/// Which dispatch of a call is being made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
	First,
	Retry,
}

enum Step {
	Dispatch { token: Option<AccessToken>, observed: u64, attempt: Attempt },
	AwaitRefresh { observed: u64 },
}

/// Middleware implementing the attach/refresh/retry policy.
pub struct AuthInterceptor {
	endpoints: Endpoints,
	coordinator: Arc<RefreshCoordinator>,
	classifier: Arc<dyn FailureClassifier>,
}
impl AuthInterceptor {
	/// Creates an interceptor for the given auth endpoints.
	pub fn new(
		endpoints: Endpoints,
		coordinator: Arc<RefreshCoordinator>,
		classifier: Arc<dyn FailureClassifier>,
	) -> Self {
		Self { endpoints, coordinator, classifier }
	}

	async fn run(&self, request: OutgoingRequest, next: Next<'_>) -> Result<ApiResponse> {
		let snapshot = self.coordinator.store().snapshot();
		let mut step = Step::Dispatch {
			token: snapshot.token,
			observed: snapshot.generation,
			attempt: Attempt::First,
		};

		loop {
			step = match step {
				Step::Dispatch { token, observed, attempt } => {
					let result = next.run(request.attempt(token.as_ref())?).await;

					if attempt == Attempt::Retry {
						obs::record_result(FlowKind::Retry, &result);

						return result;
					}

					let response = result?;

					if self.classify(&response) != FailureKind::Authorization {
						return Ok(response);
					}

					Step::AwaitRefresh { observed }
				},
				Step::AwaitRefresh { observed } => {
					let refreshed = self
						.coordinator
						.refresh(observed, || {
							refresh::settle_refresh(next.run(refresh::refresh_request(&self.endpoints)))
						})
						.await;

					match refreshed {
						Ok(token) => {
							obs::record_flow_outcome(FlowKind::Retry, FlowOutcome::Attempt);
							obs::flow_debug(FlowKind::Retry, "interceptor", "retrying with new token");

							Step::Dispatch { token: Some(token), observed, attempt: Attempt::Retry }
						},
						Err(err) => {
							obs::flow_warn(FlowKind::Request, "interceptor", &err);

							return Err(err.into());
						},
					}
				},
			};
		}
	}

	fn classify(&self, response: &ApiResponse) -> FailureKind {
		self.classifier.classify(&FailureContext::from_response(response))
	}
}
impl Middleware for AuthInterceptor {
	fn handle<'a>(&'a self, request: OutgoingRequest, next: Next<'a>) -> ResponseFuture<'a> {
		Box::pin(async move {
			if self.endpoints.is_auth_endpoint(request.url()) {
				return next.run(request.attempt(None)?).await;
			}

			const KIND: FlowKind = FlowKind::Request;

			let span = FlowSpan::new(KIND, "interceptor");

			obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

			let result = span.instrument(self.run(request, next)).await;

			obs::record_result(KIND, &result);

			result
		})
	}
}
impl Debug for AuthInterceptor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthInterceptor")
			.field("refresh", &self.endpoints.refresh.as_str())
			.field("state", &self.coordinator.state())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		classify::DefaultFailureClassifier,
		config::ClientConfig,
		http::{HeaderMap, HttpTransport, TransportFuture},
		pipeline::Pipeline,
		store::TokenStore,
	};

	/// Answers 200 for bearer `T2`, 401 otherwise, and issues `T2` from the refresh endpoint.
	#[derive(Default)]
	struct RotatingServer {
		refreshes: AtomicUsize,
		calls: AtomicUsize,
		bearers: Mutex<Vec<Option<String>>>,
	}
	impl HttpTransport for RotatingServer {
		fn execute(&self, request: OutgoingRequest) -> TransportFuture<'_> {
			Box::pin(async move {
				let url = request.url().clone();

				if url.path() == "/refresh" {
					self.refreshes.fetch_add(1, Ordering::SeqCst);

					return Ok(ApiResponse::new(
						url,
						StatusCode::OK,
						HeaderMap::new(),
						b"{\"access_token\":\"T2\"}".to_vec(),
					));
				}

				self.calls.fetch_add(1, Ordering::SeqCst);
				self.bearers.lock().push(request.bearer().map(str::to_owned));

				let status = match request.bearer() {
					Some("T2") => StatusCode::OK,
					_ => StatusCode::UNAUTHORIZED,
				};

				Ok(ApiResponse::new(url, status, HeaderMap::new(), Vec::new()))
			})
		}
	}

	fn fixture(server: Arc<RotatingServer>) -> (Pipeline, Arc<RefreshCoordinator>, ClientConfig) {
		let config = ClientConfig::builder(
			Url::parse("https://api.example.com/").expect("Fixture URL should parse."),
		)
		.build()
		.expect("Default config should build.");
		let coordinator = Arc::new(RefreshCoordinator::new(Arc::new(TokenStore::default())));
		let interceptor = AuthInterceptor::new(
			config.endpoints.clone(),
			coordinator.clone(),
			Arc::new(DefaultFailureClassifier),
		);
		let pipeline = Pipeline::new(server).layer(Arc::new(interceptor));

		(pipeline, coordinator, config)
	}

	#[tokio::test]
	async fn expired_token_is_refreshed_and_call_retried_once() {
		let server = Arc::new(RotatingServer::default());
		let (pipeline, coordinator, config) = fixture(server.clone());

		coordinator.store().set(AccessToken::new("T1").expect("Fixture token should be valid."));

		let url = config.resolve("me").expect("Path should resolve.");
		let response =
			pipeline.dispatch(OutgoingRequest::get(url)).await.expect("Retry should succeed.");

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(server.refreshes.load(Ordering::SeqCst), 1);
		assert_eq!(
			server.bearers.lock().clone(),
			vec![Some("T1".to_owned()), Some("T2".to_owned())]
		);
		assert_eq!(coordinator.store().get().as_ref().map(AccessToken::expose), Some("T2"));
	}

	#[tokio::test]
	async fn auth_endpoint_failure_is_not_retried() {
		let server = Arc::new(RotatingServer::default());
		let (pipeline, coordinator, config) = fixture(server.clone());

		coordinator.store().set(AccessToken::new("T1").expect("Fixture token should be valid."));

		let response = pipeline
			.dispatch(OutgoingRequest::post(config.endpoints.login.clone()))
			.await
			.expect("Login call should produce a response.");

		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(server.refreshes.load(Ordering::SeqCst), 0);
		assert_eq!(server.bearers.lock().clone(), vec![None]);
	}
}
