//! Session facade tying the token store, refresh coordinator, and interceptor to a transport.
//!
//! A [`Session`] is cheap to clone; every clone shares one [`TokenStore`], one
//! [`RefreshCoordinator`], and one [`Pipeline`]. The [`AuthInterceptor`] is always the
//! outermost layer, so caller-supplied middleware runs once per attempt beneath it and the
//! refresh exchange never re-enters the interceptor.

pub mod account;
pub mod gate;
pub mod interceptor;
pub mod refresh;

pub use account::*;
pub use gate::*;
pub use interceptor::*;
pub use refresh::*;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	classify::{DefaultFailureClassifier, FailureClassifier, FailureContext, FailureKind},
	config::ClientConfig,
	http::{ApiResponse, HttpTransport, OutgoingRequest},
	pipeline::{Middleware, Pipeline},
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Authenticated client session for one browser-like principal.
#[derive(Clone)]
pub struct Session {
	config: Arc<ClientConfig>,
	store: Arc<TokenStore>,
	coordinator: Arc<RefreshCoordinator>,
	classifier: Arc<dyn FailureClassifier>,
	pipeline: Arc<Pipeline>,
}
impl Session {
	/// Creates a session backed by the default reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn new(config: ClientConfig) -> Result<Self> {
		Self::builder(config).build()
	}

	/// Starts a builder for sessions with custom transports, layers, or classifiers.
	pub fn builder(config: ClientConfig) -> SessionBuilder {
		SessionBuilder::new(config)
	}

	/// Resolved client configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Shared token store.
	pub fn store(&self) -> &Arc<TokenStore> {
		&self.store
	}

	/// Shared refresh coordinator.
	pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
		&self.coordinator
	}

	/// Refresh counters accumulated by this session.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		self.coordinator.metrics()
	}

	/// Token currently held in memory.
	pub fn token(&self) -> Option<AccessToken> {
		self.store.get()
	}

	/// Sends `request` through the pipeline and returns whatever response it produced.
	///
	/// Non-success statuses are returned as responses; only transport and refresh failures are
	/// errors.
	pub async fn dispatch(&self, request: OutgoingRequest) -> Result<ApiResponse> {
		self.pipeline.dispatch(request).await
	}

	/// Sends `request` and converts non-success statuses into errors.
	pub async fn send(&self, request: OutgoingRequest) -> Result<ApiResponse> {
		let response = self.dispatch(request).await?;

		match self.classifier.classify(&FailureContext::from_response(&response)) {
			FailureKind::Success => Ok(response),
			FailureKind::Authorization => Err(Error::Unauthorized(response.into_failure())),
			FailureKind::Other => Err(Error::Status(response.into_failure())),
		}
	}

	/// `GET`s a path relative to the base URL and decodes the JSON body.
	pub async fn get_json<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let url = self.config.resolve(path)?;

		self.send(OutgoingRequest::get(url)).await?.json()
	}

	/// `POST`s a JSON body to a path relative to the base URL and decodes the JSON reply.
	pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		let url = self.config.resolve(path)?;
		let request = OutgoingRequest::post(url).json(body)?;

		self.send(request).await?.json()
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("base_url", &self.config.base_url.as_str())
			.field("has_token", &self.store.get().is_some())
			.field("pipeline", &self.pipeline)
			.finish()
	}
}

/// Builder wiring a [`Session`] together.
pub struct SessionBuilder {
	config: ClientConfig,
	transport: Option<Arc<dyn HttpTransport>>,
	layers: Vec<Arc<dyn Middleware>>,
	classifier: Arc<dyn FailureClassifier>,
}
impl SessionBuilder {
	/// Creates a builder with the default classifier and no extra layers.
	pub fn new(config: ClientConfig) -> Self {
		Self {
			config,
			transport: None,
			layers: Vec::new(),
			classifier: Arc::new(DefaultFailureClassifier),
		}
	}

	/// Uses `transport` instead of the default reqwest transport.
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Appends a middleware beneath the interceptor and any layer added before it.
	pub fn layer(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.layers.push(middleware);

		self
	}

	/// Replaces the failure classifier used by the interceptor and by [`Session::send`].
	pub fn classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
		self.classifier = classifier;

		self
	}

	/// Assembles the session.
	pub fn build(self) -> Result<Session> {
		let Self { config, transport, layers, classifier } = self;
		let transport = match transport {
			Some(transport) => transport,
			None => default_transport(&config)?,
		};
		let store = Arc::new(TokenStore::default());
		let coordinator = Arc::new(RefreshCoordinator::new(store.clone()));
		let interceptor = AuthInterceptor::new(
			config.endpoints.clone(),
			coordinator.clone(),
			classifier.clone(),
		);
		let pipeline = layers
			.into_iter()
			.fold(Pipeline::new(transport).layer(Arc::new(interceptor)), Pipeline::layer);

		Ok(Session {
			config: Arc::new(config),
			store,
			coordinator,
			classifier,
			pipeline: Arc::new(pipeline),
		})
	}
}
impl Debug for SessionBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionBuilder")
			.field("base_url", &self.config.base_url.as_str())
			.field("custom_transport", &self.transport.is_some())
			.field("layers", &self.layers.len())
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn default_transport(config: &ClientConfig) -> Result<Arc<dyn HttpTransport>> {
	Ok(Arc::new(ReqwestTransport::from_config(config)?))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport(_: &ClientConfig) -> Result<Arc<dyn HttpTransport>> {
	Err(crate::error::ConfigError::MissingTransport.into())
}
