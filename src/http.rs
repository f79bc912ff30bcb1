//! Transport primitives: the replayable outgoing request, the buffered response, and the
//! [`HttpTransport`] seam.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack. Transports return every
//! HTTP status as an [`ApiResponse`]; only failures that never produced a response (DNS, TCP,
//! TLS, timeouts) surface as errors. Status classification happens in the pipeline.

pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};

// crates.io
use http::header::{AUTHORIZATION, CONTENT_TYPE};
#[cfg(feature = "reqwest")] use http::header::{COOKIE, SET_COOKIE};
#[cfg(feature = "reqwest")] use reqwest::cookie::{CookieStore, Jar};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::{ConfigError, HttpFailure},
};
#[cfg(feature = "reqwest")] use crate::{config::ClientConfig, error::TransportError};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<ApiResponse>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute an [`OutgoingRequest`].
///
/// Implementations must be `Send + Sync + 'static` so a single transport can back every
/// session clone, and must honor [`OutgoingRequest::with_credentials`] by attaching the
/// session cookie for that request (and recording any `Set-Cookie` reply).
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches the request and buffers the response.
	fn execute(&self, request: OutgoingRequest) -> TransportFuture<'_>;
}
impl<T> HttpTransport for Arc<T>
where
	T: ?Sized + HttpTransport,
{
	fn execute(&self, request: OutgoingRequest) -> TransportFuture<'_> {
		(**self).execute(request)
	}
}

/// Replayable description of an outgoing call.
///
/// Method, URL, body, and caller headers are fixed once built; the pipeline only rewrites the
/// `Authorization` header and the credentials flag per attempt.
#[derive(Clone, Debug)]
pub struct OutgoingRequest {
	method: Method,
	url: Url,
	headers: HeaderMap,
	body: Option<Vec<u8>>,
	with_credentials: bool,
}
impl OutgoingRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None, with_credentials: false }
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: Url) -> Self {
		Self::new(Method::GET, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: Url) -> Self {
		Self::new(Method::POST, url)
	}

	/// Adds (or replaces) a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `body` as JSON and sets the matching content type.
	pub fn json<T>(mut self, body: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(ConfigError::Body)?;

		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self.body = Some(bytes);

		Ok(self)
	}

	/// Marks whether the session cookie should accompany the call.
	pub fn with_credentials(mut self, enabled: bool) -> Self {
		self.with_credentials = enabled;

		self
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Target URL.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Headers set by the caller (plus `Authorization` once prepared for an attempt).
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Body bytes, if any.
	pub fn body_bytes(&self) -> Option<&[u8]> {
		self.body.as_deref()
	}

	/// Whether the session cookie accompanies the call.
	pub fn credentials(&self) -> bool {
		self.with_credentials
	}

	/// Returns the bearer value carried by this request, if any.
	pub fn bearer(&self) -> Option<&str> {
		self.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
	}

	/// Clones the request for one dispatch attempt, carrying cookies and the given token.
	pub(crate) fn attempt(&self, token: Option<&AccessToken>) -> Result<Self> {
		let mut attempt = self.clone().with_credentials(true);

		if let Some(token) = token {
			attempt.headers.insert(AUTHORIZATION, token.authorization_header()?);
		}

		Ok(attempt)
	}
}

/// Fully buffered HTTP response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	url: Url,
	status: StatusCode,
	headers: HeaderMap,
	body: Vec<u8>,
}
impl ApiResponse {
	/// Assembles a response from its parts.
	pub fn new(url: Url, status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
		Self { url, status, headers, body: body.into() }
	}

	/// URL that produced the response.
	pub fn url(&self) -> &Url {
		&self.url
	}

	/// Response status.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Raw body bytes.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { url: self.url.clone(), source })
	}

	/// Converts the response into the failure value surfaced to callers.
	pub fn into_failure(self) -> HttpFailure {
		HttpFailure { status: self.status, url: self.url, body: self.body }
	}
}

/// Reqwest-backed transport with an explicit session cookie jar.
///
/// Cookies are attached and recorded only for requests marked
/// [`with_credentials`](OutgoingRequest::with_credentials), mirroring browser semantics.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	jar: Arc<Jar>,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest client with an empty cookie jar.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, jar: Default::default() }
	}

	/// Builds a client honoring the configured timeout and user agent.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		Ok(Self::with_client(Self::client_builder(config).build()?))
	}

	/// Returns a reqwest builder preloaded with the configured timeout and user agent, for
	/// callers that need extra client settings (custom roots, proxies).
	pub fn client_builder(config: &ClientConfig) -> ReqwestClientBuilder {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = config.timeout {
			builder = builder.timeout(timeout);
		}
		if let Some(user_agent) = &config.user_agent {
			builder = builder.user_agent(user_agent.clone());
		}

		builder
	}

	/// Shares an existing cookie jar (e.g. to simulate a reload that keeps the session cookie).
	pub fn with_cookie_jar(mut self, jar: Arc<Jar>) -> Self {
		self.jar = jar;

		self
	}

	/// Cookie jar holding the session cookie.
	pub fn cookie_jar(&self) -> &Arc<Jar> {
		&self.jar
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: OutgoingRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let OutgoingRequest { method, url, headers, body, with_credentials } = request;
			let mut builder = self.client.request(method, url.clone()).headers(headers);

			if with_credentials {
				if let Some(cookie) = self.jar.cookies(&url) {
					builder = builder.header(COOKIE, cookie);
				}
			}
			if let Some(body) = body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(|err| map_reqwest_error(&url, err))?;
			let status = response.status();
			let headers = response.headers().to_owned();

			if with_credentials {
				let mut cookies = headers.get_all(SET_COOKIE).iter();

				self.jar.set_cookies(&mut cookies, &url);
			}

			let body = response.bytes().await.map_err(|err| map_reqwest_error(&url, err))?;

			Ok(ApiResponse::new(url, status, headers, body.to_vec()))
		})
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(url: &Url, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransportError::Timeout { url: url.clone() }.into();
	}

	TransportError::network(url.clone(), err).into()
}
