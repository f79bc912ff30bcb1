//! Error taxonomy shared by the pipeline, the refresh coordinator, and account calls.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration or request-construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Refresh exchange failed; the session is no longer usable.
	#[error(transparent)]
	Refresh(#[from] RefreshError),

	/// Server rejected the credentials attached to the call.
	#[error("Request to {} was not authorized (status {}).", .0.url, .0.status)]
	Unauthorized(HttpFailure),
	/// Server answered with any other non-success status.
	#[error("Request to {} failed with status {}.", .0.url, .0.status)]
	Status(HttpFailure),
	/// Response body did not match the expected JSON shape.
	#[error("Response from {url} could not be decoded.")]
	Decode {
		/// Endpoint that produced the body.
		url: Url,
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Server issued a token that cannot be carried in an `Authorization` header.
	#[error("Access token is unusable: {reason}.")]
	InvalidToken {
		/// Why the token was rejected.
		reason: &'static str,
	},
}
impl Error {
	/// Returns `true` when the caller should treat the session as invalid (login again).
	pub fn is_session_invalid(&self) -> bool {
		matches!(self, Self::Unauthorized(_) | Self::Refresh(_))
	}

	/// Returns the HTTP failure carried by status-derived variants.
	pub fn http_failure(&self) -> Option<&HttpFailure> {
		match self {
			Self::Unauthorized(failure) | Self::Status(failure) => Some(failure),
			_ => None,
		}
	}
}

/// Non-success HTTP response preserved in its original shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpFailure {
	/// Status returned by the server.
	pub status: StatusCode,
	/// Endpoint that produced the response.
	pub url: Url,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl HttpFailure {
	/// Extracts the server-supplied message from `detail`, `error`, or `message` JSON fields.
	pub fn detail(&self) -> Option<String> {
		let value = serde_json::from_slice::<serde_json::Value>(&self.body).ok()?;

		["detail", "error", "message"]
			.iter()
			.find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
			.map(str::to_owned)
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Client configuration failed validation.
	#[error(transparent)]
	Client(#[from] crate::config::ClientConfigError),
	/// Session was built without a transport and no default transport is compiled in.
	#[error("No HTTP transport was configured for the session.")]
	MissingTransport,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Body(#[source] serde_json::Error),
	/// Request URL could not be resolved against the base URL.
	#[error("Path `{path}` cannot be resolved against the base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Endpoint being called.
		url: Url,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Call exceeded the configured timeout.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Endpoint being called.
		url: Url,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url, source: Box::new(src) }
	}
}

/// Failure of the refresh exchange, shared by every caller that waited on it.
#[derive(Clone, Debug, ThisError)]
pub enum RefreshError {
	/// Refresh endpoint refused the session credential.
	#[error("Refresh endpoint rejected the session with status {status}.")]
	Rejected {
		/// Status returned by the refresh endpoint.
		status: StatusCode,
		/// Server-supplied message, when present.
		detail: Option<String>,
	},
	/// Refresh endpoint answered 2xx without a usable access token.
	#[error("Refresh response is malformed: {message}.")]
	MalformedResponse {
		/// Parsing failure summary.
		message: String,
	},
	/// Refresh call never produced a response.
	#[error("Refresh call failed before a response arrived.")]
	Upstream {
		/// Transport or configuration failure behind the exchange.
		#[source]
		source: Arc<Error>,
	},
}
impl RefreshError {
	/// Wraps an upstream failure so it can be cloned to every waiter.
	pub fn upstream(err: Error) -> Self {
		Self::Upstream { source: Arc::new(err) }
	}
}
