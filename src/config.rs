//! Client configuration: base URL, resolved endpoint set, and transport knobs.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL uses a scheme other than `http`/`https`.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL cannot anchor relative paths (e.g. `mailto:`).
	#[error("Base URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// Endpoint path does not join onto the base URL.
	#[error("The {endpoint} endpoint path `{path}` is invalid.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that was supplied.
		path: String,
		/// Underlying parsing failure.
		source: url::ParseError,
	},
	/// A zero timeout would fail every call.
	#[error("Timeout must be greater than zero.")]
	ZeroTimeout,
}

/// Resolved endpoint set consumed by the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
	/// Account creation.
	pub signup: Url,
	/// Password login; issues the access token and the session cookie.
	pub login: Url,
	/// Cookie-backed access-token refresh.
	pub refresh: Url,
	/// Identity check.
	pub me: Url,
	/// Session invalidation.
	pub logout: Url,
}
impl Endpoints {
	/// Returns `true` for endpoints that establish or renew credentials (login, signup, refresh).
	///
	/// Query strings and fragments are ignored.
	pub fn is_auth_endpoint(&self, url: &Url) -> bool {
		[&self.login, &self.signup, &self.refresh].into_iter().any(|auth| same_resource(auth, url))
	}
}

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL every relative path is resolved against; always ends with `/`.
	pub base_url: Url,
	/// Resolved auth/account endpoints.
	pub endpoints: Endpoints,
	/// Per-call transport timeout; `None` keeps the transport default.
	pub timeout: Option<StdDuration>,
	/// Optional `User-Agent` applied by the built-in transport.
	pub user_agent: Option<String>,
}
impl ClientConfig {
	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves an ordinary API path (e.g. `predict`) against the base URL.
	pub fn resolve(&self, path: &str) -> Result<Url> {
		self.base_url.join(path.trim_start_matches('/')).map_err(|source| {
			crate::error::ConfigError::InvalidPath { path: path.to_owned(), source }.into()
		})
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL for every endpoint.
	pub base_url: Url,
	/// Relative signup path.
	pub signup_path: String,
	/// Relative login path.
	pub login_path: String,
	/// Relative refresh path.
	pub refresh_path: String,
	/// Relative identity path.
	pub me_path: String,
	/// Relative logout path.
	pub logout_path: String,
	/// Optional per-call timeout.
	pub timeout: Option<StdDuration>,
	/// Optional `User-Agent` header.
	pub user_agent: Option<String>,
}
impl ClientConfigBuilder {
	/// Creates a builder with the default endpoint names.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			signup_path: "signup".into(),
			login_path: "login".into(),
			refresh_path: "refresh".into(),
			me_path: "me".into(),
			logout_path: "logout".into(),
			timeout: None,
			user_agent: None,
		}
	}

	/// Overrides the signup path.
	pub fn signup_path(mut self, path: impl Into<String>) -> Self {
		self.signup_path = path.into();

		self
	}

	/// Overrides the login path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the refresh path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the identity path.
	pub fn me_path(mut self, path: impl Into<String>) -> Self {
		self.me_path = path.into();

		self
	}

	/// Overrides the logout path.
	pub fn logout_path(mut self, path: impl Into<String>) -> Self {
		self.logout_path = path.into();

		self
	}

	/// Sets the per-call transport timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sets the `User-Agent` used by the built-in transport.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let base_url = normalize_base(self.base_url)?;

		if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
			return Err(ClientConfigError::ZeroTimeout);
		}

		let endpoints = Endpoints {
			signup: join_endpoint(&base_url, "signup", self.signup_path)?,
			login: join_endpoint(&base_url, "login", self.login_path)?,
			refresh: join_endpoint(&base_url, "refresh", self.refresh_path)?,
			me: join_endpoint(&base_url, "me", self.me_path)?,
			logout: join_endpoint(&base_url, "logout", self.logout_path)?,
		};

		Ok(ClientConfig { base_url, endpoints, timeout: self.timeout, user_agent: self.user_agent })
	}
}

fn normalize_base(mut url: Url) -> Result<Url, ClientConfigError> {
	if !matches!(url.scheme(), "http" | "https") {
		return Err(ClientConfigError::UnsupportedScheme { url: url.to_string() });
	}
	if url.cannot_be_a_base() {
		return Err(ClientConfigError::CannotBeABase { url: url.to_string() });
	}

	url.set_query(None);
	url.set_fragment(None);

	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	Ok(url)
}

fn join_endpoint(
	base: &Url,
	endpoint: &'static str,
	path: String,
) -> Result<Url, ClientConfigError> {
	base.join(path.trim_start_matches('/'))
		.map_err(|source| ClientConfigError::InvalidEndpoint { endpoint, path, source })
}

fn same_resource(a: &Url, b: &Url) -> bool {
	a.scheme() == b.scheme()
		&& a.host_str() == b.host_str()
		&& a.port_or_known_default() == b.port_or_known_default()
		&& a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse config fixture URL.")
	}

	#[test]
	fn builder_resolves_endpoints_under_base_path() {
		let config = ClientConfig::builder(url("http://localhost:5000/api"))
			.build()
			.expect("Default configuration should build.");

		assert_eq!(config.base_url.as_str(), "http://localhost:5000/api/");
		assert_eq!(config.endpoints.login.as_str(), "http://localhost:5000/api/login");
		assert_eq!(config.endpoints.refresh.as_str(), "http://localhost:5000/api/refresh");
		assert_eq!(config.endpoints.me.as_str(), "http://localhost:5000/api/me");
		assert_eq!(
			config.resolve("/predict").expect("Predict path should resolve.").as_str(),
			"http://localhost:5000/api/predict"
		);
	}

	#[test]
	fn builder_rejects_bad_scheme_and_zero_timeout() {
		let err = ClientConfig::builder(url("ftp://files.example.com/"))
			.build()
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ClientConfigError::UnsupportedScheme { .. }));

		let err = ClientConfig::builder(url("https://api.example.com/"))
			.timeout(StdDuration::ZERO)
			.build()
			.expect_err("Zero timeouts should be rejected.");

		assert_eq!(err, ClientConfigError::ZeroTimeout);
	}

	#[test]
	fn auth_endpoints_ignore_query_and_exclude_identity() {
		let config = ClientConfig::builder(url("https://api.example.com/v1/"))
			.refresh_path("auth/refresh")
			.build()
			.expect("Configuration with custom refresh path should build.");
		let endpoints = &config.endpoints;

		assert!(endpoints.is_auth_endpoint(&url("https://api.example.com/v1/auth/refresh?x=1")));
		assert!(endpoints.is_auth_endpoint(&url("https://api.example.com:443/v1/login")));
		assert!(endpoints.is_auth_endpoint(&url("https://api.example.com/v1/signup")));
		assert!(!endpoints.is_auth_endpoint(&url("https://api.example.com/v1/me")));
		assert!(!endpoints.is_auth_endpoint(&url("https://api.example.com/v1/logout")));
		assert!(!endpoints.is_auth_endpoint(&url("https://other.example.com/v1/login")));
	}
}
