//! Response classification hooks that decide which failures are authorization failures.
//!
//! Only an authorization failure on a non-auth endpoint sends a call down the
//! refresh-and-retry path. Everything else passes through the pipeline untouched.

// crates.io
use http::header::WWW_AUTHENTICATE;
// self
use crate::{_prelude::*, http::ApiResponse};

/// Strategy hook that maps a response onto the failure taxonomy.
///
/// Implementors work on crate-owned data only, so they stay independent of the transport.
pub trait FailureClassifier: Send + Sync {
	/// Classifies a response received by the interceptor.
	fn classify(&self, ctx: &FailureContext) -> FailureKind;
}

/// Failure categories recognised by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
	/// Not a failure.
	Success,
	/// Credentials are missing, invalid, or expired.
	Authorization,
	/// Any other non-success status.
	Other,
}

/// Context passed to classifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureContext {
	/// Response status.
	pub status: StatusCode,
	/// `WWW-Authenticate` challenge, when present.
	pub challenge: Option<String>,
	/// Preview of the response body.
	pub body_preview: Option<String>,
}
impl FailureContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a context for the given status.
	pub fn new(status: StatusCode) -> Self {
		Self { status, challenge: None, body_preview: None }
	}

	/// Builds a context from a buffered response.
	pub fn from_response(response: &ApiResponse) -> Self {
		let mut ctx = Self::new(response.status());

		if let Some(challenge) =
			response.headers().get(WWW_AUTHENTICATE).and_then(|value| value.to_str().ok())
		{
			ctx = ctx.with_challenge(challenge);
		}
		if !response.body().is_empty() {
			ctx = ctx.with_body_preview(String::from_utf8_lossy(response.body()));
		}

		ctx
	}

	/// Adds a `WWW-Authenticate` challenge.
	pub fn with_challenge(mut self, challenge: impl Into<String>) -> Self {
		self.challenge = Some(challenge.into());

		self
	}

	/// Adds a truncated body preview.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}
}

/// Default classifier.
///
/// A 401 is always an authorization failure. A 400/403 counts as one only when the server's
/// bearer challenge reports `invalid_token` (RFC 6750). Every other non-2xx is `Other`.
#[derive(Debug, Default)]
pub struct DefaultFailureClassifier;
impl Display for DefaultFailureClassifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-failure-classifier")
	}
}
impl FailureClassifier for DefaultFailureClassifier {
	fn classify(&self, ctx: &FailureContext) -> FailureKind {
		if ctx.status.is_success() {
			return FailureKind::Success;
		}
		if ctx.status == StatusCode::UNAUTHORIZED {
			return FailureKind::Authorization;
		}
		if matches!(ctx.status, StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN)
			&& ctx.challenge.as_deref().is_some_and(is_invalid_token_challenge)
		{
			return FailureKind::Authorization;
		}

		FailureKind::Other
	}
}

fn is_invalid_token_challenge(challenge: &str) -> bool {
	let lowered = challenge.to_ascii_lowercase();

	lowered.starts_with("bearer") && lowered.contains("invalid_token")
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= FailureContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= FailureContext::BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}
		buf.push(ch);
	}

	buf
}
