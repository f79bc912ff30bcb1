//! Redacted access-token wrapper held only in process memory.

// self
use crate::_prelude::*;

const BEARER_PREFIX: &str = "Bearer ";

/// Short-lived bearer credential issued by login or refresh.
///
/// Expiry is enforced server-side and is not tracked here. `Debug` and `Display` redact the
/// value; use [`AccessToken::expose`] only at the point of attaching it to a request.
#[derive(Clone)]
pub struct AccessToken {
	secret: String,
	received_at: OffsetDateTime,
}
impl AccessToken {
	/// Validates and wraps a token value received from the server.
	///
	/// The value must be non-empty visible ASCII so it can travel in an `Authorization` header.
	pub fn new(value: impl Into<String>) -> Result<Self> {
		let secret = value.into();

		if secret.is_empty() {
			return Err(Error::InvalidToken { reason: "token is empty" });
		}
		if !secret.bytes().all(|b| b.is_ascii_graphic()) {
			return Err(Error::InvalidToken { reason: "token contains non-printable characters" });
		}

		Ok(Self { secret, received_at: OffsetDateTime::now_utc() })
	}

	/// Returns the raw token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.secret
	}

	/// Instant the token was received by this process.
	pub fn received_at(&self) -> OffsetDateTime {
		self.received_at
	}

	/// Builds a sensitive `Authorization: Bearer <token>` header value.
	pub fn authorization_header(&self) -> Result<HeaderValue> {
		let mut value = HeaderValue::from_str(&format!("{BEARER_PREFIX}{}", self.secret))
			.map_err(|_| Error::InvalidToken { reason: "token is not a valid header value" })?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl PartialEq for AccessToken {
	fn eq(&self, other: &Self) -> bool {
		self.secret == other.secret
	}
}
impl Eq for AccessToken {}
impl AsRef<str> for AccessToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
impl<'de> Deserialize<'de> for AccessToken {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		Self::new(raw).map_err(serde::de::Error::custom)
	}
}
