//! Account operations against the auth endpoints: login, signup, refresh, identity, logout.

// crates.io
use serde::{Deserializer, de};
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	http::OutgoingRequest,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{Session, refresh},
};

/// Successful login payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
	/// Access token issued for the session.
	pub access_token: AccessToken,
	/// Profile of the authenticated user, when the server includes it.
	#[serde(default)]
	pub user: Option<UserProfile>,
}

/// Public profile returned alongside a login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Server-side user identifier.
	#[serde(deserialize_with = "string_or_number")]
	pub id: String,
	/// Company the account belongs to.
	#[serde(default)]
	pub company: Option<String>,
	/// Login email.
	#[serde(default)]
	pub email: Option<String>,
}

/// Result of a signup request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SignupResponse {
	/// Server status label (`"success"` on creation).
	pub status: String,
	/// Optional human-readable message.
	#[serde(default)]
	pub message: Option<String>,
}

/// Identity returned by the "who am I" endpoint.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Identity {
	/// Subject identifier of the access token.
	#[serde(deserialize_with = "string_or_number")]
	pub id: String,
	/// Any additional claims the server chose to expose.
	#[serde(flatten)]
	pub claims: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
struct LoginBody<'a> {
	email: &'a str,
	password: &'a str,
}

#[derive(Serialize)]
struct SignupBody<'a> {
	company: &'a str,
	email: &'a str,
	password: &'a str,
}

impl Session {
	/// Authenticates with email + password and stores the issued access token.
	///
	/// The server also sets the session cookie used by later refresh exchanges. Rejected
	/// credentials surface as [`Error::Unauthorized`].
	pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = OutgoingRequest::post(self.config().endpoints.login.clone())
					.json(&LoginBody { email, password })?;
				let login = self.send(request).await?.json::<LoginResponse>()?;

				self.store().set(login.access_token.clone());

				Ok(login)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Creates an account. Does not log in.
	pub async fn signup(
		&self,
		company: &str,
		email: &str,
		password: &str,
	) -> Result<SignupResponse> {
		const KIND: FlowKind = FlowKind::Signup;

		let span = FlowSpan::new(KIND, "signup");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = OutgoingRequest::post(self.config().endpoints.signup.clone())
					.json(&SignupBody { company, email, password })?;

				self.send(request).await?.json::<SignupResponse>()
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Exchanges the session cookie for a new access token.
	///
	/// Joins an exchange already in flight instead of starting a second one. On failure the
	/// store is cleared.
	pub async fn refresh(&self) -> Result<AccessToken> {
		let observed = self.store().generation();
		let endpoints = &self.config().endpoints;
		let pipeline = &self.pipeline;

		self.coordinator()
			.refresh(observed, || {
				refresh::settle_refresh(pipeline.dispatch(refresh::refresh_request(endpoints)))
			})
			.await
			.map_err(Error::from)
	}

	/// Fetches the identity behind the current access token.
	pub async fn me(&self) -> Result<Identity> {
		const KIND: FlowKind = FlowKind::Identity;

		let span = FlowSpan::new(KIND, "me");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = OutgoingRequest::get(self.config().endpoints.me.clone());

				self.send(request).await?.json::<Identity>()
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Ends the session server-side and forgets the local token.
	///
	/// The local token is cleared even when the server call fails.
	pub async fn logout(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = OutgoingRequest::post(self.config().endpoints.logout.clone())
					.json(&serde_json::json!({}))?;
				let outcome = self.send(request).await.map(|_| ());

				self.store().clear();

				outcome
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Text(String),
		Number(serde_json::Number),
	}

	match Raw::deserialize(deserializer)? {
		Raw::Text(text) if !text.is_empty() => Ok(text),
		Raw::Text(_) => Err(de::Error::custom("identifier is empty")),
		Raw::Number(number) => Ok(number.to_string()),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn login_response_accepts_numeric_user_ids() {
		let login: LoginResponse = serde_json::from_str(
			r#"{"access_token":"T1","user":{"id":7,"company":"Acme","email":"a@acme.test"}}"#,
		)
		.expect("Login payload should deserialize.");
		let user = login.user.expect("User profile should be present.");

		assert_eq!(login.access_token.expose(), "T1");
		assert_eq!(user.id, "7");
		assert_eq!(user.company.as_deref(), Some("Acme"));
	}

	#[test]
	fn login_response_without_user_is_accepted() {
		let login: LoginResponse = serde_json::from_str(r#"{"access_token":"T1"}"#)
			.expect("Login payload without user should deserialize.");

		assert!(login.user.is_none());
	}

	#[test]
	fn identity_keeps_extra_claims() {
		let identity: Identity = serde_json::from_str(r#"{"id":"u-1","role":"admin"}"#)
			.expect("Identity payload should deserialize.");

		assert_eq!(identity.id, "u-1");
		assert_eq!(identity.claims.get("role").and_then(|v| v.as_str()), Some("admin"));
		assert!(serde_json::from_str::<Identity>(r#"{"id":""}"#).is_err());
	}

	#[test]
	fn signup_response_message_is_optional() {
		let created: SignupResponse =
			serde_json::from_str(r#"{"status":"success"}"#).expect("Signup should deserialize.");
		let rejected: SignupResponse =
			serde_json::from_str(r#"{"status":"error","message":"All fields required"}"#)
				.expect("Signup error should deserialize.");

		assert_eq!(created.message, None);
		assert_eq!(rejected.message.as_deref(), Some("All fields required"));
	}
}
