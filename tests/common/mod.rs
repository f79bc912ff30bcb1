//! Scripted in-process backend shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
// self
use token_relay::{
	config::ClientConfig,
	error::{Error, TransportError},
	http::{ApiResponse, HeaderMap, HttpTransport, OutgoingRequest, StatusCode, TransportFuture},
	session::Session,
	url::Url,
};

pub const BASE: &str = "https://app.test/api/";

/// How the fake refresh endpoint answers.
#[derive(Clone, Debug)]
pub enum RefreshReply {
	/// Issue the next token in the `T<n>` sequence.
	Issue,
	/// Reject with the given status and an `{"error": ...}` body.
	Reject(u16, &'static str),
	/// Answer 200 without an access token.
	Malformed,
}

/// One call observed by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recorded {
	pub path: String,
	pub bearer: Option<String>,
	pub credentials: bool,
}

/// Minimal stand-in for the auth + categorization backend.
///
/// Protected routes accept only the most recently issued token. The session cookie is modeled
/// as a flag set by login and cleared by logout; refresh honors it only for credentialed calls.
pub struct FakeBackend {
	accepted: Mutex<Option<String>>,
	session_cookie: AtomicBool,
	next_token: AtomicUsize,
	refresh_reply: Mutex<RefreshReply>,
	refresh_delay: Mutex<Duration>,
	reject_everything: AtomicBool,
	refresh_calls: AtomicUsize,
	log: Mutex<Vec<Recorded>>,
}
impl Default for FakeBackend {
	fn default() -> Self {
		Self {
			accepted: Mutex::new(None),
			session_cookie: AtomicBool::new(false),
			next_token: AtomicUsize::new(1),
			refresh_reply: Mutex::new(RefreshReply::Issue),
			refresh_delay: Mutex::new(Duration::ZERO),
			reject_everything: AtomicBool::new(false),
			refresh_calls: AtomicUsize::new(0),
			log: Mutex::new(Vec::new()),
		}
	}
}
impl FakeBackend {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Simulates a server session whose cookie survives a page reload.
	pub fn with_live_session(self: Arc<Self>) -> Arc<Self> {
		self.session_cookie.store(true, Ordering::SeqCst);

		self
	}

	/// Makes the server accept `token` on protected routes.
	pub fn accept(&self, token: &str) {
		*self.accepted.lock() = Some(token.to_owned());
	}

	/// Starts numbering issued tokens from `n`.
	pub fn issue_from(&self, n: usize) {
		self.next_token.store(n, Ordering::SeqCst);
	}

	pub fn set_refresh_reply(&self, reply: RefreshReply) {
		*self.refresh_reply.lock() = reply;
	}

	pub fn set_refresh_delay(&self, delay: Duration) {
		*self.refresh_delay.lock() = delay;
	}

	/// Makes every protected route answer 401 regardless of the bearer.
	pub fn reject_everything(&self) {
		self.reject_everything.store(true, Ordering::SeqCst);
	}

	pub fn refresh_calls(&self) -> usize {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	pub fn calls_to(&self, path: &str) -> Vec<Recorded> {
		let log = self.log.lock();

		log.iter().filter(|call| call.path == path).cloned().collect()
	}

	fn issue(&self) -> String {
		let token = format!("T{}", self.next_token.fetch_add(1, Ordering::SeqCst));

		self.accept(&token);

		token
	}

	fn is_accepted(&self, bearer: Option<&str>) -> bool {
		if self.reject_everything.load(Ordering::SeqCst) {
			return false;
		}

		let accepted = self.accepted.lock();

		matches!((bearer, accepted.as_deref()), (Some(b), Some(a)) if a == b)
	}

	async fn handle(&self, request: OutgoingRequest) -> Result<ApiResponse, Error> {
		let url = request.url().clone();
		let path = url.path().trim_start_matches("/api/").to_owned();

		self.log.lock().push(Recorded {
			path: path.clone(),
			bearer: request.bearer().map(str::to_owned),
			credentials: request.credentials(),
		});

		let reply = |status: u16, body: serde_json::Value| {
			Ok(ApiResponse::new(
				url.clone(),
				StatusCode::from_u16(status).expect("Fixture status should be valid."),
				HeaderMap::new(),
				body.to_string().into_bytes(),
			))
		};

		match path.as_str() {
			"login" => {
				let body: serde_json::Value = serde_json::from_slice(
					request.body_bytes().expect("Login call should carry a body."),
				)
				.expect("Login body should be JSON.");

				if body["password"] != "correct-horse" {
					return reply(401, serde_json::json!({ "error": "Invalid credentials" }));
				}

				self.session_cookie.store(request.credentials(), Ordering::SeqCst);

				let token = self.issue();

				reply(
					200,
					serde_json::json!({
						"access_token": token,
						"user": { "id": 7, "company": "Acme", "email": body["email"] }
					}),
				)
			},
			"signup" => reply(200, serde_json::json!({ "status": "success" })),
			"refresh" => {
				self.refresh_calls.fetch_add(1, Ordering::SeqCst);

				let delay = *self.refresh_delay.lock();

				if !delay.is_zero() {
					tokio::time::sleep(delay).await;
				}
				if !(request.credentials() && self.session_cookie.load(Ordering::SeqCst)) {
					return reply(401, serde_json::json!({ "error": "No refresh" }));
				}

				let script = self.refresh_reply.lock().clone();

				match script {
					RefreshReply::Issue =>
						reply(200, serde_json::json!({ "access_token": self.issue() })),
					RefreshReply::Reject(status, message) =>
						reply(status, serde_json::json!({ "error": message })),
					RefreshReply::Malformed => reply(200, serde_json::json!({ "ok": true })),
				}
			},
			"logout" => {
				self.session_cookie.store(false, Ordering::SeqCst);

				reply(200, serde_json::json!({ "ok": true }))
			},
			"offline" => Err(TransportError::Timeout { url: url.clone() }.into()),
			"boom" => reply(500, serde_json::json!({ "detail": "Model exploded" })),
			_ if !self.is_accepted(request.bearer()) =>
				reply(401, serde_json::json!({ "error": "Unauthorized" })),
			"me" => reply(200, serde_json::json!({ "id": "u-7" })),
			"predict" => reply(
				200,
				serde_json::json!({
					"category": "Office",
					"top": [["Office", 0.9], ["Travel", 0.1]]
				}),
			),
			"feedback" => reply(
				200,
				serde_json::json!({
					"status": "queued",
					"message": "Thanks! Your correction was recorded."
				}),
			),
			_ => reply(404, serde_json::json!({ "detail": "Not Found" })),
		}
	}
}
impl HttpTransport for FakeBackend {
	fn execute(&self, request: OutgoingRequest) -> TransportFuture<'_> {
		Box::pin(self.handle(request))
	}
}

pub fn config() -> ClientConfig {
	ClientConfig::builder(Url::parse(BASE).expect("Fixture base URL should parse."))
		.build()
		.expect("Fixture config should build.")
}

pub fn session(backend: &Arc<FakeBackend>) -> Session {
	Session::builder(config())
		.transport(backend.clone())
		.build()
		.expect("Session over the fake backend should build.")
}
