//! Navigation gate for protected views.
//!
//! A check restores a missing token through the cookie-backed refresh exchange, then confirms
//! it against the identity endpoint. Any failure redirects to the login route.

// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	session::{Identity, Session},
};

/// State of the most recent navigation check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
	/// No check has run yet.
	Idle,
	/// A check is in progress.
	Checking,
	/// The last check confirmed a live session.
	Allowed,
	/// The last check failed and redirected.
	Denied,
}

/// Outcome of a navigation check.
#[derive(Clone, Debug, PartialEq)]
pub enum GateDecision {
	/// Navigation may proceed.
	Allow {
		/// Identity confirmed by the server.
		identity: Identity,
	},
	/// Navigation must be redirected.
	Redirect {
		/// Route to navigate to instead.
		to: String,
	},
}
impl GateDecision {
	/// Returns `true` when navigation may proceed.
	pub fn is_allowed(&self) -> bool {
		matches!(self, Self::Allow { .. })
	}
}

/// Guards protected navigation on a live session.
#[derive(Debug)]
pub struct SessionGate {
	session: Session,
	login_route: String,
	state: Mutex<GateState>,
}
impl SessionGate {
	/// Creates a gate that redirects to `login_route` when the session cannot be confirmed.
	pub fn new(session: Session, login_route: impl Into<String>) -> Self {
		Self { session, login_route: login_route.into(), state: Mutex::new(GateState::Idle) }
	}

	/// Session guarded by this gate.
	pub fn session(&self) -> &Session {
		&self.session
	}

	/// Route used for redirects.
	pub fn login_route(&self) -> &str {
		&self.login_route
	}

	/// State of the most recent check.
	pub fn state(&self) -> GateState {
		*self.state.lock()
	}

	/// Decides whether a protected navigation may proceed.
	///
	/// Never returns an error: every failure becomes a redirect to the login route.
	pub async fn check(&self) -> GateDecision {
		const KIND: FlowKind = FlowKind::Gate;

		let span = FlowSpan::new(KIND, "check");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		*self.state.lock() = GateState::Checking;

		let result = span.instrument(self.verify()).await;

		obs::record_result(KIND, &result);

		match result {
			Ok(identity) => {
				*self.state.lock() = GateState::Allowed;

				GateDecision::Allow { identity }
			},
			Err(err) => {
				obs::flow_warn(KIND, "check", &err);
				*self.state.lock() = GateState::Denied;

				GateDecision::Redirect { to: self.login_route.clone() }
			},
		}
	}

	async fn verify(&self) -> Result<Identity> {
		if self.session.token().is_none() {
			obs::flow_debug(FlowKind::Gate, "check", "no token held, restoring from session cookie");
			self.session.refresh().await?;
		}

		self.session.me().await
	}
}
