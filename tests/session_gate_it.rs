mod common;

// self
use common::FakeBackend;
use token_relay::{
	api::PredictRequest,
	error::{Error, RefreshError},
	session::{GateDecision, GateState, SessionGate},
};

const LOGIN_ROUTE: &str = "/login";

#[tokio::test]
async fn reload_restores_the_session_through_refresh() {
	let backend = FakeBackend::new();
	let before_reload = common::session(&backend);

	before_reload.login("ada@acme.test", "correct-horse").await.expect("Login should succeed.");

	let after_reload = common::session(&backend);

	assert_eq!(after_reload.token(), None);

	let gate = SessionGate::new(after_reload, LOGIN_ROUTE);

	assert_eq!(gate.state(), GateState::Idle);

	match gate.check().await {
		GateDecision::Allow { identity } => assert_eq!(identity.id, "u-7"),
		other => panic!("Reloaded session should be allowed, got {other:?}."),
	}

	assert_eq!(gate.state(), GateState::Allowed);
	assert_eq!(backend.refresh_calls(), 1);
	assert_eq!(backend.calls_to("me").len(), 1);
	assert!(gate.session().token().is_some());
}

#[tokio::test]
async fn held_token_skips_the_refresh() {
	let backend = FakeBackend::new();
	let session = common::session(&backend);

	session.login("ada@acme.test", "correct-horse").await.expect("Login should succeed.");

	let gate = SessionGate::new(session, LOGIN_ROUTE);

	assert!(gate.check().await.is_allowed());
	assert_eq!(backend.refresh_calls(), 0);
	assert_eq!(backend.calls_to("me").len(), 1);
}

#[tokio::test]
async fn failed_refresh_redirects_without_identity_call() {
	let backend = FakeBackend::new();
	let gate = SessionGate::new(common::session(&backend), LOGIN_ROUTE);

	assert_eq!(gate.check().await, GateDecision::Redirect { to: LOGIN_ROUTE.into() });
	assert_eq!(gate.state(), GateState::Denied);
	assert_eq!(backend.refresh_calls(), 1);
	assert!(backend.calls_to("me").is_empty());
}

#[tokio::test]
async fn failed_refresh_for_a_caller_leads_to_redirect() {
	let backend = FakeBackend::new();
	let session = common::session(&backend);
	let err = session
		.predict(&PredictRequest::new("Staples", "Printer paper"))
		.await
		.expect_err("Refresh without a session cookie should fail.");

	assert!(matches!(err, Error::Refresh(RefreshError::Rejected { .. })));
	assert_eq!(session.token(), None);

	let gate = SessionGate::new(session, LOGIN_ROUTE);

	assert!(!gate.check().await.is_allowed());
	assert_eq!(gate.state(), GateState::Denied);
}

#[tokio::test]
async fn logout_clears_the_session_for_the_next_navigation() {
	let backend = FakeBackend::new();
	let session = common::session(&backend);

	session.login("ada@acme.test", "correct-horse").await.expect("Login should succeed.");
	session.logout().await.expect("Logout should succeed.");

	assert_eq!(session.token(), None);

	let gate = SessionGate::new(session, LOGIN_ROUTE);

	assert_eq!(gate.check().await, GateDecision::Redirect { to: LOGIN_ROUTE.into() });
}

#[tokio::test]
async fn denied_check_can_be_followed_by_an_allowed_one() {
	let backend = FakeBackend::new();
	let gate = SessionGate::new(common::session(&backend), LOGIN_ROUTE);

	assert!(!gate.check().await.is_allowed());

	gate.session().login("ada@acme.test", "correct-horse").await.expect("Login should succeed.");

	assert!(gate.check().await.is_allowed());
	assert_eq!(gate.state(), GateState::Allowed);
}
