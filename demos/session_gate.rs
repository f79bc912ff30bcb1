//! Demonstrates the session gate restoring a reloaded session from its cookie and redirecting
//! to the login route once the server session is gone.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use token_relay::{
	config::ClientConfig,
	http::ReqwestTransport,
	session::{GateDecision, Session, SessionGate},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/login");
			then.status(200)
				.header("content-type", "application/json")
				.header("set-cookie", "refresh_token=demo-refresh; Path=/; HttpOnly")
				.json_body(json!({ "access_token": "T1" }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/logout");
			then.status(200)
				.header("set-cookie", "refresh_token=; Max-Age=0; Path=/")
				.json_body(json!({ "ok": true }));
		})
		.await;

	let mut refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "T2" }));
		})
		.await;
	let me_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/me").header("authorization", "Bearer T2");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"id": "u-1",
				"role": "analyst"
			}));
		})
		.await;
	let config = ClientConfig::builder(Url::parse(&server.url("/api/"))?).build()?;
	// httpmock serves a self-signed certificate.
	let transport = ReqwestTransport::with_client(
		ReqwestTransport::client_builder(&config)
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let first_tab =
		Session::builder(config.clone()).transport(Arc::new(transport.clone())).build()?;

	first_tab.login("ada@acme.test", "correct-horse").await?;

	// A reload keeps the cookie jar but starts with an empty token store.
	let reloaded = Session::builder(config).transport(Arc::new(transport)).build()?;
	let gate = SessionGate::new(reloaded, "/login");

	match gate.check().await {
		GateDecision::Allow { identity } =>
			println!("Reloaded session allowed for {} ({:?}).", identity.id, identity.claims),
		GateDecision::Redirect { to } => println!("Unexpected redirect to {to}."),
	}

	gate.session().logout().await?;
	refresh_mock.delete_async().await;
	refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh");
			then.status(401).json_body(json!({ "error": "No refresh" }));
		})
		.await;

	match gate.check().await {
		GateDecision::Allow { .. } => println!("Unexpected access after logout."),
		GateDecision::Redirect { to } => println!("Logged out; redirecting to {to}."),
	}

	println!("Gate state: {:?}.", gate.state());

	me_mock.assert_calls_async(1).await;
	refresh_mock.assert_calls_async(1).await;

	Ok(())
}
