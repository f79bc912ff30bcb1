//! Demonstrates a session logging in, calling the categorization API, and transparently
//! recovering when the server starts rejecting its access token.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use token_relay::{
	api::{FeedbackRequest, PredictRequest},
	config::ClientConfig,
	http::ReqwestTransport,
	session::Session,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/login");
			then.status(200)
				.header("content-type", "application/json")
				.header("set-cookie", "refresh_token=demo-refresh; Path=/; HttpOnly")
				.json_body(json!({
					"access_token": "T1",
					"user": { "id": 1, "company": "Acme", "email": "ada@acme.test" }
				}));
		})
		.await;
	let mut predict_t1 = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/predict").header("authorization", "Bearer T1");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({
					"category": "Office",
					"top": [["Office", 0.91], ["Travel", 0.05]]
				}));
		})
		.await;
	let config = ClientConfig::builder(Url::parse(&server.url("/api/"))?)
		.timeout(Duration::from_secs(10))
		.build()?;
	// httpmock serves a self-signed certificate.
	let transport = ReqwestTransport::with_client(
		ReqwestTransport::client_builder(&config)
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let session = Session::builder(config).transport(Arc::new(transport)).build()?;
	let login = session.login("ada@acme.test", "correct-horse").await?;

	println!("Logged in as {:?}.", login.user.map(|user| user.email));

	let invoice = PredictRequest::new("Staples", "Printer paper");
	let prediction = session.predict(&invoice).await?;

	println!("First prediction: {} (top: {:?}).", prediction.category, prediction.top);

	// The access token expires server-side: T1 is now rejected and refresh issues T2.
	predict_t1.delete_async().await;
	predict_t1 = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/predict").header("authorization", "Bearer T1");
			then.status(401).json_body(json!({ "error": "Unauthorized" }));
		})
		.await;

	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "access_token": "T2" }));
		})
		.await;
	let predict_t2 = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/predict").header("authorization", "Bearer T2");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "category": "Office", "top": [["Office", 0.88]] }));
		})
		.await;
	let feedback_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/feedback").header("authorization", "Bearer T2");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"status": "queued",
				"message": "Thanks! Your correction was recorded."
			}));
		})
		.await;
	let (a, b) = tokio::join!(session.predict(&invoice), session.predict(&invoice));

	println!("After expiry: {} and {}.", a?.category, b?.category);

	let ack = session
		.feedback(&FeedbackRequest::new(invoice, "Office Supplies").with_amount(12.5))
		.await?;

	println!("Feedback {}: {}", ack.status, ack.message);

	let metrics = session.refresh_metrics();

	println!(
		"Refresh exchanges: {}, joined callers: {}, failures: {}.",
		metrics.exchanges(),
		metrics.joined(),
		metrics.failures()
	);

	login_mock.assert_async().await;
	predict_t1.assert_calls_async(2).await;
	refresh_mock.assert_calls_async(1).await;
	predict_t2.assert_calls_async(2).await;
	feedback_mock.assert_async().await;

	Ok(())
}
