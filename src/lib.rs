//! Bearer-token request pipeline for cookie-backed web sessions: attach the in-memory access
//! token to every call, refresh it at most once under concurrent 401s, retry each failed call
//! exactly once, and gate protected views on a live session.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod classify;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod session;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{config::ClientConfig, http::ReqwestTransport, session::Session};

	/// Builds a reqwest transport that honors `config` and accepts the self-signed certificates
	/// produced by `httpmock` during tests.
	pub fn test_reqwest_transport(config: &ClientConfig) -> ReqwestTransport {
		let client = ReqwestTransport::client_builder(config)
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Constructs a [`Session`] over [`test_reqwest_transport`].
	///
	/// The transport is returned alongside the session; clones share its cookie jar.
	pub fn build_reqwest_test_session(config: ClientConfig) -> (Session, ReqwestTransport) {
		let transport = test_reqwest_transport(&config);
		let session = Session::builder(config)
			.transport(Arc::new(transport.clone()))
			.build()
			.expect("Failed to build reqwest-backed test session.");

		(session, transport)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use http::{HeaderValue, StatusCode};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{
		Client as ReqwestClient, ClientBuilder as ReqwestClientBuilder, Error as ReqwestError,
	};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
