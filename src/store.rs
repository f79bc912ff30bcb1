//! Process-memory token store shared by the interceptor, the refresh coordinator, and the gate.
//!
//! The store never persists: a new process (or a reloaded page) starts empty and must
//! recover its token through the cookie-backed refresh exchange. Every mutation bumps a
//! generation counter so callers can tell whether the token changed across a suspension
//! point without comparing secrets.

// self
use crate::{_prelude::*, auth::AccessToken};

/// Point-in-time view of the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSnapshot {
	/// Token held at the time of the snapshot.
	pub token: Option<AccessToken>,
	/// Generation at the time of the snapshot; bumped by every `set`/`clear`.
	pub generation: u64,
}

#[derive(Debug, Default)]
struct StoreState {
	token: Option<AccessToken>,
	generation: u64,
}

/// Thread-safe in-memory holder for the current access token.
#[derive(Debug, Default)]
pub struct TokenStore(RwLock<StoreState>);
impl TokenStore {
	/// Returns the current token, if any.
	pub fn get(&self) -> Option<AccessToken> {
		self.0.read().token.clone()
	}

	/// Replaces the current token and returns the new generation.
	pub fn set(&self, token: AccessToken) -> u64 {
		let mut state = self.0.write();

		state.token = Some(token);
		state.generation += 1;

		state.generation
	}

	/// Drops the current token and returns the new generation.
	pub fn clear(&self) -> u64 {
		let mut state = self.0.write();

		state.token = None;
		state.generation += 1;

		state.generation
	}

	/// Reads the token and its generation atomically.
	pub fn snapshot(&self) -> TokenSnapshot {
		let state = self.0.read();

		TokenSnapshot { token: state.token.clone(), generation: state.generation }
	}

	/// Returns the current generation.
	pub fn generation(&self) -> u64 {
		self.0.read().generation
	}
}
