//! Middleware contract: `(request, next) -> response`, composable without a framework host.
//!
//! A [`Pipeline`] owns an ordered middleware stack and the terminal [`HttpTransport`].
//! Each middleware receives a [`Next`] handle for the remainder of the chain; `Next` is
//! `Copy`, so a middleware may dispatch more than once (the auth interceptor uses this for its
//! single retry and for the refresh exchange).

// self
use crate::{
	_prelude::*,
	http::{HttpTransport, OutgoingRequest, TransportFuture},
};

/// Boxed future returned by middleware and by [`Next::run`].
pub type ResponseFuture<'a> = TransportFuture<'a>;

/// A single layer of the request pipeline.
pub trait Middleware
where
	Self: Send + Sync,
{
	/// Handles `request`, delegating to `next` for the rest of the chain.
	fn handle<'a>(&'a self, request: OutgoingRequest, next: Next<'a>) -> ResponseFuture<'a>;
}

/// Handle to the remainder of the chain below the current middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
	layers: &'a [Arc<dyn Middleware>],
	transport: &'a dyn HttpTransport,
}
impl<'a> Next<'a> {
	/// Runs the remaining layers and finally the transport.
	pub fn run(self, request: OutgoingRequest) -> ResponseFuture<'a> {
		match self.layers.split_first() {
			Some((layer, rest)) => layer.handle(request, Next { layers: rest, transport: self.transport }),
			None => self.transport.execute(request),
		}
	}
}
impl Debug for Next<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Next").field("remaining_layers", &self.layers.len()).finish()
	}
}

/// Ordered middleware stack over a terminal transport.
#[derive(Clone)]
pub struct Pipeline {
	layers: Vec<Arc<dyn Middleware>>,
	transport: Arc<dyn HttpTransport>,
}
impl Pipeline {
	/// Creates a pipeline that sends requests straight to `transport`.
	pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
		Self { layers: Vec::new(), transport }
	}

	/// Appends a layer beneath the ones already registered.
	pub fn layer(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.layers.push(middleware);

		self
	}

	/// Number of registered layers.
	pub fn len(&self) -> usize {
		self.layers.len()
	}

	/// Returns `true` when no layer is registered.
	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}

	/// Sends `request` through every layer, outermost first.
	pub fn dispatch(&self, request: OutgoingRequest) -> ResponseFuture<'_> {
		self.entry().run(request)
	}

	fn entry(&self) -> Next<'_> {
		Next { layers: &self.layers, transport: self.transport.as_ref() }
	}
}
impl Debug for Pipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pipeline").field("layers", &self.layers.len()).finish()
	}
}
