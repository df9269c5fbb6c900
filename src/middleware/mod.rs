//! Middleware layer.
//!
//! Middleware intercepts a request before its handler runs and sees the
//! response after. It is where the cross-cutting concerns live: the request
//! journal ([`crate::journal::JournalLayer`]) and bearer-token checks
//! ([`crate::auth::Authenticate`], [`crate::auth::Authorize`]).
//!
//! A middleware gets the request plus a [`Next`] continuation. Calling
//! [`Next::run`] passes control down the chain; not calling it
//! short-circuits with whatever response the middleware returns.
//!
//! ```rust
//! use brewgate::middleware::{Middleware, Next};
//! use brewgate::{BoxFuture, Request};
//!
//! struct Noop;
//!
//! impl Middleware for Noop {
//!     fn call(&self, req: Request, next: Next) -> BoxFuture {
//!         Box::pin(next.run(req))
//!     }
//! }
//! ```
//!
//! Order: router-wide layers (registered with `Router::layer`) run first, in
//! registration order, then the route's own guard, then the handler.

use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::Response;

/// A request interceptor.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The rest of the chain after the current middleware.
pub struct Next {
    chain: Arc<[BoxedMiddleware]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(chain: Arc<[BoxedMiddleware]>, endpoint: BoxedHandler) -> Self {
        Self { chain, index: 0, endpoint }
    }

    /// Runs the remaining middleware, then the handler.
    pub async fn run(self, req: Request) -> Response {
        match self.chain.get(self.index).cloned() {
            Some(layer) => {
                let next = Next { index: self.index + 1, ..self };
                layer.call(req, next).await
            }
            None => self.endpoint.call(req).await,
        }
    }
}
