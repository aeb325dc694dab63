//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. A middleware receives the request together with a
//! [`Next`] continuation, and decides what happens before and after the rest
//! of the chain runs:
//!
//! ```text
//! server → mw[0] → mw[1] → … → route handler (or 404 fallback)
//!        ←       ←       ← … ←
//! ```
//!
//! Middleware is registered on the [`Router`](crate::Router) with
//! [`Router::layer`](crate::Router::layer); the first one registered is the
//! outermost. It wraps every request, matched or not.
//!
//! Built-in middleware:
//! - [`logging::RequestLogger`] — request line before dispatch, response
//!   body and latency after

pub mod logging;
mod sink;

use std::sync::Arc;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::Response;

pub use sink::{LogSink, TracingSink};

#[cfg(test)]
pub(crate) use sink::MemorySink;

/// A unit in the request-handling chain.
///
/// ```rust
/// use sieve::middleware::{Middleware, Next};
/// use sieve::{BoxFuture, Error, Request, Response};
///
/// struct RequireJson;
///
/// impl Middleware for RequireJson {
///     fn handle(&self, req: Request, next: Next) -> BoxFuture<Result<Response, Error>> {
///         if req.header("content-type") != Some("application/json") {
///             return Box::pin(async {
///                 Ok::<_, Error>(Response::status(http::StatusCode::UNSUPPORTED_MEDIA_TYPE))
///             });
///         }
///         next.run(req)
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture<Result<Response, Error>>;
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of the chain after the current middleware.
pub struct Next {
    chain: Arc<[BoxedMiddleware]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(chain: Arc<[BoxedMiddleware]>, endpoint: BoxedHandler) -> Self {
        Self { chain, index: 0, endpoint }
    }

    /// Runs the rest of the chain to completion.
    pub fn run(self, req: Request) -> BoxFuture<Result<Response, Error>> {
        let current = self.chain.get(self.index).cloned();
        match current {
            Some(middleware) => {
                let next = Self { index: self.index + 1, ..self };
                middleware.handle(req, next)
            }
            None => self.endpoint.call(req),
        }
    }
}
