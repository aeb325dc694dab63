//! # sieve
//!
//! A minimal HTTP framework whose one built-in middleware logs every
//! exchange: the request line and its parameters before the handler runs,
//! the response body and latency after it returns.
//!
//! ## What a request looks like in the log
//!
//! ```text
//! Request: POST http://shop.local/orders?src=app, Parameters: src=[app], sku=[A-1]
//! Response (in 4 ms): {"id":"99"}
//! ```
//!
//! Request and response bodies are fully buffered, so the logger reads them
//! without disturbing the handler or the client. Long parameter lists and
//! bodies are cut at 2048 characters in the log line only; the client always
//! receives the original bytes.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use sieve::middleware::logging::RequestLogger;
//! use sieve::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     let app = Router::new()
//!         .on(Method::GET,  "/users/{id}", get_user)
//!         .on(Method::POST, "/users",      create_user)
//!         .layer(RequestLogger::new());
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     match req.parameters().get("name") {
//!         Some(_) => Response::status(StatusCode::CREATED),
//!         None => Response::status(StatusCode::BAD_REQUEST),
//!     }
//! }
//! ```
//!
//! ## Handler errors
//!
//! A handler may return `Result<T, E>` with `E: Into<sieve::Error>`. An `Err`
//! passes back through every middleware and the server answers it with
//! `500 Internal Server Error`. The logger writes no response line for it.

mod charset;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::{BoxError, Error};
pub use handler::{BoxFuture, Handler};
pub use request::{Parameters, Request};
pub use response::{ContentType, HandlerOutput, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
