//! Request/response logging.
//!
//! [`RequestLogger`] writes two informational lines per exchange:
//!
//! ```text
//! Request: GET http://shop.local/orders?page=2, Parameters: page=[2]
//! Response (in 3 ms): {"orders":[]}
//! ```
//!
//! The request line is written before the rest of the chain runs, the
//! response line after it returns. Parameter lists and response bodies longer
//! than the configured limit are cut and marked with ` ... (truncated)`.
//!
//! When the chain fails, the error is passed straight back to the server and
//! only the request line is written.

use std::sync::Arc;
use std::time::Instant;

use http::header::CONTENT_TYPE;

use crate::charset;
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::request::{Parameters, Request};
use crate::response::Response;

use super::sink::{LogSink, TracingSink};
use super::{Middleware, Next};

/// Default truncation threshold, in characters.
pub const MAX_LOG_LENGTH: usize = 2048;

/// Appended to content cut at the truncation threshold.
pub const TRUNCATION_MARKER: &str = " ... (truncated)";

/// Logged in place of an empty response body.
pub const NO_CONTENT: &str = "[no response content]";

/// Logged when the body cannot be decoded under its declared charset.
pub const UNDECODABLE_CONTENT: &str = "[unable to decode response content]";

/// Logs every request before dispatch and its response after.
///
/// ```rust,no_run
/// use sieve::middleware::logging::RequestLogger;
/// use sieve::{Request, Router};
///
/// # async fn index(_: Request) -> &'static str { "ok" }
/// let app = Router::new()
///     .on(http::Method::GET, "/", index)
///     .layer(RequestLogger::new().max_length(512));
/// ```
#[derive(Clone)]
pub struct RequestLogger {
    sink: Arc<dyn LogSink>,
    max_length: usize,
}

impl RequestLogger {
    /// A logger writing to `tracing` with the default 2048-character limit.
    pub fn new() -> Self {
        Self { sink: Arc::new(TracingSink), max_length: MAX_LOG_LENGTH }
    }

    /// Sets the truncation threshold, in characters.
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Sends lines to `sink` instead of `tracing`.
    pub fn sink(mut self, sink: impl LogSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    fn log_request(&self, req: &Request) {
        let mut url = req.url();
        if let Some(query) = req.query() {
            url.push('?');
            url.push_str(query);
        }
        let params = render_parameters(req.parameters());

        self.sink.info(&format!(
            "Request: {} {}, Parameters: {}",
            req.method(),
            url,
            truncate(&params, self.max_length),
        ));
    }

    fn log_response(&self, res: &Response, elapsed_ms: u128) {
        let content = response_content(res);
        self.sink.info(&format!(
            "Response (in {elapsed_ms} ms): {}",
            truncate(&content, self.max_length),
        ));
    }
}

impl Default for RequestLogger {
    fn default() -> Self { Self::new() }
}

impl Middleware for RequestLogger {
    fn handle(&self, req: Request, next: Next) -> BoxFuture<Result<Response, Error>> {
        let logger = self.clone();
        Box::pin(async move {
            let start = Instant::now();
            logger.log_request(&req);

            let res = next.run(req).await?;

            logger.log_response(&res, start.elapsed().as_millis());
            Ok(res)
        })
    }
}

/// Renders parameters as `key=[v1, v2], other=[v]`.
pub fn render_parameters(parameters: &Parameters) -> String {
    parameters
        .iter()
        .map(|(key, values)| format!("{key}=[{}]", values.join(", ")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The buffered body as text under the response's declared charset.
///
/// A `content-type` that is not visible ASCII is a decode failure.
pub fn response_content(res: &Response) -> String {
    if res.body().is_empty() {
        return NO_CONTENT.to_owned();
    }
    let label = match res.headers().get(CONTENT_TYPE).map(|v| v.to_str()) {
        None => None,
        Some(Ok(content_type)) => charset::declared(content_type),
        Some(Err(_)) => return UNDECODABLE_CONTENT.to_owned(),
    };
    charset::decode(res.body(), label).unwrap_or_else(|_| UNDECODABLE_CONTENT.to_owned())
}

/// Cuts `content` to `max` characters and appends [`TRUNCATION_MARKER`].
///
/// Content of `max` characters or fewer is returned unchanged.
pub fn truncate(content: &str, max: usize) -> std::borrow::Cow<'_, str> {
    match content.char_indices().nth(max) {
        None => content.into(),
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &content[..cut]).into(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use http::header::HeaderValue;
    use http::StatusCode;

    use super::*;
    use crate::middleware::MemorySink;
    use crate::router::Router;

    fn get(uri: &str) -> Request {
        http::Request::get(uri)
            .header("host", "localhost:3000")
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    async fn ok(_req: Request) -> &'static str {
        "OK"
    }

    #[test]
    fn short_content_is_untouched() {
        let content = "x".repeat(MAX_LOG_LENGTH);
        assert_eq!(truncate(&content, MAX_LOG_LENGTH), content);
    }

    #[test]
    fn long_content_is_cut_and_marked() {
        let content = "y".repeat(MAX_LOG_LENGTH + 1);
        let cut = truncate(&content, MAX_LOG_LENGTH);
        assert!(cut.ends_with(TRUNCATION_MARKER));
        assert!(cut.starts_with(&"y".repeat(MAX_LOG_LENGTH)));
        assert_eq!(cut.chars().count(), MAX_LOG_LENGTH + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let content = "é".repeat(10);
        assert_eq!(truncate(&content, 10), content);
        assert_eq!(truncate(&content, 4), format!("éééé{TRUNCATION_MARKER}"));
    }

    #[test]
    fn parameters_render_like_arrays() {
        let req = get("/items?a=1&b=2&a=3");
        assert_eq!(render_parameters(req.parameters()), "a=[1, 3], b=[2]");
        assert_eq!(render_parameters(get("/items").parameters()), "");
    }

    #[test]
    fn empty_body_has_placeholder() {
        assert_eq!(response_content(&Response::status(StatusCode::NO_CONTENT)), NO_CONTENT);
    }

    #[test]
    fn unknown_charset_has_placeholder() {
        let res = Response::builder().raw("text/plain; charset=klingon", "OK");
        assert_eq!(response_content(&res), UNDECODABLE_CONTENT);
    }

    #[test]
    fn windows_1252_body_is_decoded() {
        let res = Response::builder().raw("text/html; charset=windows-1252", &b"caf\xE9"[..]);
        assert_eq!(response_content(&res), "café");
    }

    #[test]
    fn gbk_body_is_decoded() {
        let res = Response::builder().raw("text/plain; charset=GBK", &b"\xC4\xE3\xBA\xC3"[..]);
        assert_eq!(response_content(&res), "你好");
    }

    #[test]
    fn unreadable_content_type_has_placeholder() {
        let mut res = Response::text("OK");
        res.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_bytes(b"text/plain; charset=\xE9").unwrap(),
        );
        assert_eq!(response_content(&res), UNDECODABLE_CONTENT);
    }

    #[test]
    fn declared_charset_is_used() {
        let res = Response::builder().raw("text/plain; charset=iso-8859-1", &b"na\xEFve"[..]);
        assert_eq!(response_content(&res), "naïve");
    }

    #[tokio::test]
    async fn logs_request_then_response() {
        let sink = MemorySink::default();
        let app = Router::new()
            .on(http::Method::GET, "/search", ok)
            .layer(RequestLogger::new().sink(sink.clone()));

        let res = app.handle(get("/search?a=1&b=2")).await.unwrap();

        assert_eq!(res.body().as_ref(), b"OK");
        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "Request: GET http://localhost:3000/search?a=1&b=2, Parameters: a=[1], b=[2]",
        );
        let duration = lines[1]
            .strip_prefix("Response (in ")
            .and_then(|rest| rest.strip_suffix(" ms): OK"))
            .expect("response line shape");
        assert!(duration.parse::<u128>().is_ok());
    }

    #[tokio::test]
    async fn duration_covers_the_handler() {
        async fn slow(_req: Request) -> &'static str {
            tokio::time::sleep(Duration::from_millis(20)).await;
            "done"
        }

        let sink = MemorySink::default();
        let app = Router::new()
            .on(http::Method::GET, "/slow", slow)
            .layer(RequestLogger::new().sink(sink.clone()));

        app.handle(get("/slow")).await.unwrap();

        let lines = sink.lines();
        let ms: u128 = lines[1]
            .strip_prefix("Response (in ")
            .and_then(|rest| rest.split(' ').next())
            .and_then(|n| n.parse().ok())
            .unwrap();
        assert!(ms >= 20, "measured {ms} ms");
    }

    #[tokio::test]
    async fn failing_handler_logs_only_the_request() {
        async fn broken(_req: Request) -> Result<Response, Error> {
            Err(Error::handler("boom"))
        }

        let sink = MemorySink::default();
        let app = Router::new()
            .on(http::Method::POST, "/orders", broken)
            .layer(RequestLogger::new().sink(sink.clone()));

        let req: Request = http::Request::post("/orders")
            .body(Bytes::new())
            .unwrap()
            .into();
        let err = app.handle(req).await.unwrap_err();

        assert_eq!(err.to_string(), "handler: boom");
        assert_eq!(sink.lines(), ["Request: POST /orders, Parameters: "]);
    }

    #[tokio::test]
    async fn unmatched_requests_are_logged_too() {
        let sink = MemorySink::default();
        let app = Router::new().layer(RequestLogger::new().sink(sink.clone()));

        let res = app.handle(get("/missing")).await.unwrap();

        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        let lines = sink.lines();
        assert_eq!(lines[0], "Request: GET http://localhost:3000/missing, Parameters: ");
        assert!(lines[1].starts_with("Response (in "));
        assert!(lines[1].ends_with(&format!(" ms): {NO_CONTENT}")));
    }

    #[tokio::test]
    async fn long_bodies_are_truncated_in_the_log_only() {
        async fn big(_req: Request) -> String {
            "z".repeat(5000)
        }

        let sink = MemorySink::default();
        let app = Router::new()
            .on(http::Method::GET, "/big", big)
            .layer(RequestLogger::new().max_length(100).sink(sink.clone()));

        let res = app.handle(get("/big")).await.unwrap();

        assert_eq!(res.body().len(), 5000);
        assert!(sink.lines()[1].ends_with(&format!("{}{TRUNCATION_MARKER}", "z".repeat(100))));
    }
}
