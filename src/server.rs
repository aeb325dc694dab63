//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()` — no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.
//!
//! # Errors raised by handlers
//!
//! A request whose chain returns `Err` is answered with an empty
//! `500 Internal Server Error` and logged at error level. Middleware never
//! sees a half-written response for it: there is none.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    bind: Bind,
}

enum Bind {
    Addr(SocketAddr),
    Listener(TcpListener),
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use sieve::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { bind: Bind::Addr(addr) }
    }

    /// Serves on an already bound listener, e.g. one bound to port 0.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener) }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting when `signal`
    /// resolves instead of on SIGTERM / Ctrl-C.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        signal: impl Future<Output = ()> + Send,
    ) -> Result<(), Error> {
        let listener = match self.bind {
            Bind::Addr(addr) => TcpListener::bind(addr).await?,
            Bind::Listener(listener) => listener,
        };
        let addr = listener.local_addr()?;

        // Shared by every connection task; the routing table and middleware
        // chain are never copied.
        let router = Arc::new(router);

        info!(%addr, "sieve listening");

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal immediately stops
                // accepting, even if more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("sieve stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffers one request, runs it through the router, and writes the buffered
/// response back exactly once.
///
/// Infallible towards hyper: body read failures become `400`, chain failures
/// become `500`.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let method = parts.method.clone();
    let path = parts.uri.path().to_owned();

    let response = match router.handle(Request::new(parts, body)).await {
        Ok(response) => response,
        Err(e) => {
            error!(peer = %remote_addr, %method, %path, "request failed: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };

    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    use super::*;
    use crate::middleware::MemorySink;
    use crate::middleware::logging::RequestLogger;

    async fn ok(_req: Request) -> &'static str {
        "OK"
    }

    async fn broken(_req: Request) -> Result<Response, Error> {
        Err(Error::handler("storage offline"))
    }

    async fn echo_form(req: Request) -> Response {
        Response::json(req.body().clone())
    }

    /// Serves `router` on an ephemeral port, sends one raw HTTP/1.1 request
    /// and returns the raw response.
    async fn exchange(router: Router, request: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(Server::from_listener(listener).serve_with_shutdown(
            router,
            async move {
                let _ = stopped.await;
            },
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
        String::from_utf8(raw).unwrap()
    }

    #[tokio::test]
    async fn client_receives_the_buffered_body() {
        let sink = MemorySink::default();
        let app = Router::new()
            .on(Method::GET, "/hello", ok)
            .layer(RequestLogger::new().sink(sink.clone()));

        let raw = exchange(app, "GET /hello?x=1 HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;

        assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"), "{raw}");
        assert!(raw.contains("content-length: 2\r\n"), "{raw}");
        assert!(raw.ends_with("\r\n\r\nOK"), "{raw}");

        let lines = sink.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Request: GET http://test/hello?x=1, Parameters: x=[1]");
        assert!(lines[1].ends_with(" ms): OK"), "{}", lines[1]);
    }

    #[tokio::test]
    async fn handler_error_becomes_a_plain_500() {
        let sink = MemorySink::default();
        let app = Router::new()
            .on(Method::GET, "/report", broken)
            .layer(RequestLogger::new().sink(sink.clone()));

        let raw = exchange(app, "GET /report HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;

        assert!(raw.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{raw}");
        assert_eq!(
            sink.lines(),
            ["Request: GET http://test/report, Parameters: "],
        );
    }

    #[tokio::test]
    async fn form_body_is_logged_and_still_delivered() {
        let sink = MemorySink::default();
        let app = Router::new()
            .on(Method::POST, "/login", echo_form)
            .layer(RequestLogger::new().sink(sink.clone()));

        let body = "user=alice&remember=on";
        let request = format!(
            "POST /login HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Content-Length: {}\r\n\r\n{body}",
            body.len(),
        );
        let raw = exchange(app, &request).await;

        assert!(raw.ends_with(&format!("\r\n\r\n{body}")), "{raw}");
        let lines = sink.lines();
        assert_eq!(
            lines[0],
            "Request: POST http://test/login, Parameters: user=[alice], remember=[on]",
        );
    }
}
