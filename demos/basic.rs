//! Minimal sieve example — a few endpoints behind the request logger.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl 'http://localhost:3000/users/42?fields=name&fields=email'
//!   curl -X POST http://localhost:3000/users -d 'name=alice&role=admin'
//!   curl http://localhost:3000/report      # handler error → 500
//!   curl http://localhost:3000/nowhere     # 404, still logged

use http::{Method, StatusCode};
use sieve::middleware::logging::RequestLogger;
use sieve::{Error, Request, Response, Router, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .on(Method::GET,  "/users/{id}", get_user)
        .on(Method::POST, "/users",      create_user)
        .on(Method::GET,  "/report",     report)
        .layer(RequestLogger::new());

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// POST /users — curl -d sends application/x-www-form-urlencoded, so the
// logger lists the form fields as parameters and the handler still reads them.
async fn create_user(req: Request) -> Response {
    let Some(name) = req.parameters().get("name") else {
        return Response::status(StatusCode::BAD_REQUEST);
    };

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(format!(r#"{{"id":"99","name":"{name}"}}"#))
}

// GET /report — fails, so only the request line is logged.
async fn report(_req: Request) -> Result<Response, Error> {
    let bytes = std::fs::read("/nonexistent/report.json")?;
    Ok(Response::json(bytes))
}
