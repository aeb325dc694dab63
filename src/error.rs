//! Unified error type.

use std::fmt;

/// A boxed error raised by a handler or middleware.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by sieve's fallible operations.
///
/// Application-level outcomes (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures (binding a port, accepting a connection) and
/// failures raised inside the handler chain. A chain failure travels back
/// through every middleware untouched and the server answers it with
/// `500 Internal Server Error`.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Handler(BoxError),
}

impl Error {
    /// Wraps any error raised while handling a request.
    pub fn handler(e: impl Into<BoxError>) -> Self {
        Self::Handler(e.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Handler(e) => write!(f, "handler: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Handler(e) => Some(&**e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<BoxError> for Error {
    fn from(e: BoxError) -> Self {
        Self::Handler(e)
    }
}
