//! Exposes an in-process storage endpoint for use in integration tests.
//!
//! ```
//! use putstorm_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = TestServer::new().await;
//!    let endpoint = server.endpoint();
//!    // write to the endpoint in tests...
//! }
//! ```

use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::put;
use tokio_stream::wrappers::ReceiverStream;

/// A `PUT` request as received by the [`TestServer`].
#[derive(Clone, Debug)]
pub struct ReceivedWrite {
    /// The request path, including the leading `/`.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ReceivedWrite {
    /// Returns the value of a header as a string, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone, Debug)]
struct Sink {
    status: StatusCode,
    delay: Duration,
    /// Holds the response body open after its first chunk.
    stall: Option<Duration>,
    writes: Arc<Mutex<Vec<ReceivedWrite>>>,
}

async fn receive(
    State(sink): State<Sink>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let write = ReceivedWrite {
        path: uri.path().to_owned(),
        headers,
        body,
    };
    let len = write.body.len();
    sink.writes.lock().unwrap().push(write);

    if !sink.delay.is_zero() {
        tokio::time::sleep(sink.delay).await;
    }

    let body = format!("stored {len} bytes");
    let Some(stall) = sink.stall else {
        return (sink.status, body).into_response();
    };

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, Infallible>>(1);
    tokio::spawn(async move {
        tx.send(Ok(Bytes::from(body))).await.ok();
        tokio::time::sleep(stall).await;
    });
    (sink.status, Body::from_stream(ReceiverStream::new(rx))).into_response()
}

/// An in-process storage endpoint that accepts and records every `PUT`.
///
/// It listens on a random available port on localhost and answers every write with a fixed
/// status and a body of `stored <n> bytes`.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    writes: Arc<Mutex<Vec<ReceivedWrite>>>,
}

impl TestServer {
    /// Starts a server answering `201 Created` immediately.
    pub async fn new() -> Self {
        Self::with_response(201, Duration::ZERO).await
    }

    /// Starts a server answering with `status` after waiting for `delay`.
    ///
    /// # Panics
    ///
    /// Panics if `status` is not a valid HTTP status code.
    pub async fn with_response(status: u16, delay: Duration) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        Self::start(status, delay, None)
    }

    /// Starts a server that sends the response head and the first body chunk right away, then
    /// holds the body open for `stall` before finishing it.
    pub async fn with_stalled_body(stall: Duration) -> Self {
        Self::start(StatusCode::OK, Duration::ZERO, Some(stall))
    }

    fn start(status: StatusCode, delay: Duration, stall: Option<Duration>) -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let writes = Arc::new(Mutex::new(Vec::new()));
        let sink = Sink {
            status,
            delay,
            stall,
            writes: Arc::clone(&writes),
        };
        let app = Router::new()
            .route("/{*path}", put(receive))
            .with_state(sink);

        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            handle,
            socket,
            writes,
        }
    }

    /// Returns the base URL to use as the write endpoint.
    ///
    /// This URL uses `localhost` as hostname.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.socket.port())
    }

    /// Returns all writes received so far, in arrival order.
    pub fn writes(&self) -> Vec<ReceivedWrite> {
        self.writes.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
