use std::net::SocketAddr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::http::{Method, StatusCode, Uri};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-request values shared by every layer of the chain.
///
/// The response status and trace id are written once the handler or a
/// middleware knows them; everything else is fixed when the request arrives.
#[derive(Debug)]
pub struct RequestMeta {
    request_id: Uuid,
    started_at: DateTime<Utc>,
    start: Instant,
    method: Method,
    route: String,
    uri: Uri,
    remote_addr: Option<SocketAddr>,
    status: AtomicU16,
    trace_id: OnceLock<String>,
}

impl RequestMeta {
    /// Metadata for `req`, matched against the route pattern `route`.
    pub fn new(req: &Request, route: impl Into<String>) -> Self {
        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            start: Instant::now(),
            method: req.method().clone(),
            route: route.into(),
            uri: req.uri().clone(),
            remote_addr,
            status: AtomicU16::new(0),
            trace_id: OnceLock::new(),
        }
    }

    /// Metadata not tied to an inbound request, for tools and tests.
    pub fn detached() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            started_at: Utc::now(),
            start: Instant::now(),
            method: Method::GET,
            route: String::new(),
            uri: Uri::from_static("/"),
            remote_addr: None,
            status: AtomicU16::new(0),
            trace_id: OnceLock::new(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The route pattern, e.g. `/v1/users/{id}`.
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn set_status(&self, status: StatusCode) {
        self.status.store(status.as_u16(), Ordering::Relaxed);
    }

    /// `None` until a response status has been recorded.
    pub fn status(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status.load(Ordering::Relaxed)).ok()
    }

    /// Records the trace id. Later calls are ignored.
    pub fn set_trace_id(&self, trace_id: impl Into<String>) {
        let _ = self.trace_id.set(trace_id.into());
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.get().map(String::as_str)
    }
}
