use std::sync::atomic::{AtomicU64, Ordering};

use roster_observability::{
    record_error, record_request, request_finished, request_started, set_alive_tasks,
};
use roster_web::{Ctx, Middleware, Next, Request};

/// How often the live task count is sampled, in requests.
const SAMPLE_EVERY: u64 = 1000;

static REQUESTS: AtomicU64 = AtomicU64::new(0);

/// Decrements the active-request gauge even if the request future is dropped.
struct ActiveRequest;

impl ActiveRequest {
    fn start() -> Self {
        request_started();
        Self
    }
}

impl Drop for ActiveRequest {
    fn drop(&mut self) {
        request_finished();
    }
}

pub fn metrics() -> Middleware {
    Middleware::from_fn(|ctx: Ctx, req: Request, next: Next| async move {
        let active = ActiveRequest::start();
        let result = next.run(ctx.clone(), req).await;
        drop(active);

        let n = REQUESTS.fetch_add(1, Ordering::Relaxed) + 1;
        if n % SAMPLE_EVERY == 0 {
            let tasks = tokio::runtime::Handle::current().metrics().num_alive_tasks();
            set_alive_tasks(tasks);
        }

        let meta = ctx.meta();
        let method = meta.method().as_str();
        let status = match &result {
            Ok(response) => response.status(),
            Err(err) => err.status,
        };
        record_request(method, meta.route(), status.as_u16(), meta.elapsed());
        if let Err(err) = &result {
            record_error(method, meta.route(), err.status.as_u16());
        }

        result
    })
}
