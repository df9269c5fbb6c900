//! Cross-origin access for browser clients.
//!
//! [`Cors`] is a router-wide layer with an exact-match origin allowlist
//! (`CORS_ALLOWED_ORIGINS`). Requests without an `Origin` header are not
//! cross-origin and pass untouched. A listed origin gets
//! `access-control-allow-origin` echoed back; an unlisted one is refused with
//! 403 before any route runs. Preflights are answered here and never reach
//! the router's method table.

use std::sync::Arc;

use http::Method;
use tracing::{debug, warn};

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "authorization, content-type";
const MAX_AGE_SECS: &str = "600";

pub struct Cors {
    allowed: Arc<[String]>,
}

impl Cors {
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        Self { allowed: allowed.into_iter().collect() }
    }

    fn allows(&self, origin: &str) -> bool {
        self.allowed.iter().any(|o| o == origin)
    }
}

fn is_preflight(req: &Request) -> bool {
    *req.method() == Method::OPTIONS && req.header("access-control-request-method").is_some()
}

fn decorate(res: &mut Response, origin: &str) {
    res.append_header("access-control-allow-origin", origin);
    res.append_header("vary", "origin");
}

impl Middleware for Cors {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let Some(origin) = req.header("origin").map(str::to_owned) else {
            return Box::pin(next.run(req));
        };

        if !self.allows(&origin) {
            warn!(%origin, path = req.path(), "cross-origin request refused");
            return Box::pin(async { Response::message(Status::Forbidden, "origin not allowed") });
        }

        if is_preflight(&req) {
            debug!(%origin, path = req.path(), "preflight answered");
            let mut res = Response::status(Status::NoContent);
            res.append_header("access-control-allow-methods", ALLOW_METHODS);
            res.append_header("access-control-allow-headers", ALLOW_HEADERS);
            res.append_header("access-control-max-age", MAX_AGE_SECS);
            decorate(&mut res, &origin);
            return Box::pin(async move { res });
        }

        Box::pin(async move {
            let mut res = next.run(req).await;
            decorate(&mut res, &origin);
            res
        })
    }
}
