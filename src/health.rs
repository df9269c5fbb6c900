//! Liveness and readiness probes, mounted at `/healthz` and `/readyz`.
//!
//! Both are cheap and touch no shared state. Probe traffic still passes
//! through the journal layer like any other request.

use serde_json::json;

use crate::request::Request;
use crate::response::Json;

/// `200 {"status":"ok"}` whenever the process can answer at all.
pub async fn liveness(_req: Request) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// `200 {"status":"ready"}`. The in-process collaborators have nothing to
/// warm up, so readiness follows liveness.
pub async fn readiness(_req: Request) -> Json<serde_json::Value> {
    Json(json!({ "status": "ready" }))
}
