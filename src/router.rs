//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. Each route carries its
//! handler and an optional guard middleware; the router itself carries the
//! layers that wrap every request, matched or not.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use matchit::Router as MatchitRouter;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::method::Method;
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

struct Route {
    handler: BoxedHandler,
    guard: Option<BoxedMiddleware>,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every registration returns `self` so calls chain:
///
/// ```rust,no_run
/// # use brewgate::{Method, Request, Response, Router, Status};
/// # use brewgate::auth::{Role, TokenService};
/// # async fn login(_: Request) -> Response { Response::text("") }
/// # async fn dashboard(_: Request) -> Response { Response::text("") }
/// # let tokens: std::sync::Arc<TokenService> = unimplemented!();
/// Router::new()
///     .on(Method::Post, "/login", login)
///     .guarded(Method::Get, "/admin-dashboard", tokens.authorize(Role::Admin), dashboard);
/// ```
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Route>>,
    layers: Vec<BoxedMiddleware>,
    body_limit: usize,
}

/// Largest request body read by default: 10 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

type BoxError = Box<dyn StdError + Send + Sync>;

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), layers: Vec::new(), body_limit: DEFAULT_BODY_LIMIT }
    }

    /// Caps the bytes read from a request body in
    /// [`handle_http`](Router::handle_http). Larger bodies get `413`.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics at startup if `path` is malformed or collides with an existing
    /// route for the same method.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, Route { handler: handler.into_boxed_handler(), guard: None })
    }

    /// Like [`on`](Router::on), with `guard` run between the router-wide
    /// layers and the handler.
    pub fn guarded(
        self,
        method: Method,
        path: &str,
        guard: impl Middleware,
        handler: impl Handler,
    ) -> Self {
        let route = Route {
            handler: handler.into_boxed_handler(),
            guard: Some(Arc::new(guard)),
        };
        self.add(method, path, route)
    }

    /// Wrap every request in `layer`. Layers run in registration order,
    /// outermost first.
    pub fn layer(mut self, layer: impl Middleware) -> Self {
        self.layers.push(Arc::new(layer));
        self
    }

    fn add(mut self, method: Method, path: &str, route: Route) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, route)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Routes one request, whose body is already in memory, through the
    /// layers and its handler. Lets the whole stack run in-process without a
    /// socket.
    pub async fn handle(&self, req: Request) -> Response {
        self.dispatch(req, None).await
    }

    /// Routes a request whose body is still to be read. This is what the
    /// server calls per request.
    ///
    /// The body is read once the layers and the route guard have let the
    /// request through, so a body that fails to arrive is answered (and
    /// journaled) like any other response: `413` past the body limit, `400`
    /// if it cannot be read.
    pub async fn handle_http<B>(&self, req: http::Request<B>) -> Response
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let body = body.map_err(Into::into).boxed_unsync();
        self.dispatch(Request::from_parts(parts, Bytes::new()), Some(body)).await
    }

    async fn dispatch(&self, mut req: Request, unread: Option<UnsyncBoxBody<Bytes, BoxError>>) -> Response {
        let mut chain: Vec<BoxedMiddleware> = self.layers.clone();

        let endpoint: BoxedHandler = match self.lookup(req.method(), req.path()) {
            Ok((route, params)) => {
                req.set_params(params);
                chain.extend(route.guard.clone());
                match unread {
                    Some(body) => Arc::new(ReadBody {
                        body: Mutex::new(Some(body)),
                        limit: self.body_limit,
                        handler: Arc::clone(&route.handler),
                    }) as BoxedHandler,
                    None => Arc::clone(&route.handler),
                }
            }
            Err(status) => {
                debug!(method = %req.method(), path = req.path(), "no route");
                fallback(status)
            }
        };

        Next::new(chain.into(), endpoint).run(req).await
    }

    fn lookup(
        &self,
        method: &http::Method,
        path: &str,
    ) -> Result<(&Route, HashMap<String, String>), Status> {
        let method = Method::try_from(method).map_err(|()| Status::MethodNotAllowed)?;
        let tree = self.routes.get(&method).ok_or(Status::NotFound)?;
        let matched = tree.at(path).map_err(|_| Status::NotFound)?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Ok((matched.value, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// Reads the request body, then calls the route's handler.
struct ReadBody {
    body: Mutex<Option<UnsyncBoxBody<Bytes, BoxError>>>,
    limit: usize,
    handler: BoxedHandler,
}

impl ErasedHandler for ReadBody {
    fn call(&self, mut req: Request) -> BoxFuture {
        let body = self.body.lock().take();
        let limit = self.limit;
        let handler = Arc::clone(&self.handler);

        Box::pin(async move {
            if let Some(body) = body {
                match collect_limited(body, limit).await {
                    Ok(collected) => req.set_body(collected.to_bytes()),
                    Err(e) if e.is::<LengthLimitError>() => {
                        warn!(path = req.path(), limit, "request body too large");
                        return Response::message(Status::PayloadTooLarge, "request body too large");
                    }
                    Err(e) => {
                        warn!(path = req.path(), "failed to read request body: {e}");
                        return Response::message(Status::BadRequest, "unreadable request body");
                    }
                }
            }
            handler.call(req).await
        })
    }
}

/// Collects `body` up to `limit` bytes.
fn collect_limited(
    body: UnsyncBoxBody<Bytes, BoxError>,
    limit: usize,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<http_body_util::Collected<Bytes>, BoxError>> + Send>> {
    Box::pin(Limited::new(body, limit).collect())
}

/// Endpoint for requests that matched no route.
fn fallback(status: Status) -> BoxedHandler {
    let handler = move |_req: Request| async move {
        let message = match status {
            Status::MethodNotAllowed => "method not allowed",
            _ => "route not found",
        };
        Response::message(status, message)
    };
    handler.into_boxed_handler()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use http_body_util::Full;
    use hyper::body::Frame;

    use crate::journal::Journal;

    async fn echo_body(req: Request) -> String {
        String::from_utf8_lossy(req.body()).into_owned()
    }

    /// A body whose first frame is a transport error.
    struct Broken;

    impl hyper::body::Body for Broken {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
            Poll::Ready(Some(Err(std::io::Error::other("bad chunk size"))))
        }
    }

    /// A body that never delivers anything.
    struct Stalled;

    impl hyper::body::Body for Stalled {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
            Poll::Pending
        }
    }

    fn post<B>(path: &str, body: B) -> http::Request<B> {
        let mut req = http::Request::new(body);
        *req.method_mut() = http::Method::POST;
        *req.uri_mut() = path.parse().unwrap();
        req
    }

    async fn echo_id(req: Request) -> String {
        req.param("id").unwrap_or("none").to_owned()
    }

    struct Tag(&'static str);

    impl Middleware for Tag {
        fn call(&self, req: Request, next: Next) -> BoxFuture {
            let tag = self.0;
            Box::pin(async move {
                let mut res = next.run(req).await;
                res.headers.push(("x-tag".to_owned(), tag.to_owned()));
                res
            })
        }
    }

    struct Deny;

    impl Middleware for Deny {
        fn call(&self, _req: Request, _next: Next) -> BoxFuture {
            Box::pin(async { Response::status(Status::Forbidden) })
        }
    }

    #[tokio::test]
    async fn path_params_reach_the_handler() {
        let router = Router::new().on(Method::Get, "/users/{id}", echo_id);
        let res = router.handle(Request::new(http::Method::GET, "/users/42")).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), b"42");
    }

    #[tokio::test]
    async fn unknown_path_is_404_and_still_layered() {
        let router = Router::new().on(Method::Get, "/a", echo_id).layer(Tag("outer"));
        let res = router.handle(Request::new(http::Method::GET, "/b")).await;
        assert_eq!(res.status_code(), 404);
        assert_eq!(res.header("x-tag"), Some("outer"));
    }

    #[tokio::test]
    async fn wrong_method_is_404_unknown_method_is_405() {
        let router = Router::new().on(Method::Get, "/a", echo_id);
        let res = router.handle(Request::new(http::Method::POST, "/a")).await;
        assert_eq!(res.status_code(), 404);

        let purge = http::Method::from_bytes(b"PURGE").unwrap();
        let res = router.handle(Request::new(purge, "/a")).await;
        assert_eq!(res.status_code(), 405);
    }

    #[tokio::test]
    async fn guard_can_short_circuit() {
        let router = Router::new()
            .guarded(Method::Get, "/secret", Deny, echo_id)
            .layer(Tag("outer"));
        let res = router.handle(Request::new(http::Method::GET, "/secret")).await;
        assert_eq!(res.status_code(), 403);
        assert_eq!(res.header("x-tag"), Some("outer"));
    }

    #[tokio::test]
    async fn streamed_body_reaches_the_handler() {
        let router = Router::new().on(Method::Post, "/echo", echo_body);
        let res = router.handle_http(post("/echo", Full::new(Bytes::from_static(b"beans")))).await;
        assert_eq!(res.body(), b"beans");
    }

    #[tokio::test]
    async fn unreadable_body_is_400_and_journaled() {
        let journal = Journal::new();
        let router = Router::new().layer(journal.layer()).on(Method::Post, "/echo", echo_body);

        let res = router.handle_http(post("/echo", Broken)).await;
        assert_eq!(res.status_code(), 400);

        let entries = journal.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, Some(400));
    }

    #[tokio::test]
    async fn oversized_body_is_413_and_journaled() {
        let journal = Journal::new();
        let router = Router::new()
            .layer(journal.layer())
            .body_limit(4)
            .on(Method::Post, "/echo", echo_body);

        let res = router.handle_http(post("/echo", Full::new(Bytes::from_static(b"too long")))).await;
        assert_eq!(res.status_code(), 413);
        assert_eq!(journal.list()[0].status, Some(413));
    }

    #[tokio::test]
    async fn client_gone_during_upload_is_499() {
        let journal = Journal::new();
        let router = Router::new().layer(journal.layer()).on(Method::Post, "/echo", echo_body);

        let upload = router.handle_http(post("/echo", Stalled));
        assert!(tokio::time::timeout(Duration::from_millis(20), upload).await.is_err());

        assert_eq!(journal.list()[0].status, Some(499));
    }

    #[tokio::test]
    async fn rejected_guard_skips_the_body() {
        let router = Router::new().guarded(Method::Post, "/echo", Deny, echo_body);
        let res = router.handle_http(post("/echo", Broken)).await;
        assert_eq!(res.status_code(), 403);
    }
}
