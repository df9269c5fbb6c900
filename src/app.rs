//! Composition root: the shared state and the route table.

use std::future::Future;
use std::sync::Arc;

use crate::api;
use crate::auth::{Role, TokenService};
use crate::catalog::Catalog;
use crate::cors::Cors;
use crate::directory::UserDirectory;
use crate::handler::Handler;
use crate::health;
use crate::images::ImageStore;
use crate::journal::Journal;
use crate::mail::Mailer;
use crate::method::Method;
use crate::orders::OrderBook;
use crate::request::Request;
use crate::response::IntoResponse;
use crate::router::Router;

/// Everything a handler may need, built once at startup.
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub journal: Journal,
    pub directory: Arc<dyn UserDirectory>,
    pub mailer: Arc<dyn Mailer>,
    pub catalog: Arc<dyn Catalog>,
    pub orders: Arc<dyn OrderBook>,
    pub images: Arc<dyn ImageStore>,
    /// Browser origins allowed cross-origin access. Empty turns CORS off.
    pub allowed_origins: Vec<String>,
}

/// Adapts a `(state, request)` handler into a plain [`Handler`] by capturing
/// the state.
fn with_state<F, Fut, R>(state: &Arc<AppState>, f: F) -> impl Handler
where
    F: Fn(Arc<AppState>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    let state = Arc::clone(state);
    move |req: Request| f(Arc::clone(&state), req)
}

/// The full route table, with every request journaled.
pub fn router(state: Arc<AppState>) -> Router {
    let tokens = &state.tokens;

    let mut router = Router::new().layer(state.journal.layer());
    if !state.allowed_origins.is_empty() {
        router = router.layer(Cors::new(state.allowed_origins.iter().cloned()));
    }

    router
        .on(Method::Get, "/healthz", health::liveness)
        .on(Method::Get, "/readyz", health::readiness)
        .on(Method::Post, "/register", with_state(&state, api::register))
        .on(Method::Post, "/login", with_state(&state, api::login))
        .guarded(Method::Post, "/logout", tokens.authenticate(), with_state(&state, api::logout))
        .on(Method::Get, "/logs", state.journal.list_handler())
        .guarded(
            Method::Get,
            "/admin-dashboard",
            tokens.authorize(Role::Admin),
            with_state(&state, api::admin_dashboard),
        )
        .guarded(
            Method::Get,
            "/api/user-details/{id}",
            tokens.authenticate(),
            with_state(&state, api::user_details),
        )
        .guarded(
            Method::Put,
            "/api/user-details/{id}",
            tokens.authenticate(),
            with_state(&state, api::update_user_details),
        )
        .guarded(
            Method::Post,
            "/api/user-details/{id}/image",
            tokens.authenticate(),
            with_state(&state, api::upload_image),
        )
        .guarded(
            Method::Get,
            "/api/user-details/{id}/image",
            tokens.authenticate(),
            with_state(&state, api::user_image),
        )
        .on(Method::Get, "/api/products", with_state(&state, api::list_products))
        .on(Method::Get, "/api/products/{id}", with_state(&state, api::product))
        .guarded(Method::Post, "/orders", tokens.authenticate(), with_state(&state, api::place_order))
        .guarded(Method::Get, "/orders/{id}", tokens.authenticate(), with_state(&state, api::user_orders))
        .guarded(Method::Get, "/users", tokens.authorize(Role::Admin), with_state(&state, api::list_users))
        .guarded(
            Method::Put,
            "/users/{id}",
            tokens.authorize(Role::Admin),
            with_state(&state, api::update_user_details),
        )
        .guarded(
            Method::Delete,
            "/users/{id}",
            tokens.authorize(Role::Admin),
            with_state(&state, api::delete_user),
        )
}
