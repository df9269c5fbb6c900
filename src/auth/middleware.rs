use std::sync::Arc;

use tracing::{debug, warn};

use super::claims::{Identity, Role};
use super::error::AuthError;
use super::token::TokenService;
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::IntoResponse;

/// The credential from `Authorization: Bearer <token>`, if one was sent.
/// The scheme is matched case-insensitively.
pub fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.header("authorization")?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Verifies the bearer token and attaches the caller's [`Identity`].
pub struct Authenticate {
    tokens: Arc<TokenService>,
}

impl Authenticate {
    pub(crate) fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl Middleware for Authenticate {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        guard(&self.tokens, None, req, next)
    }
}

/// [`Authenticate`], then rejects callers whose role is not `required`.
pub struct Authorize {
    tokens: Arc<TokenService>,
    required: Role,
}

impl Authorize {
    pub(crate) fn new(tokens: Arc<TokenService>, required: Role) -> Self {
        Self { tokens, required }
    }
}

impl Middleware for Authorize {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        guard(&self.tokens, Some(self.required), req, next)
    }
}

fn guard(tokens: &TokenService, required: Option<Role>, mut req: Request, next: Next) -> BoxFuture {
    // Verification is synchronous, so it happens before the future is built
    // and no token outlives this call.
    let checked = tokens
        .verify(bearer_token(&req))
        .and_then(|identity| match required {
            Some(role) if identity.role != role => Err(AuthError::Forbidden),
            _ => Ok(identity),
        });

    match checked {
        Ok(identity) => {
            debug!(subject_id = identity.subject_id, role = %identity.role, path = req.path(), "authenticated");
            req.extensions_mut().insert::<Identity>(identity);
            Box::pin(next.run(req))
        }
        Err(e) => {
            warn!(path = req.path(), reason = %e, "request rejected");
            Box::pin(async move { e.into_response() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use crate::response::Response;
    use crate::router::Router;
    use secrecy::SecretString;

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(&SecretString::from("middleware-secret".to_owned())))
    }

    async fn whoami(req: Request) -> Response {
        match Identity::of(&req) {
            Some(id) => Response::text(format!("{}:{}", id.subject_id, id.role)),
            None => Response::text("anonymous"),
        }
    }

    fn get(path: &str, token: Option<&str>) -> Request {
        let req = Request::new(http::Method::GET, path);
        match token {
            Some(t) => req.header_value("Authorization", &format!("Bearer {t}")),
            None => req,
        }
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let req = Request::new(http::Method::GET, "/").header_value("authorization", "bearer abc");
        assert_eq!(bearer_token(&req), Some("abc"));
    }

    #[test]
    fn other_schemes_are_ignored() {
        let req = Request::new(http::Method::GET, "/").header_value("authorization", "Basic abc");
        assert_eq!(bearer_token(&req), None);
        let req = Request::new(http::Method::GET, "/").header_value("authorization", "Bearer ");
        assert_eq!(bearer_token(&req), None);
    }

    #[tokio::test]
    async fn authenticate_attaches_identity() {
        let tokens = tokens();
        let token = tokens.issue(7, Role::User).unwrap();
        let router = Router::new().guarded(Method::Get, "/me", tokens.authenticate(), whoami);

        let res = router.handle(get("/me", Some(&token))).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), b"7:user");
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let tokens = tokens();
        let router = Router::new().guarded(Method::Get, "/me", tokens.authenticate(), whoami);

        let res = router.handle(get("/me", None)).await;
        assert_eq!(res.status_code(), 401);
    }

    #[tokio::test]
    async fn authorize_admin_rejects_user_with_403() {
        let tokens = tokens();
        let token = tokens.issue(7, Role::User).unwrap();
        let router = Router::new()
            .guarded(Method::Get, "/admin", tokens.authorize(Role::Admin), whoami);

        let res = router.handle(get("/admin", Some(&token))).await;
        assert_eq!(res.status_code(), 403);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["message"], "insufficient role");
    }

    #[tokio::test]
    async fn authorize_admin_accepts_admin() {
        let tokens = tokens();
        let token = tokens.issue(1, Role::Admin).unwrap();
        let router = Router::new()
            .guarded(Method::Get, "/admin", tokens.authorize(Role::Admin), whoami);

        let res = router.handle(get("/admin", Some(&token))).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.body(), b"1:admin");
    }

    #[tokio::test]
    async fn forged_token_is_401_even_for_matching_role() {
        let forged = TokenService::new(&SecretString::from("other".to_owned()))
            .issue(1, Role::Admin)
            .unwrap();
        let tokens = tokens();
        let router = Router::new()
            .guarded(Method::Get, "/admin", tokens.authorize(Role::Admin), whoami);

        let res = router.handle(get("/admin", Some(&forged))).await;
        assert_eq!(res.status_code(), 401);
    }
}
