//! Bearer-token authentication and role gating.
//!
//! [`TokenService`] issues HS256 tokens carrying `{subject_id, role}` that
//! expire one hour after issuance, and verifies them on the way back in.
//! Its two middleware constructors guard routes:
//!
//! - [`TokenService::authenticate`]: any valid token; the caller's
//!   [`Identity`] is attached to the request.
//! - [`TokenService::authorize`]: as above, and the token's role must equal
//!   the one required.
//!
//! Failures never reach the handler. They become a JSON `{"message": ...}`
//! response: 401 when the caller's identity cannot be established
//! (missing, forged, expired or revoked token), 403 when it can but the role
//! is wrong.

mod claims;
mod denylist;
mod error;
mod middleware;
mod token;

pub use claims::{Claims, Identity, Role};
pub use denylist::Denylist;
pub use error::AuthError;
pub use middleware::{bearer_token, Authenticate, Authorize};
pub use token::{TokenService, TOKEN_TTL_SECS};
