use thiserror::Error;
use tracing::error;

use crate::response::{IntoResponse, Response};
use crate::status::Status;

/// Why a request's identity was not accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    /// Bad signature, wrong algorithm, or not a token at all.
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("token revoked")]
    Revoked,

    #[error("insufficient role")]
    Forbidden,

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// Every identity failure is a 401; a known caller lacking the role is a
    /// 403. Signing is our fault, so 500.
    pub fn status(&self) -> Status {
        match self {
            Self::MissingToken | Self::InvalidSignature | Self::Expired | Self::Revoked => {
                Status::Unauthorized
            }
            Self::Forbidden => Status::Forbidden,
            Self::Signing(_) => Status::InternalServerError,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidSignature,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Signing(reason) = &self {
            error!(%reason, "token signing failed");
            return Response::message(self.status(), "internal error");
        }
        Response::message(self.status(), &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_failures_are_unauthorized() {
        for e in [AuthError::MissingToken, AuthError::InvalidSignature, AuthError::Expired, AuthError::Revoked] {
            assert_eq!(e.into_response().status_code(), 401);
        }
        assert_eq!(AuthError::Forbidden.into_response().status_code(), 403);
    }

    #[test]
    fn signing_failure_does_not_leak_details() {
        let res = AuthError::Signing("key material bad".into()).into_response();
        assert_eq!(res.status_code(), 500);
        assert!(!String::from_utf8_lossy(res.body()).contains("key material"));
    }

    #[test]
    fn jwt_expiry_maps_to_expired() {
        let err = jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::ExpiredSignature);
        assert_eq!(AuthError::from(err), AuthError::Expired);

        let err = jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidToken);
        assert_eq!(AuthError::from(err), AuthError::InvalidSignature);
    }
}
