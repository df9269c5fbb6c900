//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted: `Response::status()`,
//! `Response::builder().status()`, or as a bare handler return value.
//!
//! ```rust
//! use brewgate::{Response, Status};
//!
//! Response::status(Status::NoContent);
//!
//! async fn logout(_req: brewgate::Request) -> Status {
//!     Status::NoContent
//! }
//! ```

/// The status codes this service emits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Ok,                   // 200
    Created,              // 201
    NoContent,            // 204
    BadRequest,           // 400
    Unauthorized,         // 401
    Forbidden,            // 403
    NotFound,             // 404
    MethodNotAllowed,     // 405
    Conflict,             // 409
    PayloadTooLarge,      // 413
    /// nginx's non-standard 499: the client went away before the response
    /// was written. Only ever recorded, never sent.
    ClientClosedRequest,  // 499
    InternalServerError,  // 500
    ServiceUnavailable,   // 503
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Self::Ok                   => 200,
            Self::Created              => 201,
            Self::NoContent            => 204,
            Self::BadRequest           => 400,
            Self::Unauthorized         => 401,
            Self::Forbidden            => 403,
            Self::NotFound             => 404,
            Self::MethodNotAllowed     => 405,
            Self::Conflict             => 409,
            Self::PayloadTooLarge      => 413,
            Self::ClientClosedRequest  => 499,
            Self::InternalServerError  => 500,
            Self::ServiceUnavailable   => 503,
        }
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 { s.code() }
}
