//! HTTP method as a typed enum.
//!
//! Only the RFC 9110 methods are routable. Anything else hyper hands us
//! (WebDAV verbs, `PURGE`, custom extensions) is answered with
//! `405 Method Not Allowed` by the router before it reaches a handler.

use std::fmt;

/// A routable HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }
}

/// Maps hyper's open-ended method onto the routable set.
impl TryFrom<&http::Method> for Method {
    type Error = ();

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        match *m {
            http::Method::CONNECT => Ok(Self::Connect),
            http::Method::DELETE  => Ok(Self::Delete),
            http::Method::GET     => Ok(Self::Get),
            http::Method::HEAD    => Ok(Self::Head),
            http::Method::OPTIONS => Ok(Self::Options),
            http::Method::PATCH   => Ok(Self::Patch),
            http::Method::POST    => Ok(Self::Post),
            http::Method::PUT     => Ok(Self::Put),
            http::Method::TRACE   => Ok(Self::Trace),
            _                     => Err(()),
        }
    }
}

impl From<Method> for http::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Connect => http::Method::CONNECT,
            Method::Delete  => http::Method::DELETE,
            Method::Get     => http::Method::GET,
            Method::Head    => http::Method::HEAD,
            Method::Options => http::Method::OPTIONS,
            Method::Patch   => http::Method::PATCH,
            Method::Post    => http::Method::POST,
            Method::Put     => http::Method::PUT,
            Method::Trace   => http::Method::TRACE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
