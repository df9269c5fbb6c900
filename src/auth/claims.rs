use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// What a subject is allowed to do.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verified caller of the current request.
///
/// Attached to the request's extensions by the auth middleware; handlers
/// read it with [`Identity::of`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Identity {
    pub subject_id: u64,
    pub role: Role,
}

impl Identity {
    pub fn of(req: &crate::Request) -> Option<Identity> {
        req.extensions().get::<Identity>().copied()
    }

    /// True when this identity may act on `subject_id`'s records: its own,
    /// or anyone's for an admin.
    pub fn may_access(&self, subject_id: u64) -> bool {
        self.role == Role::Admin || self.subject_id == subject_id
    }
}

/// Claims carried inside an identity token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id, decimal.
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    /// Token id, the key for revocation.
    pub jti: String,
}

impl Claims {
    pub(crate) fn new(subject_id: u64, role: Role, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: subject_id.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// `None` if `sub` is not a numeric id, which no token we issued has.
    pub fn identity(&self) -> Option<Identity> {
        let subject_id = self.sub.parse().ok()?;
        Some(Identity { subject_id, role: self.role })
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);
        assert_eq!(serde_json::from_str::<Role>(r#""user""#).unwrap(), Role::User);
        assert!(serde_json::from_str::<Role>(r#""root""#).is_err());
    }

    #[test]
    fn claims_span_the_ttl() {
        let now = Utc::now();
        let claims = Claims::new(7, Role::User, now, Duration::hours(1));
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.identity(), Some(Identity { subject_id: 7, role: Role::User }));
    }

    #[test]
    fn token_ids_are_unique() {
        let now = Utc::now();
        let a = Claims::new(1, Role::User, now, Duration::hours(1));
        let b = Claims::new(1, Role::User, now, Duration::hours(1));
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn admins_may_access_anyone() {
        let admin = Identity { subject_id: 1, role: Role::Admin };
        let user = Identity { subject_id: 2, role: Role::User };
        assert!(admin.may_access(2));
        assert!(user.may_access(2));
        assert!(!user.may_access(3));
    }
}
