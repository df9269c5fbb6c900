use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::claims::{Claims, Identity, Role};
use super::denylist::Denylist;
use super::error::AuthError;
use super::middleware::{Authenticate, Authorize};

/// How long an identity token stays valid after issuance.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Issues and verifies HS256 identity tokens signed with one shared secret.
///
/// Stateless unless a [`Denylist`] is attached: authority comes from the
/// signature and the embedded claims alone.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    denylist: Option<Arc<Denylist>>,
}

impl TokenService {
    pub fn new(secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            denylist: None,
        }
    }

    #[must_use]
    pub fn with_denylist(mut self, denylist: Arc<Denylist>) -> Self {
        self.denylist = Some(denylist);
        self
    }

    /// A token for `subject_id` acting as `role`, valid for one hour from now.
    pub fn issue(&self, subject_id: u64, role: Role) -> Result<String, AuthError> {
        self.issue_at(subject_id, role, Utc::now())
    }

    /// As [`issue`](Self::issue), counting the hour from `issued_at`.
    pub fn issue_at(
        &self,
        subject_id: u64,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims::new(subject_id, role, issued_at, Duration::seconds(TOKEN_TTL_SECS));
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Checks a presented token and returns who it speaks for.
    ///
    /// `None` or an empty string is [`AuthError::MissingToken`]. The
    /// signature is checked before expiry, so a forged expired token reports
    /// [`AuthError::InvalidSignature`].
    pub fn verify(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(AuthError::MissingToken)?;
        self.decode(token)?.identity().ok_or(AuthError::InvalidSignature)
    }

    /// Full claims of a valid, unrevoked token.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)?.claims;

        if self.denylist.as_ref().is_some_and(|d| d.is_revoked(&claims.jti)) {
            return Err(AuthError::Revoked);
        }
        Ok(claims)
    }

    /// Takes a valid token out of circulation before it expires.
    ///
    /// Without a denylist attached there is nowhere to record the
    /// revocation; the token is still verified and the call is a no-op.
    pub fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.decode(token)?;
        match (&self.denylist, claims.expires_at()) {
            (Some(denylist), Some(expires_at)) => {
                denylist.revoke(&claims.jti, expires_at);
                debug!(subject_id = %claims.sub, "token revoked");
            }
            _ => debug!(subject_id = %claims.sub, "no denylist attached, revocation skipped"),
        }
        Ok(())
    }

    /// Middleware requiring any valid token.
    pub fn authenticate(self: &Arc<Self>) -> Authenticate {
        Authenticate::new(Arc::clone(self))
    }

    /// Middleware requiring a valid token whose role is exactly `role`.
    pub fn authorize(self: &Arc<Self>, role: Role) -> Authorize {
        Authorize::new(Arc::clone(self), role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&SecretString::from(secret.to_owned()))
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = service("s3cret");
        let token = tokens.issue(7, Role::User).unwrap();
        assert_eq!(
            tokens.verify(Some(&token)),
            Ok(Identity { subject_id: 7, role: Role::User })
        );
    }

    #[test]
    fn absent_or_empty_token_is_missing() {
        let tokens = service("s3cret");
        assert_eq!(tokens.verify(None), Err(AuthError::MissingToken));
        assert_eq!(tokens.verify(Some("")), Err(AuthError::MissingToken));
    }

    #[test]
    fn token_past_its_hour_is_expired() {
        let tokens = service("s3cret");
        let issued = Utc::now() - Duration::minutes(61);
        let token = tokens.issue_at(7, Role::User, issued).unwrap();
        assert_eq!(tokens.verify(Some(&token)), Err(AuthError::Expired));
    }

    #[test]
    fn token_inside_its_hour_is_valid() {
        let tokens = service("s3cret");
        let issued = Utc::now() - Duration::minutes(59);
        let token = tokens.issue_at(7, Role::Admin, issued).unwrap();
        assert!(tokens.verify(Some(&token)).is_ok());
    }

    #[test]
    fn foreign_secret_is_invalid_signature() {
        let token = service("theirs").issue(7, Role::Admin).unwrap();
        assert_eq!(service("ours").verify(Some(&token)), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn forged_and_expired_reports_signature_first() {
        let issued = Utc::now() - Duration::hours(3);
        let token = service("theirs").issue_at(7, Role::Admin, issued).unwrap();
        assert_eq!(service("ours").verify(Some(&token)), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn garbage_is_invalid_signature() {
        let tokens = service("s3cret");
        assert_eq!(tokens.verify(Some("not.a.jwt")), Err(AuthError::InvalidSignature));
        assert_eq!(tokens.verify(Some("plain")), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn revoked_token_is_rejected() {
        let tokens = service("s3cret").with_denylist(Arc::new(Denylist::new()));
        let token = tokens.issue(3, Role::User).unwrap();
        let other = tokens.issue(3, Role::User).unwrap();

        tokens.revoke(&token).unwrap();

        assert_eq!(tokens.verify(Some(&token)), Err(AuthError::Revoked));
        assert!(tokens.verify(Some(&other)).is_ok());
    }

    #[test]
    fn revoke_without_denylist_is_a_noop() {
        let tokens = service("s3cret");
        let token = tokens.issue(3, Role::User).unwrap();
        tokens.revoke(&token).unwrap();
        assert!(tokens.verify(Some(&token)).is_ok());
    }

    #[test]
    fn revoking_an_invalid_token_fails() {
        let tokens = service("s3cret").with_denylist(Arc::new(Denylist::new()));
        assert_eq!(tokens.revoke("junk"), Err(AuthError::InvalidSignature));
    }

    proptest! {
        #[test]
        fn verify_returns_what_was_issued(subject_id in any::<u64>(), admin in any::<bool>()) {
            let tokens = service("property-secret");
            let role = if admin { Role::Admin } else { Role::User };
            let token = tokens.issue(subject_id, role).unwrap();
            prop_assert_eq!(tokens.verify(Some(&token)), Ok(Identity { subject_id, role }));
        }
    }
}
