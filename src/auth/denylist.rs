//! Revoked token ids.
//!
//! Tokens are otherwise stateless: nothing server-side can take one back
//! before it expires. Attaching a [`Denylist`] to the
//! [`TokenService`](super::TokenService) adds that ability. An id only needs
//! to stay listed until the token it names would have expired anyway, so
//! each revocation sweeps out entries past their expiry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

#[derive(Default)]
pub struct Denylist {
    revoked: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Denylist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists `jti` until `expires_at`.
    pub fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) {
        let now = Utc::now();
        let mut revoked = self.revoked.lock();
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(jti.to_owned(), expires_at);
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.lock().contains_key(jti)
    }

    pub fn len(&self) -> usize {
        self.revoked.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.revoked.lock().is_empty()
    }
}
