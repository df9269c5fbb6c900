//! User records: the data-store side the auth core leans on.
//!
//! The auth core never looks users up itself. Login asks a
//! [`UserDirectory`] to check credentials and turns the record it gets back
//! into a token; profile routes read and update records through it.
//! [`MemoryDirectory`] keeps everything in process and is what the binary
//! and the tests run against.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tokio::task;

use crate::auth::Role;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// A stored user, minus credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub phone: String,
    pub role: Role,
}

/// Partial update; `None` fields are left alone.
#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<UserRecord, DirectoryError>;

    /// The user with this email if `password` is theirs. A wrong password
    /// and an unknown email both yield `Ok(None)`.
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, DirectoryError>;

    async fn find(&self, id: u64) -> Result<Option<UserRecord>, DirectoryError>;

    /// Every user, by ascending id.
    async fn list(&self) -> Result<Vec<UserRecord>, DirectoryError>;

    /// The updated record, or `None` if there is no such user.
    async fn update(&self, id: u64, update: UserUpdate) -> Result<Option<UserRecord>, DirectoryError>;

    /// `false` if there was no such user.
    async fn delete(&self, id: u64) -> Result<bool, DirectoryError>;
}

/// Work factor used by [`MemoryDirectory::new`].
pub const BCRYPT_COST: u32 = 10;

struct StoredUser {
    record: UserRecord,
    password_hash: String,
}

/// In-process [`UserDirectory`]. Passwords are stored as bcrypt hashes.
/// Emails are matched case-insensitively. Ids are never reused.
pub struct MemoryDirectory {
    users: RwLock<BTreeMap<u64, StoredUser>>,
    next_id: RwLock<u64>,
    cost: u32,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::with_cost(BCRYPT_COST)
    }

    /// A directory hashing at bcrypt work factor `cost` (4 to 31).
    pub fn with_cost(cost: u32) -> Self {
        Self { users: RwLock::default(), next_id: RwLock::new(1), cost }
    }
}

/// bcrypt is deliberately slow, so it runs off the async workers.
async fn hash_password(password: String, cost: u32) -> Result<String, DirectoryError> {
    task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| DirectoryError::Unavailable(e.to_string()))?
        .map_err(|e| DirectoryError::Unavailable(e.to_string()))
}

async fn verify_password(password: String, hash: String) -> Result<bool, DirectoryError> {
    task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| DirectoryError::Unavailable(e.to_string()))?
        .map_err(|e| DirectoryError::Unavailable(e.to_string()))
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn create(&self, user: NewUser) -> Result<UserRecord, DirectoryError> {
        let password_hash = hash_password(user.password, self.cost).await?;

        let mut users = self.users.write();
        if users.values().any(|u| u.record.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DirectoryError::DuplicateEmail);
        }

        let id = {
            let mut next = self.next_id.write();
            let id = *next;
            *next += 1;
            id
        };
        let record = UserRecord {
            id,
            name: user.name,
            email: user.email,
            address: user.address,
            phone: user.phone,
            role: user.role,
            created_at: Utc::now(),
        };

        users.insert(id, StoredUser { record: record.clone(), password_hash });
        Ok(record)
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let found = self.users.read()
            .values()
            .find(|u| u.record.email.eq_ignore_ascii_case(email))
            .map(|u| (u.record.clone(), u.password_hash.clone()));

        let Some((record, hash)) = found else {
            return Ok(None);
        };
        let matches = verify_password(password.to_owned(), hash).await?;
        Ok(matches.then_some(record))
    }

    async fn find(&self, id: u64) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.users.read().get(&id).map(|u| u.record.clone()))
    }

    async fn list(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        Ok(self.users.read().values().map(|u| u.record.clone()).collect())
    }

    async fn update(&self, id: u64, update: UserUpdate) -> Result<Option<UserRecord>, DirectoryError> {
        let mut users = self.users.write();

        if let Some(email) = &update.email {
            let taken = users.iter().any(|(&other, u)| other != id && u.record.email.eq_ignore_ascii_case(email));
            if taken {
                return Err(DirectoryError::DuplicateEmail);
            }
        }

        let Some(stored) = users.get_mut(&id) else {
            return Ok(None);
        };
        let record = &mut stored.record;
        if let Some(name) = update.name { record.name = name; }
        if let Some(email) = update.email { record.email = email; }
        if let Some(address) = update.address { record.address = address; }
        if let Some(phone) = update.phone { record.phone = phone; }
        if let Some(role) = update.role { record.role = role; }

        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: u64) -> Result<bool, DirectoryError> {
        Ok(self.users.write().remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> NewUser {
        NewUser {
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password: "espresso".into(),
            address: "1 Bean St".into(),
            phone: "555-0100".into(),
            role: Role::User,
        }
    }

    fn directory() -> MemoryDirectory {
        MemoryDirectory::with_cost(4)
    }

    #[tokio::test]
    async fn ids_are_sequential() {
        let dir = directory();
        let a = dir.create(alice()).await.unwrap();
        let b = dir.create(NewUser { email: "bob@example.com".into(), ..alice() }).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let dir = directory();
        dir.create(alice()).await.unwrap();
        let dup = NewUser { email: "ALICE@example.com".into(), ..alice() };
        assert_eq!(dir.create(dup).await, Err(DirectoryError::DuplicateEmail));
    }

    #[tokio::test]
    async fn credentials_check_password() {
        let dir = directory();
        let created = dir.create(alice()).await.unwrap();

        let ok = dir.verify_credentials("alice@example.com", "espresso").await.unwrap();
        assert_eq!(ok, Some(created));
        assert_eq!(dir.verify_credentials("alice@example.com", "decaf").await.unwrap(), None);
        assert_eq!(dir.verify_credentials("nobody@example.com", "espresso").await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_touches_only_given_fields() {
        let dir = directory();
        let created = dir.create(alice()).await.unwrap();

        let update = UserUpdate { phone: Some("555-0199".into()), ..UserUpdate::default() };
        let updated = dir.update(created.id, update).await.unwrap().unwrap();

        assert_eq!(updated.phone, "555-0199");
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.email, created.email);
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_none() {
        let dir = directory();
        assert_eq!(dir.update(9, UserUpdate::default()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn password_is_stored_as_bcrypt() {
        let dir = directory();
        let created = dir.create(alice()).await.unwrap();

        let users = dir.users.read();
        let hash = &users[&created.id].password_hash;
        assert!(hash.starts_with("$2"), "{hash}");
        assert!(!hash.contains("espresso"));
        assert!(bcrypt::verify("espresso", hash).unwrap());
    }

    #[tokio::test]
    async fn deleted_user_is_gone_and_id_not_reused() {
        let dir = directory();
        let a = dir.create(alice()).await.unwrap();
        assert!(dir.delete(a.id).await.unwrap());
        assert!(!dir.delete(a.id).await.unwrap());
        assert_eq!(dir.find(a.id).await.unwrap(), None);
        assert_eq!(dir.verify_credentials("alice@example.com", "espresso").await.unwrap(), None);

        let again = dir.create(alice()).await.unwrap();
        assert_ne!(again.id, a.id);
    }

    #[tokio::test]
    async fn list_is_ordered_by_id() {
        let dir = directory();
        dir.create(alice()).await.unwrap();
        dir.create(NewUser { email: "bob@example.com".into(), ..alice() }).await.unwrap();
        let ids: Vec<u64> = dir.list().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, [1, 2]);
    }

    #[tokio::test]
    async fn update_cannot_steal_an_email() {
        let dir = directory();
        dir.create(alice()).await.unwrap();
        let bob = dir.create(NewUser { email: "bob@example.com".into(), ..alice() }).await.unwrap();

        let update = UserUpdate { email: Some("alice@example.com".into()), ..UserUpdate::default() };
        assert_eq!(dir.update(bob.id, update).await, Err(DirectoryError::DuplicateEmail));
    }
}
