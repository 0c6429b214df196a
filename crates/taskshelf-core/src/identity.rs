//! Identity service seam and a local, store-backed implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::User;
use crate::store::{CollectionPath, DocumentStore, Query, StoreError, decode, encode};

pub const ACCOUNTS: &str = "accounts";
pub const MIN_PASSWORD_LEN: usize = 6;

/// Messages are user-facing and shown verbatim.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("password should be at least 6 characters")]
    WeakPassword,
    #[error("email already in use: {0}")]
    EmailInUse(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("session expired; sign in again")]
    SessionExpired,
    #[error("identity backend failure: {0}")]
    Backend(#[from] StoreError),
}

pub type SessionListener = Box<dyn FnMut(Option<&User>)>;

pub trait IdentityService {
    /// Registers an account. The new account is not signed in.
    fn create_account(&mut self, email: &str, password: &str) -> Result<User, IdentityError>;

    fn sign_in(&mut self, email: &str, password: &str) -> Result<User, IdentityError>;

    fn sign_out(&mut self) -> Result<(), IdentityError>;

    fn current_user(&self) -> Option<&User>;

    /// Listener fires on every session change with the new user, or `None`.
    fn subscribe(&mut self, listener: SessionListener);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountDoc {
    email: String,
    salt: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// Accounts kept as documents in their own store.
pub struct LocalIdentity<S> {
    store: S,
    current: Option<User>,
    listeners: Vec<SessionListener>,
}

impl<S: DocumentStore> LocalIdentity<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            current: None,
            listeners: vec![],
        }
    }

    /// Re-attaches a session persisted by an earlier process.
    #[tracing::instrument(skip(self, user), fields(uid = %user.uid))]
    pub fn resume(&mut self, user: User) -> Result<User, IdentityError> {
        let accounts = CollectionPath::root(ACCOUNTS)?;
        let path = accounts.doc(&user.uid);
        let Some(doc) = self.store.get(&path)? else {
            warn!("persisted session refers to a missing account");
            return Err(IdentityError::SessionExpired);
        };
        let account: AccountDoc = decode(&path, &doc.fields)?;
        let user = User {
            uid: doc.id,
            email: account.email,
        };
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    fn find_account(&self, email: &str) -> Result<Option<(String, AccountDoc)>, IdentityError> {
        let accounts = CollectionPath::root(ACCOUNTS)?;
        let found = self
            .store
            .query(&accounts, &Query::all().where_eq("email", email))?;
        match found.into_iter().next() {
            Some(doc) => {
                let account = decode(&accounts.doc(&doc.id), &doc.fields)?;
                Ok(Some((doc.id, account)))
            }
            None => Ok(None),
        }
    }

    fn set_current(&mut self, user: Option<User>) {
        self.current = user;
        debug!(listeners = self.listeners.len(), "notifying session listeners");
        for listener in &mut self.listeners {
            listener(self.current.as_ref());
        }
    }
}

impl<S: DocumentStore> IdentityService for LocalIdentity<S> {
    #[tracing::instrument(skip(self, password))]
    fn create_account(&mut self, email: &str, password: &str) -> Result<User, IdentityError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword);
        }
        if self.find_account(&email)?.is_some() {
            return Err(IdentityError::EmailInUse(email));
        }

        let salt = uuid::Uuid::new_v4().simple().to_string();
        let doc = AccountDoc {
            password_hash: hash_password(&salt, password),
            salt,
            email: email.clone(),
            created_at: Utc::now(),
        };
        let uid = self
            .store
            .add(&CollectionPath::root(ACCOUNTS)?, encode(&doc)?)?;
        info!(uid = %uid, "created account");
        Ok(User { uid, email })
    }

    #[tracing::instrument(skip(self, password))]
    fn sign_in(&mut self, email: &str, password: &str) -> Result<User, IdentityError> {
        let email = normalize_email(email)?;
        let Some((uid, account)) = self.find_account(&email)? else {
            return Err(IdentityError::InvalidCredentials);
        };
        if hash_password(&account.salt, password) != account.password_hash {
            return Err(IdentityError::InvalidCredentials);
        }

        let user = User {
            uid,
            email: account.email,
        };
        info!(uid = %user.uid, "signed in");
        self.set_current(Some(user.clone()));
        Ok(user)
    }

    fn sign_out(&mut self) -> Result<(), IdentityError> {
        if let Some(user) = &self.current {
            info!(uid = %user.uid, "signed out");
        }
        self.set_current(None);
        Ok(())
    }

    fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    fn subscribe(&mut self, listener: SessionListener) {
        self.listeners.push(listener);
    }
}

fn normalize_email(raw: &str) -> Result<String, IdentityError> {
    let email = raw.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(email)
        }
        _ => Err(IdentityError::InvalidEmail(raw.trim().to_string())),
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{IdentityError, IdentityService, LocalIdentity};
    use crate::store::MemoryStore;

    #[test]
    fn sign_up_then_sign_in_with_case_insensitive_email() {
        let mut identity = LocalIdentity::new(MemoryStore::new());
        let created = identity
            .create_account("Ann@Example.com ", "secret1")
            .expect("create account");
        assert_eq!(created.email, "ann@example.com");
        assert!(identity.current_user().is_none());

        let user = identity
            .sign_in("ann@example.com", "secret1")
            .expect("sign in");
        assert_eq!(user.uid, created.uid);
        assert_eq!(identity.current_user(), Some(&user));
    }

    #[test]
    fn rejects_bad_input_with_readable_messages() {
        let mut identity = LocalIdentity::new(MemoryStore::new());
        let err = identity
            .create_account("nobody", "secret1")
            .expect_err("invalid email");
        assert_eq!(err.to_string(), "invalid email address: nobody");

        assert!(matches!(
            identity.create_account("a@b.c", "123"),
            Err(IdentityError::WeakPassword)
        ));

        identity
            .create_account("a@b.c", "secret1")
            .expect("create account");
        assert!(matches!(
            identity.create_account("A@B.C", "secret2"),
            Err(IdentityError::EmailInUse(_))
        ));
        assert!(matches!(
            identity.sign_in("a@b.c", "wrong-pass"),
            Err(IdentityError::InvalidCredentials)
        ));
        assert!(matches!(
            identity.sign_in("x@b.c", "secret1"),
            Err(IdentityError::InvalidCredentials)
        ));
    }

    #[test]
    fn listeners_observe_sign_in_and_sign_out() {
        let mut identity = LocalIdentity::new(MemoryStore::new());
        let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::default();
        let sink = Rc::clone(&seen);
        identity.subscribe(Box::new(move |user| {
            sink.borrow_mut().push(user.map(|u| u.email.clone()));
        }));

        identity
            .create_account("a@b.c", "secret1")
            .expect("create account");
        identity.sign_in("a@b.c", "secret1").expect("sign in");
        identity.sign_out().expect("sign out");

        assert_eq!(
            *seen.borrow(),
            vec![Some("a@b.c".to_string()), None]
        );
    }

    #[test]
    fn resume_requires_existing_account() {
        let mut identity = LocalIdentity::new(MemoryStore::new());
        let user = identity
            .create_account("a@b.c", "secret1")
            .expect("create account");
        assert_eq!(identity.resume(user.clone()).expect("resume"), user);

        let mut other = LocalIdentity::new(MemoryStore::new());
        assert!(matches!(
            other.resume(user),
            Err(IdentityError::SessionExpired)
        ));
    }
}
