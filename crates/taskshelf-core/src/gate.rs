use std::sync::mpsc::{self, Receiver};

use tracing::debug;

use crate::identity::{IdentityError, IdentityService};
use crate::model::User;
use crate::store::DocumentStore;
use crate::workspace::Workspace;

pub const ACCOUNT_CREATED: &str = "Account created! You can now sign in.";

/// Credential form in front of the workspace.
///
/// Session changes reported by the identity service are queued and replayed
/// into a [`Workspace`] by [`AuthGate::sync`].
pub struct AuthGate<I> {
    identity: I,
    changes: Receiver<Option<User>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

impl<I: IdentityService> AuthGate<I> {
    pub fn new(mut identity: I) -> Self {
        let (tx, changes) = mpsc::channel();
        identity.subscribe(Box::new(move |user| {
            if tx.send(user.cloned()).is_err() {
                debug!("auth gate dropped; session change ignored");
            }
        }));
        Self { identity, changes }
    }

    pub fn identity_mut(&mut self) -> &mut I {
        &mut self.identity
    }

    pub fn current_user(&self) -> Option<&User> {
        self.identity.current_user()
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.current_user().is_some()
    }

    /// Runs the form in the given mode. Sign-up yields a notice for the
    /// user; sign-in yields nothing and reports through the session
    /// listener.
    pub fn submit(
        &mut self,
        mode: AuthMode,
        email: &str,
        password: &str,
    ) -> Result<Option<&'static str>, IdentityError> {
        match mode {
            AuthMode::SignUp => {
                self.identity.create_account(email, password)?;
                Ok(Some(ACCOUNT_CREATED))
            }
            AuthMode::SignIn => {
                self.identity.sign_in(email, password)?;
                Ok(None)
            }
        }
    }

    pub fn sign_out(&mut self) -> Result<(), IdentityError> {
        self.identity.sign_out()
    }

    /// Replays queued session changes into the workspace, in order.
    pub fn sync<S: DocumentStore>(&mut self, workspace: &mut Workspace<S>) -> usize {
        let mut applied = 0;
        while let Ok(change) = self.changes.try_recv() {
            workspace.apply_session(change);
            applied += 1;
        }
        applied
    }
}
