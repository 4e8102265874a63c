//! Credential providers.
//!
//! Components that need an access token (REST calls, authenticated hub
//! joins) receive a [`CredentialProvider`] instead of reading ambient
//! storage, so each can be exercised in isolation.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::AuthSession;

/// Supplies the current access token, if any.
pub trait CredentialProvider: Send + Sync + std::fmt::Debug {
    /// Returns the bearer token to attach to outgoing requests.
    fn access_token(&self) -> Option<String>;
}

/// Shared credential provider handle.
pub type SharedCredentials = Arc<dyn CredentialProvider>;

/// A fixed token, e.g. read once from the environment.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Creates a provider for the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

/// In-memory session credentials updated by login and logout.
#[derive(Debug, Default)]
pub struct SessionCredentials {
    session: RwLock<Option<AuthSession>>,
}

impl SessionCredentials {
    /// Creates an empty (logged out) provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a session after a successful login.
    pub fn sign_in(&self, session: AuthSession) {
        *self.session.write() = Some(session);
    }

    /// Forgets the stored session.
    pub fn sign_out(&self) {
        *self.session.write() = None;
    }

    /// Returns the display name of the signed-in user.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        self.session
            .read()
            .as_ref()
            .and_then(|s| s.display_name.clone())
    }
}

impl CredentialProvider for SessionCredentials {
    fn access_token(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.token.clone())
    }
}
