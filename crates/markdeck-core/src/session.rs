// Who is signed in, and how to get a bearer token for them
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::events::{AppEvent, EventBus};
use crate::token_store::TokenStore;
use crate::{Error, Result};

/// Identity as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
}

/// The identity provider behind sign-in
///
/// Implementations own the provider protocol; the rest of the app only sees
/// a [`User`] and, per request, a bearer token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self) -> Result<User>;
    async fn sign_out(&self) -> Result<()>;
    /// A currently valid ID token for `user`
    async fn id_token(&self, user: &User) -> Result<String>;
}

/// Holds the current session; the only owner of the [`User`]
pub struct SessionHolder {
    provider: Arc<dyn IdentityProvider>,
    user: Option<User>,
    events: EventBus,
}

impl SessionHolder {
    pub fn new(provider: Arc<dyn IdentityProvider>, events: EventBus) -> Self {
        Self {
            provider,
            user: None,
            events,
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Run the provider's sign-in; failures are logged and leave no session
    pub async fn sign_in(&mut self) -> Option<User> {
        match self.provider.sign_in().await {
            Ok(user) => {
                info!("Signed in as {}", user.uid);
                self.user = Some(user.clone());
                self.events.publish(AppEvent::SignedIn);
                Some(user)
            }
            Err(e) => {
                error!("Sign-in failed: {}", e);
                None
            }
        }
    }

    /// End the session; provider failures go back to the caller
    pub async fn sign_out(&mut self) -> Result<()> {
        if let Err(e) = self.provider.sign_out().await {
            error!("Sign-out failed: {}", e);
            return Err(e);
        }

        if let Some(user) = self.user.take() {
            info!("Signed out {}", user.uid);
        }
        self.events.publish(AppEvent::SignedOut);
        Ok(())
    }

    /// Bearer token for the current user, or `Unauthenticated`
    pub async fn token(&self) -> Result<String> {
        let user = self.user.as_ref().ok_or(Error::Unauthenticated)?;
        self.provider.id_token(user).await
    }

    /// Like [`token`](Self::token), but no session is `None` rather than an error
    pub async fn optional_token(&self) -> Result<Option<String>> {
        match &self.user {
            Some(user) => self.provider.id_token(user).await.map(Some),
            None => Ok(None),
        }
    }
}

/// Identity provider backed by a token saved with `markdeck login`
pub struct StoredTokenProvider {
    store_path: PathBuf,
    profile: String,
}

impl StoredTokenProvider {
    pub fn new(store_path: impl Into<PathBuf>, profile: impl Into<String>) -> Self {
        Self {
            store_path: store_path.into(),
            profile: profile.into(),
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Save a token for this profile
    pub fn store_token(&self, token: &str, account: Option<&str>, valid_for_days: u64) -> Result<()> {
        let mut store = TokenStore::load_from(&self.store_path)?;
        store.set_token(&self.profile, token, account, valid_for_days)?;
        store.save_to(&self.store_path)?;
        info!("Stored credentials for profile '{}'", self.profile);
        Ok(())
    }

    /// Days left on the stored token, if any
    pub fn days_remaining(&self) -> Result<Option<i64>> {
        let store = TokenStore::load_from(&self.store_path)?;
        Ok(store.days_remaining(&self.profile))
    }
}

#[async_trait]
impl IdentityProvider for StoredTokenProvider {
    async fn sign_in(&self) -> Result<User> {
        let store = TokenStore::load_from(&self.store_path)?;
        let credentials = store.get(&self.profile).ok_or_else(|| {
            Error::AuthError(format!(
                "no valid credentials for profile '{}'; run `markdeck login --token <TOKEN>`",
                self.profile
            ))
        })?;

        Ok(User {
            uid: self.profile.clone(),
            email: credentials.account,
        })
    }

    async fn sign_out(&self) -> Result<()> {
        let mut store = TokenStore::load_from(&self.store_path)?;
        if store.remove_token(&self.profile) {
            store.save_to(&self.store_path)?;
        } else {
            warn!("No stored credentials for profile '{}'", self.profile);
        }
        Ok(())
    }

    async fn id_token(&self, user: &User) -> Result<String> {
        let store = TokenStore::load_from(&self.store_path)?;
        store.get_token(&user.uid).ok_or(Error::Unauthenticated)
    }
}
