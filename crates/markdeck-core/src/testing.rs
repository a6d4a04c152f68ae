// In-memory backend and session helpers for unit tests
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::backend::BookmarkBackend;
use crate::events::EventBus;
use crate::models::{BookmarkItem, FaviconFile};
use crate::session::{MockIdentityProvider, SessionHolder, User};
use crate::{Error, Result};

pub const TEST_TOKEN: &str = "test-token";

#[derive(Debug, Default)]
pub struct FakeState {
    pub bookmarks: Vec<BookmarkItem>,
    pub favorites: Vec<BookmarkItem>,
    pub obsolete: Vec<BookmarkItem>,
    /// Echo a server copy (id "srv-<n>") on add
    pub echo_favorite: bool,
    /// Every call fails with this message
    pub failure: Option<String>,
    /// Action endpoints answer with a non-success status
    pub reject_actions: bool,
    /// `(endpoint, token)` per call, in order
    pub calls: Vec<(String, Option<String>)>,
    pub uploads: Vec<(String, FaviconFile)>,
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    pub state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bookmarks(self, bookmarks: Vec<BookmarkItem>) -> Self {
        self.state.lock().unwrap().bookmarks = bookmarks;
        self
    }

    pub fn with_favorites(self, favorites: Vec<BookmarkItem>) -> Self {
        self.state.lock().unwrap().favorites = favorites;
        self
    }

    pub fn with_obsolete(self, obsolete: Vec<BookmarkItem>) -> Self {
        self.state.lock().unwrap().obsolete = obsolete;
        self
    }

    pub fn fail_with(&self, message: &str) {
        self.state.lock().unwrap().failure = Some(message.to_string());
    }

    pub fn recover(&self) {
        self.state.lock().unwrap().failure = None;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().calls.iter().map(|(_, t)| t.clone()).collect()
    }

    fn record(&self, call: String, token: Option<&str>) -> Result<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((call, token.map(str::to_string)));
        match &state.failure {
            Some(message) => Err(Error::RequestFailed(message.clone())),
            None => Ok(state),
        }
    }

    fn action(&self, call: &str, token: &str) -> Result<()> {
        let state = self.record(call.to_string(), Some(token))?;
        if state.reject_actions {
            return Err(Error::OperationRejected(format!("{} returned status 'error'", call)));
        }
        Ok(())
    }
}

#[async_trait]
impl BookmarkBackend for FakeBackend {
    async fn fetch_bookmarks(&self, token: &str) -> Result<Vec<BookmarkItem>> {
        Ok(self.record("GET /bookmarks".into(), Some(token))?.bookmarks.clone())
    }

    async fn fetch_favorites(&self, token: Option<&str>) -> Result<Vec<BookmarkItem>> {
        Ok(self.record("GET /favorites".into(), token)?.favorites.clone())
    }

    async fn add_favorite(
        &self,
        token: Option<&str>,
        item: &BookmarkItem,
    ) -> Result<Option<BookmarkItem>> {
        let mut state = self.record("POST /favorites".into(), token)?;
        state.favorites.push(item.clone());

        if state.echo_favorite {
            let mut echoed = item.clone();
            echoed.id = format!("srv-{}", state.favorites.len());
            Ok(Some(echoed))
        } else {
            Ok(None)
        }
    }

    async fn remove_favorite(&self, token: Option<&str>, url: &str) -> Result<()> {
        let call = format!("DELETE /{}", markdeck_api::client::favorite_path(url));
        let mut state = self.record(call, token)?;
        state.favorites.retain(|f| f.url.as_deref() != Some(url));
        Ok(())
    }

    async fn fetch_obsolete(&self, token: &str) -> Result<Vec<BookmarkItem>> {
        Ok(self.record("GET /obsolete-bookmarks".into(), Some(token))?.obsolete.clone())
    }

    async fn upload_favicon(&self, token: &str, url: &str, icon: FaviconFile) -> Result<()> {
        self.action("POST /favicons", token)?;
        self.state.lock().unwrap().uploads.push((url.to_string(), icon));
        Ok(())
    }

    async fn trigger_update(&self, token: &str) -> Result<()> {
        self.action("POST /update", token)
    }

    async fn reload_xbel(&self, token: &str) -> Result<()> {
        self.action("POST /xbel-reload", token)
    }
}

pub fn test_user() -> User {
    User {
        uid: "tester".into(),
        email: Some("tester@example.com".into()),
    }
}

/// Provider that signs in `test_user()` and hands out `TEST_TOKEN`
pub fn test_provider() -> MockIdentityProvider {
    let mut provider = MockIdentityProvider::new();
    provider.expect_sign_in().returning(|| Ok(test_user()));
    provider.expect_sign_out().returning(|| Ok(()));
    provider
        .expect_id_token()
        .returning(|_| Ok(TEST_TOKEN.to_string()));
    provider
}

pub async fn signed_in_session() -> SessionHolder {
    let mut session = SessionHolder::new(Arc::new(test_provider()), EventBus::default());
    session.sign_in().await;
    session
}

pub fn signed_out_session() -> SessionHolder {
    SessionHolder::new(Arc::new(test_provider()), EventBus::default())
}
