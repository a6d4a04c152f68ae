use tracing::info;

use super::RequestState;
use crate::{
    backend::BookmarkBackend, models::BookmarkItem, session::SessionHolder, Error, Result,
};

/// The user's favorite subset of bookmarks
#[derive(Debug)]
pub struct FavoritesStore {
    items: Vec<BookmarkItem>,
    state: RequestState,
    require_auth: bool,
}

impl FavoritesStore {
    /// `require_auth` decides whether requests go out without a session
    pub fn new(require_auth: bool) -> Self {
        Self {
            items: Vec::new(),
            state: RequestState::default(),
            require_auth,
        }
    }

    pub fn items(&self) -> &[BookmarkItem] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    /// True iff a cached favorite has exactly this URL
    pub fn is_favorite(&self, url: &str) -> bool {
        self.items.iter().any(|item| item.url.as_deref() == Some(url))
    }

    pub async fn fetch(&mut self, backend: &dyn BookmarkBackend, session: &SessionHolder) -> Result<()> {
        let require_auth = self.require_auth;
        let items = self
            .state
            .track("fetch favorites", async {
                let token = token_for(session, require_auth).await?;
                backend.fetch_favorites(token.as_deref()).await
            })
            .await?;

        info!("Loaded {} favorites", items.len());
        self.items = items;
        Ok(())
    }

    /// Post `item` and append the server's copy, or ours if it sent none back
    pub async fn add(
        &mut self,
        backend: &dyn BookmarkBackend,
        session: &SessionHolder,
        item: &BookmarkItem,
    ) -> Result<()> {
        let require_auth = self.require_auth;
        let echoed = self
            .state
            .track("add favorite", async {
                require_url(item)?;
                let token = token_for(session, require_auth).await?;
                backend.add_favorite(token.as_deref(), item).await
            })
            .await?;

        info!("Added favorite {}", item.title);
        self.items.push(echoed.unwrap_or_else(|| item.clone()));
        Ok(())
    }

    /// Delete by URL and drop every cached entry with exactly that URL
    pub async fn remove(
        &mut self,
        backend: &dyn BookmarkBackend,
        session: &SessionHolder,
        item: &BookmarkItem,
    ) -> Result<()> {
        let require_auth = self.require_auth;
        let url = self
            .state
            .track("remove favorite", async {
                let url = require_url(item)?;
                let token = token_for(session, require_auth).await?;
                backend.remove_favorite(token.as_deref(), url).await?;
                Ok(url)
            })
            .await?;

        let before = self.items.len();
        self.items.retain(|f| f.url.as_deref() != Some(url));
        info!("Removed favorite {} ({} cached entries)", url, before - self.items.len());
        Ok(())
    }
}

fn require_url(item: &BookmarkItem) -> Result<&str> {
    item.url
        .as_deref()
        .ok_or_else(|| Error::InvalidItem(format!("'{}' has no URL", item.title)))
}

async fn token_for(session: &SessionHolder, require_auth: bool) -> Result<Option<String>> {
    if require_auth {
        session.token().await.map(Some)
    } else {
        session.optional_token().await
    }
}
