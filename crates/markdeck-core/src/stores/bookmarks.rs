use tracing::info;

use super::RequestState;
use crate::{
    backend::BookmarkBackend,
    models::{folders_first, BookmarkItem},
    session::SessionHolder,
    Result,
};

/// Last-fetched bookmark tree
#[derive(Debug, Default)]
pub struct BookmarkStore {
    items: Vec<BookmarkItem>,
    state: RequestState,
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[BookmarkItem] {
        &self.items
    }

    /// Top-level items with folders ahead of bookmarks
    pub fn sorted(&self) -> Vec<&BookmarkItem> {
        folders_first(&self.items)
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    /// Replace the cache with the server's list; needs a session
    pub async fn fetch(&mut self, backend: &dyn BookmarkBackend, session: &SessionHolder) -> Result<()> {
        let items = self
            .state
            .track("fetch bookmarks", async {
                let token = session.token().await?;
                backend.fetch_bookmarks(&token).await
            })
            .await?;

        info!("Loaded {} bookmarks", items.len());
        self.items = items;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{signed_in_session, signed_out_session, FakeBackend};
    use crate::Error;

    fn sample() -> Vec<BookmarkItem> {
        vec![
            BookmarkItem::bookmark("b1", "B1", "https://b1.example"),
            BookmarkItem::folder("f1", "F1", Vec::new()),
            BookmarkItem::bookmark("b2", "B2", "https://b2.example"),
            BookmarkItem::folder("f2", "F2", Vec::new()),
        ]
    }

    #[tokio::test]
    async fn test_fetch_replaces_cache() {
        let backend = FakeBackend::new().with_bookmarks(sample());
        let session = signed_in_session().await;
        let mut store = BookmarkStore::new();

        store.fetch(&backend, &session).await.unwrap();
        assert_eq!(store.items().len(), 4);

        // A second fetch replaces, it does not append
        backend.state.lock().unwrap().bookmarks.truncate(1);
        store.fetch(&backend, &session).await.unwrap();
        assert_eq!(store.items().len(), 1);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_sorted_puts_folders_first() {
        let backend = FakeBackend::new().with_bookmarks(sample());
        let session = signed_in_session().await;
        let mut store = BookmarkStore::new();
        store.fetch(&backend, &session).await.unwrap();

        let ids: Vec<&str> = store.sorted().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["f1", "f2", "b1", "b2"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_cache() {
        let backend = FakeBackend::new().with_bookmarks(sample());
        let session = signed_in_session().await;
        let mut store = BookmarkStore::new();
        store.fetch(&backend, &session).await.unwrap();

        backend.fail_with("connection refused");
        let err = store.fetch(&backend, &session).await.unwrap_err();

        assert!(matches!(err, Error::RequestFailed(_)));
        assert_eq!(store.items().len(), 4);
        assert_eq!(store.error(), Some("Request failed: connection refused"));
    }

    #[tokio::test]
    async fn test_fetch_without_session_sends_nothing() {
        let backend = FakeBackend::new().with_bookmarks(sample());
        let session = signed_out_session();
        let mut store = BookmarkStore::new();

        let err = store.fetch(&backend, &session).await.unwrap_err();

        assert!(matches!(err, Error::Unauthenticated));
        assert!(backend.calls().is_empty());
        assert!(store.items().is_empty());
    }
}
