use tracing::info;

use super::RequestState;
use crate::{backend::BookmarkBackend, models::BookmarkItem, session::SessionHolder, Result};

/// Bookmarks the backend flagged as unreachable or stale during ingestion
#[derive(Debug, Default)]
pub struct ObsoleteStore {
    items: Vec<BookmarkItem>,
    state: RequestState,
}

impl ObsoleteStore {
    pub fn new() -> Self {
        Self::default()
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

    pub async fn fetch(&mut self, backend: &dyn BookmarkBackend, session: &SessionHolder) -> Result<()> {
        let items = self
            .state
            .track("fetch obsolete bookmarks", async {
                let token = session.token().await?;
                backend.fetch_obsolete(&token).await
            })
            .await?;

        info!("Loaded {} obsolete bookmarks", items.len());
        self.items = items;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{signed_in_session, signed_out_session, FakeBackend, TEST_TOKEN};
    use crate::Error;

    #[tokio::test]
    async fn test_fetch_sends_token() {
        let backend = FakeBackend::new().with_obsolete(vec![BookmarkItem::bookmark(
            "x",
            "Gone",
            "http://gone.example",
        )]);
        let session = signed_in_session().await;
        let mut store = ObsoleteStore::new();

        store.fetch(&backend, &session).await.unwrap();

        assert_eq!(store.items().len(), 1);
        assert_eq!(backend.calls(), vec!["GET /obsolete-bookmarks"]);
        assert_eq!(backend.tokens(), vec![Some(TEST_TOKEN.to_string())]);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_returned() {
        let backend = FakeBackend::new().with_obsolete(vec![BookmarkItem::bookmark(
            "x",
            "Gone",
            "http://gone.example",
        )]);
        let session = signed_in_session().await;
        let mut store = ObsoleteStore::new();
        store.fetch(&backend, &session).await.unwrap();

        backend.fail_with("500");
        assert!(store.fetch(&backend, &session).await.is_err());
        assert!(store.error().is_some());
        assert_eq!(store.items().len(), 1);

        backend.recover();
        store.fetch(&backend, &session).await.unwrap();
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_unauthenticated() {
        let backend = FakeBackend::new();
        let mut store = ObsoleteStore::new();

        let err = store.fetch(&backend, &signed_out_session()).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
        assert!(backend.calls().is_empty());
    }
}
