use crate::{
    models::{BookmarkItem, FaviconFile},
    Result,
};

/// The server of record for bookmarks, favorites and favicons
///
/// Stores talk to this trait only, so tests can swap in a fake and the HTTP
/// client stays an implementation detail. Endpoints that always need a
/// session take `&str`; favorites take an optional token because whether
/// they need one is configurable.
#[async_trait::async_trait]
pub trait BookmarkBackend: Send + Sync {
    async fn fetch_bookmarks(&self, token: &str) -> Result<Vec<BookmarkItem>>;

    async fn fetch_favorites(&self, token: Option<&str>) -> Result<Vec<BookmarkItem>>;

    /// Returns the stored favorite when the server echoes it back
    async fn add_favorite(
        &self,
        token: Option<&str>,
        item: &BookmarkItem,
    ) -> Result<Option<BookmarkItem>>;

    async fn remove_favorite(&self, token: Option<&str>, url: &str) -> Result<()>;

    async fn fetch_obsolete(&self, token: &str) -> Result<Vec<BookmarkItem>>;

    async fn upload_favicon(&self, token: &str, url: &str, icon: FaviconFile) -> Result<()>;

    async fn trigger_update(&self, token: &str) -> Result<()>;

    async fn reload_xbel(&self, token: &str) -> Result<()>;
}
