// HTTP backend - bridges the API client with the BookmarkBackend trait
use async_trait::async_trait;
use markdeck_api::{ApiBookmark, BackendClient, FaviconUpload, NewFavorite};
use tracing::{debug, warn};

use crate::{
    backend::BookmarkBackend,
    config::Config,
    models::{BookmarkItem, FaviconFile, ItemKind},
    Error, Result,
};

/// Wrapper around BackendClient that implements BookmarkBackend
pub struct HttpBackend {
    client: BackendClient,
}

impl HttpBackend {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// Client pointed at `api.base_url` with the configured retry policy
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = match &config.api.user_agent {
            Some(agent) => BackendClient::with_user_agent(&config.api.base_url, agent)?,
            None => BackendClient::new(&config.api.base_url)?,
        };

        Ok(Self::new(client.with_retry_config((&config.retry).into())))
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }
}

#[async_trait]
impl BookmarkBackend for HttpBackend {
    async fn fetch_bookmarks(&self, token: &str) -> Result<Vec<BookmarkItem>> {
        let items = self.client.get_bookmarks(Some(token)).await?;
        Ok(items.into_iter().map(api_to_item).collect())
    }

    async fn fetch_favorites(&self, token: Option<&str>) -> Result<Vec<BookmarkItem>> {
        let items = self.client.get_favorites(token).await?;
        Ok(items.into_iter().map(api_to_item).collect())
    }

    async fn add_favorite(
        &self,
        token: Option<&str>,
        item: &BookmarkItem,
    ) -> Result<Option<BookmarkItem>> {
        let url = item
            .url
            .as_deref()
            .ok_or_else(|| Error::InvalidItem(format!("'{}' has no URL", item.title)))?;

        let favorite = NewFavorite {
            url,
            title: &item.title,
            favicon_url: item.favicon_url.as_deref(),
        };

        let echoed = self.client.add_favorite(token, &favorite).await?;
        Ok(echoed.map(api_to_item))
    }

    async fn remove_favorite(&self, token: Option<&str>, url: &str) -> Result<()> {
        Ok(self.client.remove_favorite(token, url).await?)
    }

    async fn fetch_obsolete(&self, token: &str) -> Result<Vec<BookmarkItem>> {
        let items = self.client.get_obsolete_bookmarks(Some(token)).await?;
        Ok(items.into_iter().map(api_to_item).collect())
    }

    async fn upload_favicon(&self, token: &str, url: &str, icon: FaviconFile) -> Result<()> {
        let upload = FaviconUpload {
            file_name: icon.file_name,
            mime_type: icon.mime_type,
            bytes: icon.bytes,
        };
        Ok(self.client.upload_favicon(Some(token), url, upload).await?)
    }

    async fn trigger_update(&self, token: &str) -> Result<()> {
        Ok(self.client.trigger_update(Some(token)).await?)
    }

    async fn reload_xbel(&self, token: &str) -> Result<()> {
        Ok(self.client.reload_xbel(Some(token)).await?)
    }
}

/// Convert the wire bookmark into our internal model
fn api_to_item(api: ApiBookmark) -> BookmarkItem {
    let kind = match api.kind.as_str() {
        "folder" => ItemKind::Folder,
        "bookmark" => ItemKind::Bookmark,
        other => {
            warn!("Unknown item type '{}' for {}; treating as bookmark", other, api.id);
            ItemKind::Bookmark
        }
    };

    let children = match (kind, api.children) {
        (ItemKind::Folder, Some(children)) => children.into_iter().map(api_to_item).collect(),
        (ItemKind::Bookmark, Some(children)) if !children.is_empty() => {
            debug!("Dropping {} children of bookmark {}", children.len(), api.id);
            Vec::new()
        }
        _ => Vec::new(),
    };

    BookmarkItem {
        id: api.id,
        title: api.title,
        kind,
        url: api.url,
        favicon_url: api.favicon_url,
        favicon: api.favicon,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(id: &str, kind: &str, children: Option<Vec<ApiBookmark>>) -> ApiBookmark {
        ApiBookmark {
            id: id.to_string(),
            title: id.to_uppercase(),
            kind: kind.to_string(),
            url: if kind == "bookmark" {
                Some(format!("https://{}.example", id))
            } else {
                None
            },
            favicon_url: None,
            favicon: None,
            children,
        }
    }

    #[test]
    fn test_converts_nested_folders() {
        let tree = api("root", "folder", Some(vec![api("a", "bookmark", None), api("sub", "folder", Some(vec![]))]));

        let item = api_to_item(tree);
        assert_eq!(item.kind, ItemKind::Folder);
        assert_eq!(item.children.len(), 2);
        assert_eq!(item.children[0].url.as_deref(), Some("https://a.example"));
        assert!(item.children[1].is_folder());
    }

    #[test]
    fn test_bookmarks_never_keep_children() {
        let odd = api("a", "bookmark", Some(vec![api("b", "bookmark", None)]));
        assert!(api_to_item(odd).children.is_empty());
    }

    #[test]
    fn test_unknown_type_becomes_bookmark() {
        let item = api_to_item(api("s", "separator", None));
        assert_eq!(item.kind, ItemKind::Bookmark);
    }

    #[tokio::test]
    async fn test_add_favorite_without_url_is_invalid() {
        let backend = HttpBackend::from_config(&Config::default()).unwrap();
        let folder = BookmarkItem::folder("f", "Folder", Vec::new());

        let result = backend.add_favorite(Some("t"), &folder).await;
        assert!(matches!(result, Err(Error::InvalidItem(_))));
    }
}
