use serde::{Deserialize, Serialize};
use std::path::Path;

/// Leaf or folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Bookmark,
    Folder,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Bookmark => write!(f, "bookmark"),
            ItemKind::Folder => write!(f, "folder"),
        }
    }
}

/// One node of an imported bookmark hierarchy
///
/// Folders hold any mix of children; bookmarks never have children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Where the backend serves this bookmark's favicon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    /// Icon carried over from the XBEL import (usually a data URI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BookmarkItem>,
}

impl BookmarkItem {
    pub fn bookmark(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: ItemKind::Bookmark,
            url: Some(url.into()),
            favicon_url: None,
            favicon: None,
            children: Vec::new(),
        }
    }

    pub fn folder(id: impl Into<String>, title: impl Into<String>, children: Vec<BookmarkItem>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: ItemKind::Folder,
            url: None,
            favicon_url: None,
            favicon: None,
            children,
        }
    }

    pub fn with_favicon_url(mut self, favicon_url: impl Into<String>) -> Self {
        self.favicon_url = Some(favicon_url.into());
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }

    /// Number of bookmarks in this subtree, folders not counted
    pub fn bookmark_count(&self) -> usize {
        match self.kind {
            ItemKind::Bookmark => 1,
            ItemKind::Folder => self.children.iter().map(BookmarkItem::bookmark_count).sum(),
        }
    }
}

/// Folders first, then bookmarks; order inside each group is kept
pub fn folders_first(items: &[BookmarkItem]) -> Vec<&BookmarkItem> {
    items
        .iter()
        .filter(|item| item.is_folder())
        .chain(items.iter().filter(|item| !item.is_folder()))
        .collect()
}

/// An external search engine the query can be dispatched to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchService {
    pub id: String,
    pub name: String,
    /// Template with a `{query}` placeholder
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub active: bool,
}

pub const QUERY_PLACEHOLDER: &str = "{query}";

impl SearchService {
    fn seed(id: &str, name: &str, url: &str, active: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            icon: None,
            active,
        }
    }

    /// Fill the template with the percent-encoded query
    pub fn search_url(&self, query: &str) -> String {
        self.url
            .replacen(QUERY_PLACEHOLDER, &urlencoding::encode(query), 1)
    }
}

/// Engines a fresh install starts with
pub fn default_search_services() -> Vec<SearchService> {
    vec![
        SearchService::seed("google", "Google", "https://www.google.com/search?q={query}", true),
        SearchService::seed("bing", "Bing", "https://www.bing.com/search?q={query}", false),
        SearchService::seed(
            "perplexity",
            "Perplexity",
            "https://www.perplexity.ai/search?q={query}",
            false,
        ),
        SearchService::seed(
            "brave",
            "Brave Search",
            "https://search.brave.com/search?q={query}",
            false,
        ),
    ]
}

/// A custom favicon ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct FaviconFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FaviconFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "favicon".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
