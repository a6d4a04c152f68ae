// Request and response shapes as the backend sends them
use serde::{Deserialize, Serialize};

/// One node of the imported bookmark hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBookmark {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String, // "bookmark" or "folder"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ApiBookmark>>,
}

/// `{ "data": ... }` wrapper used by every collection endpoint
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct BookmarksData {
    #[serde(default)]
    pub bookmarks: Vec<ApiBookmark>,
}

#[derive(Debug, Deserialize)]
pub struct FavoritesData {
    #[serde(default)]
    pub favorites: Vec<ApiBookmark>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObsoleteData {
    #[serde(default)]
    pub obsolete_bookmarks: Vec<ApiBookmark>,
}

/// Response to `POST /favorites`; the server may or may not echo the record
#[derive(Debug, Default, Deserialize)]
pub struct FavoriteCreated {
    #[serde(default)]
    pub data: Option<FavoriteData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FavoriteData {
    #[serde(default)]
    pub favorite: Option<ApiBookmark>,
}

/// Body of `POST /favorites`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFavorite<'a> {
    pub url: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<&'a str>,
}

/// `{ "status": "success" }` style reply of the action endpoints
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Error body; only `message` is interesting
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// An icon file ready to be sent as the `favicon` multipart field
#[derive(Debug, Clone)]
pub struct FaviconUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}
