// One store per feature; each owns its cache plus loading/error flags
pub mod bookmarks;
pub mod favicons;
pub mod favorites;
pub mod maintenance;
pub mod obsolete;
pub mod search;

pub use bookmarks::BookmarkStore;
pub use favicons::FaviconStore;
pub use favorites::FavoritesStore;
pub use maintenance::MaintenanceStore;
pub use obsolete::ObsoleteStore;
pub use search::{SearchServiceStore, TabOpener};

use std::future::Future;
use tracing::error;

use crate::Result;

/// `loading` / `error` pair every store carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestState {
    loading: bool,
    error: Option<String>,
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed request, cleared when the next one starts
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Run `request`, flipping `loading` around it and recording any error
    pub(crate) async fn track<T, F>(&mut self, what: &str, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.loading = true;
        self.error = None;

        let result = request.await;

        self.loading = false;
        if let Err(e) = &result {
            error!("Failed to {}: {}", what, e);
            self.error = Some(e.to_string());
        }
        result
    }
}
