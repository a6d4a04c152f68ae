use tracing::info;

use super::RequestState;
use crate::{
    backend::BookmarkBackend, models::FaviconFile, session::SessionHolder, Result,
};

/// Custom favicon uploads
///
/// Holds no cache of its own: a successful upload changes the bookmark tree,
/// which the orchestrator refetches.
#[derive(Debug, Default)]
pub struct FaviconStore {
    state: RequestState,
}

impl FaviconStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_uploading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }

    /// Upload `icon` as the favicon for bookmark `url`
    pub async fn upload(
        &mut self,
        backend: &dyn BookmarkBackend,
        session: &SessionHolder,
        url: &str,
        icon: FaviconFile,
    ) -> Result<()> {
        let size = icon.bytes.len();
        self.state
            .track("upload favicon", async {
                let token = session.token().await?;
                backend.upload_favicon(&token, url, icon).await
            })
            .await?;

        info!("Uploaded {} byte favicon for {}", size, url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{signed_in_session, signed_out_session, FakeBackend};
    use crate::Error;

    fn icon() -> FaviconFile {
        FaviconFile::new("icon.png", vec![0x89, b'P', b'N', b'G'])
    }

    #[tokio::test]
    async fn test_upload_sends_file() {
        let backend = FakeBackend::new();
        let session = signed_in_session().await;
        let mut store = FaviconStore::new();

        store.upload(&backend, &session, "https://a.com", icon()).await.unwrap();

        let uploads = &backend.state.lock().unwrap().uploads;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "https://a.com");
        assert_eq!(uploads[0].1.mime_type, "image/png");
        assert!(!store.is_uploading());
    }

    #[tokio::test]
    async fn test_rejected_upload() {
        let backend = FakeBackend::new();
        backend.state.lock().unwrap().reject_actions = true;
        let session = signed_in_session().await;
        let mut store = FaviconStore::new();

        let err = store
            .upload(&backend, &session, "https://a.com", icon())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::OperationRejected(_)));
        assert!(store.error().unwrap().contains("rejected"));
    }

    #[tokio::test]
    async fn test_upload_needs_session() {
        let backend = FakeBackend::new();
        let mut store = FaviconStore::new();

        let err = store
            .upload(&backend, &signed_out_session(), "https://a.com", icon())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Unauthenticated));
        assert!(backend.calls().is_empty());
    }
}
