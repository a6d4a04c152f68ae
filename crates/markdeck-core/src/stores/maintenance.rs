// Server-side reprocessing: generic update and XBEL re-ingestion
use tracing::info;

use super::RequestState;
use crate::{backend::BookmarkBackend, session::SessionHolder, Result};

#[derive(Debug, Default)]
pub struct MaintenanceStore {
    update: RequestState,
    reload: RequestState,
}

impl MaintenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_updating(&self) -> bool {
        self.update.is_loading()
    }

    pub fn update_error(&self) -> Option<&str> {
        self.update.error()
    }

    pub fn is_reloading(&self) -> bool {
        self.reload.is_loading()
    }

    pub fn reload_error(&self) -> Option<&str> {
        self.reload.error()
    }

    /// `POST /update`
    pub async fn update_server(&mut self, backend: &dyn BookmarkBackend, session: &SessionHolder) -> Result<()> {
        self.update
            .track("update server", async {
                let token = session.token().await?;
                backend.trigger_update(&token).await
            })
            .await?;

        info!("Server update finished");
        Ok(())
    }

    /// `POST /xbel-reload`
    pub async fn reload_xbel(&mut self, backend: &dyn BookmarkBackend, session: &SessionHolder) -> Result<()> {
        self.reload
            .track("reload XBEL", async {
                let token = session.token().await?;
                backend.reload_xbel(&token).await
            })
            .await?;

        info!("XBEL reload finished");
        Ok(())
    }
}
