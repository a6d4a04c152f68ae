// External search engines: user-editable list, persisted locally
use markdeck_storage::LocalStorage;
use std::time::Duration;
use tracing::{info, warn};

use crate::{
    models::{default_search_services, SearchService},
    Error, Result,
};

/// Local storage key holding the engine list as a JSON array
pub const STORAGE_KEY: &str = "search-services-config";

/// Something that can show a URL to the user, normally a browser tab
#[cfg_attr(test, mockall::automock)]
pub trait TabOpener: Send + Sync {
    fn open_tab(&self, url: &str) -> std::io::Result<()>;
}

pub struct SearchServiceStore {
    services: Vec<SearchService>,
    storage: LocalStorage,
    stagger: Duration,
}

impl SearchServiceStore {
    /// Read the saved list, or seed the defaults on first run
    ///
    /// A saved list that cannot be read is logged and replaced by the
    /// defaults; it is not overwritten until the next mutation.
    pub fn load(storage: LocalStorage, stagger: Duration) -> Self {
        let services = match storage.get_json::<Vec<SearchService>>(STORAGE_KEY) {
            Ok(Some(services)) => services,
            Ok(None) => default_search_services(),
            Err(e) => {
                warn!("Ignoring unreadable search service config: {}", e);
                default_search_services()
            }
        };

        Self {
            services,
            storage,
            stagger,
        }
    }

    pub fn services(&self) -> &[SearchService] {
        &self.services
    }

    pub fn active_services(&self) -> impl Iterator<Item = &SearchService> {
        self.services.iter().filter(|s| s.active)
    }

    /// Flip `active` on engine `id` and persist the whole list
    ///
    /// Returns the new state, or `None` for an unknown id (nothing saved).
    pub fn toggle(&mut self, id: &str) -> Result<Option<bool>> {
        let Some(service) = self.services.iter_mut().find(|s| s.id == id) else {
            warn!("No search service with id '{}'", id);
            return Ok(None);
        };

        service.active = !service.active;
        let active = service.active;

        if let Err(e) = self.save() {
            // Keep memory in line with what storage still holds
            if let Some(service) = self.services.iter_mut().find(|s| s.id == id) {
                service.active = !active;
            }
            return Err(e);
        }

        info!("Search service '{}' is now {}", id, if active { "active" } else { "inactive" });
        Ok(Some(active))
    }

    pub fn save(&self) -> Result<()> {
        self.storage.set_json(STORAGE_KEY, &self.services)?;
        Ok(())
    }

    /// URLs the query would open, one per active engine
    pub fn search_urls(&self, query: &str) -> Vec<String> {
        self.active_services().map(|s| s.search_url(query)).collect()
    }

    /// Open one tab per active engine, `stagger` apart
    ///
    /// A tab that fails to open is logged and skipped; the call only fails
    /// when there was something to open and nothing opened.
    pub async fn dispatch(&self, query: &str, opener: &dyn TabOpener) -> Result<Vec<String>> {
        let urls = self.search_urls(query);
        let mut opened = Vec::with_capacity(urls.len());
        let mut last_error = None;

        for (index, url) in urls.iter().enumerate() {
            if index > 0 && !self.stagger.is_zero() {
                tokio::time::sleep(self.stagger).await;
            }

            match opener.open_tab(url) {
                Ok(()) => opened.push(url.clone()),
                Err(e) => {
                    warn!("Could not open {}: {}", url, e);
                    last_error = Some(format!("{}: {}", url, e));
                }
            }
        }

        match last_error {
            Some(message) if opened.is_empty() => Err(Error::BrowserError(message)),
            _ => Ok(opened),
        }
    }
}
