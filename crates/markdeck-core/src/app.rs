// Ties the stores to one session and one backend, and reacts to events
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use crate::{
    backend::BookmarkBackend,
    config::Config,
    events::{AppEvent, EventBus, Invalidation},
    models::{BookmarkItem, FaviconFile},
    session::{IdentityProvider, SessionHolder, User},
    stores::{
        BookmarkStore, FaviconStore, FavoritesStore, MaintenanceStore, ObsoleteStore,
        SearchServiceStore, TabOpener,
    },
    Result,
};

/// Everything the UI reads
pub struct AppState {
    pub bookmarks: BookmarkStore,
    pub favorites: FavoritesStore,
    pub obsolete: ObsoleteStore,
    pub favicons: FaviconStore,
    pub maintenance: MaintenanceStore,
    pub search: SearchServiceStore,
}

/// Application root
///
/// Actions take `&mut self`, so at most one request per store is in flight.
/// Each action drains the events it caused and refetches whatever they made
/// stale before returning; those refetches log failures instead of
/// returning them.
pub struct App {
    state: AppState,
    session: SessionHolder,
    backend: Arc<dyn BookmarkBackend>,
    events: EventBus,
    inbox: broadcast::Receiver<AppEvent>,
}

impl App {
    pub fn new(
        backend: Arc<dyn BookmarkBackend>,
        provider: Arc<dyn IdentityProvider>,
        search: SearchServiceStore,
        config: &Config,
    ) -> Self {
        let events = EventBus::default();
        let inbox = events.subscribe();
        let session = SessionHolder::new(provider, events.clone());

        let state = AppState {
            bookmarks: BookmarkStore::new(),
            favorites: FavoritesStore::new(config.auth.favorites_require_auth),
            obsolete: ObsoleteStore::new(),
            favicons: FaviconStore::new(),
            maintenance: MaintenanceStore::new(),
            search,
        };

        Self {
            state,
            session,
            backend,
            events,
            inbox,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn session(&self) -> &SessionHolder {
        &self.session
    }

    /// Listen to the same events the app reacts to
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    /// Sign in and load favorites; `None` when the provider refused
    pub async fn sign_in(&mut self) -> Option<User> {
        let user = self.session.sign_in().await;
        self.settle().await;
        user
    }

    pub async fn sign_out(&mut self) -> Result<()> {
        self.session.sign_out().await?;
        self.settle().await;
        Ok(())
    }

    pub async fn fetch_bookmarks(&mut self) -> Result<()> {
        self.state
            .bookmarks
            .fetch(self.backend.as_ref(), &self.session)
            .await
    }

    pub async fn fetch_favorites(&mut self) -> Result<()> {
        self.state
            .favorites
            .fetch(self.backend.as_ref(), &self.session)
            .await
    }

    pub async fn fetch_obsolete(&mut self) -> Result<()> {
        self.state
            .obsolete
            .fetch(self.backend.as_ref(), &self.session)
            .await
    }

    /// Favorite `item`, then refresh the tree so its favicon state matches
    pub async fn add_favorite(&mut self, item: &BookmarkItem) -> Result<()> {
        self.state
            .favorites
            .add(self.backend.as_ref(), &self.session, item)
            .await?;

        self.events.publish(AppEvent::FavoriteAdded {
            url: item.url.clone().unwrap_or_default(),
        });
        self.settle().await;
        Ok(())
    }

    pub async fn remove_favorite(&mut self, item: &BookmarkItem) -> Result<()> {
        self.state
            .favorites
            .remove(self.backend.as_ref(), &self.session, item)
            .await
    }

    /// Upload a custom icon for `url`; the tree is refetched, not patched
    pub async fn upload_favicon(&mut self, url: &str, icon: FaviconFile) -> Result<()> {
        self.state
            .favicons
            .upload(self.backend.as_ref(), &self.session, url, icon)
            .await?;

        self.events.publish(AppEvent::FaviconUploaded {
            url: url.to_string(),
        });
        self.settle().await;
        Ok(())
    }

    pub async fn update_server(&mut self) -> Result<()> {
        self.state
            .maintenance
            .update_server(self.backend.as_ref(), &self.session)
            .await?;

        self.events.publish(AppEvent::BookmarksUpdated);
        self.settle().await;
        Ok(())
    }

    pub async fn reload_xbel(&mut self) -> Result<()> {
        self.state
            .maintenance
            .reload_xbel(self.backend.as_ref(), &self.session)
            .await?;

        self.events.publish(AppEvent::XbelReloaded);
        self.settle().await;
        Ok(())
    }

    pub fn toggle_search_service(&mut self, id: &str) -> Result<Option<bool>> {
        self.state.search.toggle(id)
    }

    /// Open the query on every active engine; returns the URLs opened
    pub async fn search(&self, query: &str, opener: &dyn TabOpener) -> Result<Vec<String>> {
        self.state.search.dispatch(query, opener).await
    }

    /// Apply every pending event and return what was refreshed
    ///
    /// Falling behind the channel means events were lost, so everything is
    /// treated as stale.
    pub async fn settle(&mut self) -> Invalidation {
        let mut stale = Invalidation::default();
        loop {
            match self.inbox.try_recv() {
                Ok(event) => stale = stale.merge(event.invalidation()),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("Missed {} app events, refreshing everything", missed);
                    stale = Invalidation::all();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        if !stale.is_empty() {
            debug!("Refreshing {:?}", stale);
            self.refresh(stale).await;
        }
        stale
    }

    async fn refresh(&mut self, stale: Invalidation) {
        let backend = self.backend.as_ref();
        let session = &self.session;
        let AppState {
            bookmarks,
            favorites,
            obsolete,
            ..
        } = &mut self.state;

        let refresh_bookmarks = async {
            if stale.bookmarks {
                if let Err(e) = bookmarks.fetch(backend, session).await {
                    warn!("Background bookmark refresh failed: {}", e);
                }
            }
        };
        let refresh_obsolete = async {
            if stale.obsolete {
                if let Err(e) = obsolete.fetch(backend, session).await {
                    warn!("Background obsolete refresh failed: {}", e);
                }
            }
        };
        let refresh_favorites = async {
            if stale.favorites {
                if let Err(e) = favorites.fetch(backend, session).await {
                    warn!("Background favorites refresh failed: {}", e);
                }
            }
        };

        tokio::join!(refresh_bookmarks, refresh_obsolete, refresh_favorites);
    }
}
