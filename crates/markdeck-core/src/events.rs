// Application events and the cache invalidations they imply
use tokio::sync::broadcast;
use tracing::debug;

/// Something happened that other parts of the app may care about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    SignedIn,
    SignedOut,
    /// The server finished reprocessing its bookmark sources
    BookmarksUpdated,
    FavoriteAdded { url: String },
    FaviconUploaded { url: String },
    XbelReloaded,
}

impl AppEvent {
    /// Which client caches this event makes stale
    pub fn invalidation(&self) -> Invalidation {
        match self {
            AppEvent::SignedIn => Invalidation {
                favorites: true,
                ..Invalidation::default()
            },
            AppEvent::SignedOut => Invalidation::default(),
            AppEvent::BookmarksUpdated | AppEvent::XbelReloaded => Invalidation {
                bookmarks: true,
                obsolete: true,
                ..Invalidation::default()
            },
            // New favorites and custom icons both change favicon state in the tree
            AppEvent::FavoriteAdded { .. } | AppEvent::FaviconUploaded { .. } => Invalidation {
                bookmarks: true,
                ..Invalidation::default()
            },
        }
    }
}

/// Set of caches that need a refetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Invalidation {
    pub bookmarks: bool,
    pub obsolete: bool,
    pub favorites: bool,
}

impl Invalidation {
    pub fn all() -> Self {
        Self {
            bookmarks: true,
            obsolete: true,
            favorites: true,
        }
    }

    pub fn merge(self, other: Invalidation) -> Self {
        Self {
            bookmarks: self.bookmarks || other.bookmarks,
            obsolete: self.obsolete || other.obsolete,
            favorites: self.favorites || other.favorites,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.bookmarks || self.obsolete || self.favorites)
    }
}

/// Fan-out channel for [`AppEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: AppEvent) {
        debug!("Publishing {:?}", event);
        // No subscribers is not an error
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
