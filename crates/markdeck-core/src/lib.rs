// Stores, session and orchestration for the Markdeck client
pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod providers;
pub mod session;
pub mod stores;
pub mod token_store;

#[cfg(test)]
mod testing;

pub use app::{App, AppState};
pub use backend::BookmarkBackend;
pub use config::Config;
pub use error::Error;
pub use events::{AppEvent, EventBus, Invalidation};
pub use models::{BookmarkItem, FaviconFile, ItemKind, SearchService};
pub use providers::HttpBackend;
pub use session::{IdentityProvider, SessionHolder, StoredTokenProvider, User};
pub use stores::{SearchServiceStore, TabOpener};
pub use token_store::TokenStore;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
