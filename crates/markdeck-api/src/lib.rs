// HTTP client for the bookmark backend
pub mod client;
pub mod retry;
pub mod wire;

// Re-export common types
pub use client::{ApiError, BackendClient};
pub use retry::RetryConfig;
pub use wire::{ApiBookmark, FaviconUpload, NewFavorite};
