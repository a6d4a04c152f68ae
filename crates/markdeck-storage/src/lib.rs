// SQLite-backed key/value storage
// Plays the role browser local storage would: small JSON blobs under string keys

pub mod local;

pub use local::{LocalStorage, StorageError};
