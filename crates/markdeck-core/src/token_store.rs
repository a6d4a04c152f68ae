use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// On-disk credentials, one entry per profile, with expiration
///
/// Tokens are XOR-obfuscated with a machine-specific key. This keeps them out
/// of casual `cat` output; it is not encryption.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenStore {
    tokens: HashMap<String, StoredToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    encrypted_value: Vec<u8>,
    /// Account label given at login, shown by `whoami`
    #[serde(default)]
    account: Option<String>,
    stored_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// What a valid stored entry yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub token: String,
    pub account: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a token store; a missing file is an empty store
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse token store: {}", e)))
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Store a token that stays valid for `valid_for_days`
    ///
    /// A day count whose expiry date chrono cannot represent is a
    /// `ConfigError` and leaves the store untouched.
    pub fn set_token(
        &mut self,
        profile: &str,
        token: &str,
        account: Option<&str>,
        valid_for_days: u64,
    ) -> crate::Result<()> {
        let stored_at = Utc::now();
        let expires_at = i64::try_from(valid_for_days)
            .ok()
            .and_then(Duration::try_days)
            .and_then(|validity| stored_at.checked_add_signed(validity))
            .ok_or_else(|| {
                crate::Error::ConfigError(format!(
                    "Token validity of {} days is out of range",
                    valid_for_days
                ))
            })?;

        self.tokens.insert(
            profile.to_string(),
            StoredToken {
                encrypted_value: self.encrypt(token),
                account: account.map(str::to_string),
                stored_at,
                expires_at,
            },
        );
        Ok(())
    }

    /// Credentials for `profile` if present and not expired
    pub fn get(&self, profile: &str) -> Option<StoredCredentials> {
        self.get_at(profile, Utc::now())
    }

    fn get_at(&self, profile: &str, now: DateTime<Utc>) -> Option<StoredCredentials> {
        let stored = self.tokens.get(profile)?;

        if now >= stored.expires_at {
            return None;
        }

        Some(StoredCredentials {
            token: self.decrypt(&stored.encrypted_value),
            account: stored.account.clone(),
            expires_at: stored.expires_at,
        })
    }

    pub fn get_token(&self, profile: &str) -> Option<String> {
        self.get(profile).map(|c| c.token)
    }

    pub fn has_valid_token(&self, profile: &str) -> bool {
        self.get(profile).is_some()
    }

    /// Days until the token expires (0 once expired)
    pub fn days_remaining(&self, profile: &str) -> Option<i64> {
        let stored = self.tokens.get(profile)?;
        Some((stored.expires_at - Utc::now()).num_days().max(0))
    }

    pub fn remove_token(&mut self, profile: &str) -> bool {
        self.tokens.remove(profile).is_some()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    fn encrypt(&self, data: &str) -> Vec<u8> {
        let key = machine_key();
        data.bytes()
            .enumerate()
            .map(|(i, b)| b ^ key[i % key.len()])
            .collect()
    }

    fn decrypt(&self, data: &[u8]) -> String {
        let key = machine_key();
        let decrypted: Vec<u8> = data
            .iter()
            .enumerate()
            .map(|(i, &b)| b ^ key[i % key.len()])
            .collect();
        String::from_utf8_lossy(&decrypted).to_string()
    }
}

/// 32-byte key seeded from hostname + username
fn machine_key() -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let hostname = hostname::get()
        .unwrap_or_else(|_| std::ffi::OsString::from("unknown"))
        .to_string_lossy()
        .to_string();

    let username = whoami::username();
    let seed = format!("markdeck-{}-{}", hostname, username);

    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    let hash = hasher.finish();

    let mut key = Vec::with_capacity(32);
    let mut val = hash;
    for _ in 0..4 {
        key.extend_from_slice(&val.to_le_bytes());
        val = val.wrapping_mul(1103515245).wrapping_add(12345);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_token_obfuscation() {
        let store = TokenStore::new();
        let original = "eyJhbGciOiJSUzI1NiJ9.test";

        let encrypted = store.encrypt(original);
        let decrypted = store.decrypt(&encrypted);

        assert_eq!(original, decrypted);
        assert_ne!(encrypted, original.as_bytes());
    }

    #[test]
    fn test_token_storage() {
        let mut store = TokenStore::new();

        store.set_token("default", "id-token", Some("ana@example.com"), 30).unwrap();
        assert!(store.has_valid_token("default"));

        let credentials = store.get("default").unwrap();
        assert_eq!(credentials.token, "id-token");
        assert_eq!(credentials.account.as_deref(), Some("ana@example.com"));
        assert!(store.days_remaining("default").unwrap() >= 29);
    }

    #[test]
    fn test_token_expiration() {
        let mut store = TokenStore::new();

        // Zero days of validity expires right away
        store.set_token("default", "test", None, 0).unwrap();
        assert!(!store.has_valid_token("default"));
        assert_eq!(store.days_remaining("default"), Some(0));

        store.set_token("default", "test", None, 1).unwrap();
        let tomorrow = Utc::now() + Duration::days(2);
        assert!(store.get_at("default", tomorrow).is_none());
    }

    #[test]
    fn test_out_of_range_validity_is_rejected() {
        let mut store = TokenStore::new();
        store.set_token("default", "kept", None, 30).unwrap();

        // Past chrono's last representable date
        let err = store.set_token("default", "far", None, 1_000_000_000).unwrap_err();
        assert!(matches!(err, crate::Error::ConfigError(_)));

        // Does not fit in i64 at all
        let err = store.set_token("default", "max", None, u64::MAX).unwrap_err();
        assert!(matches!(err, crate::Error::ConfigError(_)));

        assert_eq!(store.get_token("default"), Some("kept".to_string()));
        assert!(store.days_remaining("default").unwrap() >= 29);
    }

    #[test]
    fn test_token_removal() {
        let mut store = TokenStore::new();

        store.set_token("default", "test", None, 30).unwrap();
        assert!(store.remove_token("default"));
        assert!(!store.has_valid_token("default"));
        assert!(!store.remove_token("default"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("markdeck").join("tokens.json");

        let mut store = TokenStore::new();
        store.set_token("work", "secret-token", None, 7).unwrap();
        store.save_to(&path).unwrap();

        // The plain token never hits the disk
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("secret-token"));

        let loaded = TokenStore::load_from(&path).unwrap();
        assert_eq!(loaded.get_token("work"), Some("secret-token".to_string()));
        assert!(loaded.get_token("default").is_none());
    }
}
