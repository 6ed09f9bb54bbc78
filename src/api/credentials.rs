//! Credential resolution for the JIRA API.
//!
//! The base URL and access token are resolved once per run from, in order of
//! priority, the command line (URL only), the OS keyring and the process
//! environment. A token that is only found in the environment is copied into
//! the keyring so later runs do not need it exported.

use std::fmt;

use tracing::{debug, info, instrument, warn};

use super::error::{ApiError, Result};

/// The keyring service name for jira-cli secrets.
pub const KEYRING_SERVICE: &str = "jira-cli";

/// Environment variable holding the JIRA base URL.
pub const ENV_JIRA_URL: &str = "JIRA_URL";

/// Environment variable holding the personal access token.
pub const ENV_JIRA_TOKEN: &str = "JIRA_TOKEN";

/// Tokens shorter than this are rejected when entered interactively.
const MIN_TOKEN_LEN: usize = 10;

/// Resolved, validated credentials for one run.
///
/// The raw token is turned into the `Authorization` header value on
/// construction and is not kept around otherwise.
#[derive(Clone)]
pub struct Credentials {
    base_url: String,
    auth_header: String,
    verify_ssl: bool,
}

impl Credentials {
    /// Build credentials from a base URL and token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::MissingCredentials` if either value is empty.
    pub fn new(base_url: &str, token: &str, verify_ssl: bool) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::MissingCredentials(
                "JIRA token is empty".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            auth_header: format!("Bearer {}", token),
            verify_ssl,
        })
    }

    /// The JIRA base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the authorization header value for HTTP requests.
    pub fn header_value(&self) -> &str {
        &self.auth_header
    }

    /// Whether TLS certificates are verified.
    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("auth_header", &"[redacted]")
            .field("verify_ssl", &self.verify_ssl)
            .finish()
    }
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    CommandLine,
    SecretStore,
    Environment,
}

/// The two entries kept in the secret store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKey {
    Url,
    Token,
}

impl SecretKey {
    /// The keyring account name for this entry.
    pub fn account(self) -> &'static str {
        match self {
            SecretKey::Url => "url",
            SecretKey::Token => "token",
        }
    }
}

/// A platform credential manager holding one URL/token pair.
pub trait SecretStore {
    /// Read an entry. A missing entry is `Ok(None)`.
    fn get(&self, key: SecretKey) -> Result<Option<String>>;

    /// Create or overwrite an entry.
    fn set(&self, key: SecretKey, value: &str) -> Result<()>;

    /// Remove an entry. Removing a missing entry is not an error.
    fn delete(&self, key: SecretKey) -> Result<()>;
}

impl<T: SecretStore + ?Sized> SecretStore for &T {
    fn get(&self, key: SecretKey) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: SecretKey, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: SecretKey) -> Result<()> {
        (**self).delete(key)
    }
}

/// Secret store backed by the OS keyring.
///
/// A keyring entry is opened per call and dropped before returning.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Store under the default `jira-cli` service.
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    /// Store under a custom service name.
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: SecretKey) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key.account())
            .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, key: SecretKey) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ApiError::Keyring(format!(
                "failed to retrieve {}: {}",
                key.account(),
                e
            ))),
        }
    }

    fn set(&self, key: SecretKey, value: &str) -> Result<()> {
        self.entry(key)?.set_password(value).map_err(|e| {
            ApiError::Keyring(format!("failed to store {}: {}", key.account(), e))
        })
    }

    fn delete(&self, key: SecretKey) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(ApiError::Keyring(format!(
                "failed to delete {}: {}",
                key.account(),
                e
            ))),
        }
    }
}

/// Credentials taken from `JIRA_URL` / `JIRA_TOKEN`.
#[derive(Clone, Default)]
pub struct EnvCredentials {
    pub url: Option<String>,
    pub token: Option<String>,
}

impl EnvCredentials {
    /// Snapshot the process environment. Empty variables count as unset.
    pub fn from_env() -> Self {
        Self {
            url: populated(std::env::var(ENV_JIRA_URL).ok()),
            token: populated(std::env::var(ENV_JIRA_TOKEN).ok()),
        }
    }
}

impl fmt::Debug for EnvCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvCredentials")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Resolves [`Credentials`] from the command line, a secret store and the
/// environment.
#[derive(Debug)]
pub struct CredentialResolver<S> {
    store: S,
    env: EnvCredentials,
}

impl<S: SecretStore> CredentialResolver<S> {
    pub fn new(store: S, env: EnvCredentials) -> Self {
        Self { store, env }
    }

    /// Resolve the credentials for this run.
    ///
    /// URL and token are resolved independently; for each, the first populated
    /// source wins: command-line override (URL only), secret store, environment.
    /// An unreadable secret store is logged and treated as empty.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::MissingCredentials` if no URL or no token is found.
    #[instrument(skip(self))]
    pub fn resolve(&self, cli_url: Option<&str>, verify_ssl: bool) -> Result<Credentials> {
        let (stored_url, stored_token, store_available) = match self.read_store() {
            Ok((url, token)) => (url, token, true),
            Err(e) => {
                warn!("Secret store unavailable, falling back to environment: {}", e);
                (None, None, false)
            }
        };

        let (url, url_source) = first_populated([
            (cli_url.map(str::to_string), CredentialSource::CommandLine),
            (stored_url.clone(), CredentialSource::SecretStore),
            (self.env.url.clone(), CredentialSource::Environment),
        ])
        .ok_or_else(|| {
            ApiError::MissingCredentials(format!(
                "no JIRA URL found; pass --jira-url or set {}",
                ENV_JIRA_URL
            ))
        })?;

        let (token, token_source) = first_populated([
            (stored_token.clone(), CredentialSource::SecretStore),
            (self.env.token.clone(), CredentialSource::Environment),
        ])
        .ok_or_else(|| {
            ApiError::MissingCredentials(format!(
                "no JIRA token found; run `jira auth login` or set {}",
                ENV_JIRA_TOKEN
            ))
        })?;

        let credentials = Credentials::new(&url, &token, verify_ssl)?;
        info!(
            base_url = %credentials.base_url(),
            ?url_source,
            ?token_source,
            "Resolved JIRA credentials"
        );

        if store_available && token_source == CredentialSource::Environment {
            self.persist_discovered(&credentials, &token, stored_url.is_none());
        }

        Ok(credentials)
    }

    /// Save a URL and token for future runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the values are invalid or the store rejects them.
    pub fn store(&self, url: Option<&str>, token: &str) -> Result<()> {
        let token = validate_token(token)?;
        if let Some(url) = url {
            let url = normalize_base_url(url)?;
            self.store.set(SecretKey::Url, &url)?;
        }
        self.store.set(SecretKey::Token, &token)?;
        info!("Stored JIRA credentials in secret store");
        Ok(())
    }

    /// Remove any stored URL and token.
    pub fn clear(&self) -> Result<()> {
        self.store.delete(SecretKey::Token)?;
        self.store.delete(SecretKey::Url)?;
        info!("Removed JIRA credentials from secret store");
        Ok(())
    }

    fn read_store(&self) -> Result<(Option<String>, Option<String>)> {
        let url = populated(self.store.get(SecretKey::Url)?);
        let token = populated(self.store.get(SecretKey::Token)?);
        debug!(
            has_url = url.is_some(),
            has_token = token.is_some(),
            "Read secret store"
        );
        Ok((url, token))
    }

    /// Best-effort copy of an environment token into the store.
    fn persist_discovered(&self, credentials: &Credentials, token: &str, store_url: bool) {
        if let Err(e) = self.store.set(SecretKey::Token, token) {
            warn!("Could not save token to secret store: {}", e);
            return;
        }
        if store_url {
            if let Err(e) = self.store.set(SecretKey::Url, credentials.base_url()) {
                warn!("Could not save URL to secret store: {}", e);
                return;
            }
        }
        info!("Saved token from {} to secret store", ENV_JIRA_TOKEN);
    }
}

/// Normalize a JIRA base URL.
///
/// Trims whitespace, assumes `https://` when no scheme is given and removes
/// trailing slashes.
pub fn normalize_base_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ApiError::MissingCredentials(
            "JIRA URL is empty".to_string(),
        ));
    }

    let url = if url.starts_with("https://") || url.starts_with("http://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };
    let url = url.trim_end_matches('/').to_string();

    if url == "https:" || url == "http:" {
        return Err(ApiError::InvalidUrl(url));
    }

    // Warn if not HTTPS (but don't enforce for localhost/testing)
    if !url.starts_with("https://") && !url.contains("localhost") && !url.contains("127.0.0.1")
    {
        warn!("URL does not use HTTPS: {}. This is insecure for production use.", url);
    }

    Ok(url)
}

/// Validate a token entered by the user.
pub fn validate_token(token: &str) -> Result<String> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::MissingCredentials(
            "token cannot be empty".to_string(),
        ));
    }
    if token.len() < MIN_TOKEN_LEN {
        return Err(ApiError::MissingCredentials(
            "token appears to be too short".to_string(),
        ));
    }
    Ok(token.to_string())
}

fn populated(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn first_populated<const N: usize>(
    candidates: [(Option<String>, CredentialSource); N],
) -> Option<(String, CredentialSource)> {
    candidates
        .into_iter()
        .find_map(|(value, source)| populated(value).map(|v| (v, source)))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use serial_test::serial;

    use super::*;
    use crate::api::error::ErrorKind;

    #[derive(Default)]
    struct MemoryStore {
        entries: RefCell<HashMap<SecretKey, String>>,
        writes: RefCell<u32>,
    }

    impl MemoryStore {
        fn with(url: Option<&str>, token: Option<&str>) -> Self {
            let store = Self::default();
            if let Some(url) = url {
                store
                    .entries
                    .borrow_mut()
                    .insert(SecretKey::Url, url.to_string());
            }
            if let Some(token) = token {
                store
                    .entries
                    .borrow_mut()
                    .insert(SecretKey::Token, token.to_string());
            }
            store
        }

        fn value(&self, key: SecretKey) -> Option<String> {
            self.entries.borrow().get(&key).cloned()
        }
    }

    impl SecretStore for MemoryStore {
        fn get(&self, key: SecretKey) -> Result<Option<String>> {
            Ok(self.value(key))
        }

        fn set(&self, key: SecretKey, value: &str) -> Result<()> {
            *self.writes.borrow_mut() += 1;
            self.entries.borrow_mut().insert(key, value.to_string());
            Ok(())
        }

        fn delete(&self, key: SecretKey) -> Result<()> {
            self.entries.borrow_mut().remove(&key);
            Ok(())
        }
    }

    struct UnavailableStore;

    impl SecretStore for UnavailableStore {
        fn get(&self, _key: SecretKey) -> Result<Option<String>> {
            Err(ApiError::Keyring("no secret service".to_string()))
        }

        fn set(&self, _key: SecretKey, _value: &str) -> Result<()> {
            Err(ApiError::Keyring("no secret service".to_string()))
        }

        fn delete(&self, _key: SecretKey) -> Result<()> {
            Err(ApiError::Keyring("no secret service".to_string()))
        }
    }

    fn env(url: Option<&str>, token: Option<&str>) -> EnvCredentials {
        EnvCredentials {
            url: url.map(str::to_string),
            token: token.map(str::to_string),
        }
    }

    #[test]
    fn test_cli_url_wins_over_store_and_env() {
        let store = MemoryStore::with(Some("https://stored.example.com"), Some("stored-token"));
        let resolver = CredentialResolver::new(
            &store,
            env(Some("https://env.example.com"), Some("env-token-value")),
        );

        let creds = resolver
            .resolve(Some("https://cli.example.com"), true)
            .unwrap();
        assert_eq!(creds.base_url(), "https://cli.example.com");
    }

    #[test]
    fn test_stored_url_wins_over_env() {
        let store = MemoryStore::with(Some("https://stored.example.com"), Some("stored-token"));
        let resolver = CredentialResolver::new(
            &store,
            env(Some("https://env.example.com"), Some("env-token-value")),
        );

        let creds = resolver.resolve(None, true).unwrap();
        assert_eq!(creds.base_url(), "https://stored.example.com");
        assert_eq!(creds.header_value(), "Bearer stored-token");
    }

    #[test]
    fn test_env_url_used_when_nothing_else() {
        let store = MemoryStore::with(None, Some("stored-token"));
        let resolver =
            CredentialResolver::new(&store, env(Some("https://env.example.com/"), None));

        let creds = resolver.resolve(None, true).unwrap();
        assert_eq!(creds.base_url(), "https://env.example.com");
    }

    #[test]
    fn test_empty_cli_url_falls_through() {
        let store = MemoryStore::with(Some("https://stored.example.com"), Some("stored-token"));
        let resolver = CredentialResolver::new(&store, EnvCredentials::default());

        let creds = resolver.resolve(Some("  "), true).unwrap();
        assert_eq!(creds.base_url(), "https://stored.example.com");
    }

    #[test]
    fn test_env_token_is_persisted_with_url() {
        let store = MemoryStore::default();
        let resolver = CredentialResolver::new(
            &store,
            env(Some("https://env.example.com"), Some("env-token-value")),
        );

        let creds = resolver.resolve(None, false).unwrap();
        assert!(!creds.verify_ssl());
        assert_eq!(
            store.value(SecretKey::Token).as_deref(),
            Some("env-token-value")
        );
        assert_eq!(
            store.value(SecretKey::Url).as_deref(),
            Some("https://env.example.com")
        );
    }

    #[test]
    fn test_stored_token_is_not_rewritten() {
        let store = MemoryStore::with(Some("https://stored.example.com"), Some("stored-token"));
        let resolver = CredentialResolver::new(&store, env(None, Some("env-token-value")));

        let creds = resolver.resolve(None, true).unwrap();
        assert_eq!(creds.header_value(), "Bearer stored-token");
        assert_eq!(*store.writes.borrow(), 0);
    }

    #[test]
    fn test_missing_token_is_auth_error() {
        let store = MemoryStore::default();
        let resolver = CredentialResolver::new(&store, env(Some("https://env.example.com"), None));

        let err = resolver.resolve(None, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(err.to_string().contains("auth login"));
    }

    #[test]
    fn test_missing_url_is_auth_error() {
        let store = MemoryStore::with(None, Some("stored-token"));
        let resolver = CredentialResolver::new(&store, EnvCredentials::default());

        let err = resolver.resolve(None, true).unwrap_err();
        assert!(matches!(err, ApiError::MissingCredentials(_)));
    }

    #[test]
    fn test_unavailable_store_falls_back_to_env() {
        let resolver = CredentialResolver::new(
            UnavailableStore,
            env(Some("https://env.example.com"), Some("env-token-value")),
        );

        let creds = resolver.resolve(None, true).unwrap();
        assert_eq!(creds.base_url(), "https://env.example.com");
        assert_eq!(creds.header_value(), "Bearer env-token-value");
    }

    #[test]
    fn test_store_and_clear() {
        let store = MemoryStore::default();
        let resolver = CredentialResolver::new(&store, EnvCredentials::default());

        resolver
            .store(Some("jira.example.com/"), "  a-long-token  ")
            .unwrap();
        assert_eq!(
            store.value(SecretKey::Url).as_deref(),
            Some("https://jira.example.com")
        );
        assert_eq!(
            store.value(SecretKey::Token).as_deref(),
            Some("a-long-token")
        );

        resolver.clear().unwrap();
        assert!(store.value(SecretKey::Url).is_none());
        assert!(store.value(SecretKey::Token).is_none());
    }

    #[test]
    fn test_store_rejects_short_token() {
        let store = MemoryStore::default();
        let resolver = CredentialResolver::new(&store, EnvCredentials::default());

        assert!(resolver.store(None, "short").is_err());
        assert!(store.value(SecretKey::Token).is_none());
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://company.atlassian.net///").unwrap(),
            "https://company.atlassian.net"
        );
        assert_eq!(
            normalize_base_url(" jira.company.com ").unwrap(),
            "https://jira.company.com"
        );
        assert_eq!(
            normalize_base_url("https://company.com/jira/").unwrap(),
            "https://company.com/jira"
        );
        assert!(normalize_base_url("").is_err());
    }

    #[test]
    fn test_credentials_do_not_expose_token() {
        let creds = Credentials::new("https://jira.example.com", "secret_token", true).unwrap();
        let debug_output = format!("{:?}", creds);
        assert!(!debug_output.contains("secret_token"));

        let env = env(None, Some("secret_token"));
        assert!(!format!("{:?}", env).contains("secret_token"));
    }

    #[test]
    fn test_credentials_reject_empty_token() {
        assert!(Credentials::new("https://jira.example.com", " ", true).is_err());
    }

    #[test]
    #[serial]
    fn test_env_credentials_from_env() {
        std::env::set_var(ENV_JIRA_URL, "https://env.example.com");
        std::env::set_var(ENV_JIRA_TOKEN, "");

        let env = EnvCredentials::from_env();
        assert_eq!(env.url.as_deref(), Some("https://env.example.com"));
        assert!(env.token.is_none());

        std::env::remove_var(ENV_JIRA_URL);
        std::env::remove_var(ENV_JIRA_TOKEN);
    }
}
