//! Secret materializer: load-or-generate for the stack's credential set.
//!
//! Values are only generated on first run or forced regeneration; every
//! subsequent run loads the persisted set unchanged. Generated values are
//! safe to embed in shell, YAML and URLs.

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};

use crate::error::CredsResult;
use crate::store::{CredentialSet, CredentialStore};

/// Admin token for the time-series database.
pub const DATABASE_TOKEN: &str = "database-token";

/// Bootstrap admin password for the dashboard UI.
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Long-lived service-account token minted after deployment.
///
/// Not managed here: the token exchange step appends it via
/// [`CredentialStore::upsert`], and regeneration of the managed names
/// leaves it untouched.
pub const SERVICE_TOKEN: &str = "grafana-service-token";

/// Names generated and owned by the materializer.
const MANAGED_NAMES: [&str; 2] = [DATABASE_TOKEN, ADMIN_PASSWORD];

/// InfluxDB v3 tokens carry this prefix.
const TOKEN_PREFIX: &str = "apiv3_";
const TOKEN_RANDOM_LEN: usize = 40;
const PASSWORD_LEN: usize = 24;

/// Obtain the credential set for a provisioning run.
///
/// If the store already holds every managed credential and regeneration is
/// not forced, the persisted set is returned unchanged with no side
/// effects. Otherwise fresh values are generated for the managed names,
/// merged over any existing entries (unmanaged keys survive), and the full
/// set is persisted atomically before it is returned.
pub fn obtain(store: &CredentialStore, force_regenerate: bool) -> CredsResult<CredentialSet> {
    if !force_regenerate {
        if let Some(set) = store.load()? {
            if MANAGED_NAMES.iter().all(|name| set.contains(name)) {
                debug!("loaded existing credential set");
                return Ok(set);
            }
            info!("credential store is missing managed entries, generating them");
        }
    }

    let _lock = store.lock()?;

    let mut set = store.load()?.unwrap_or_default();
    set.insert(DATABASE_TOKEN, generate_token());
    set.insert(ADMIN_PASSWORD, generate_password());

    store.persist(&set)?;
    info!(path = %store.path().display(), "generated and persisted credential set");
    Ok(set)
}

/// Generate a database admin token: `apiv3_` plus random alphanumerics.
fn generate_token() -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{TOKEN_PREFIX}{random}")
}

/// Generate a fixed-length password from base64 material.
///
/// `+`, `/` and `=` would need quoting in shell, YAML and URLs, so they
/// are stripped and more material is drawn until the target length is met.
fn generate_password() -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    let mut password = String::new();
    let mut rng = rand::thread_rng();

    while password.len() < PASSWORD_LEN {
        let raw: [u8; 32] = rng.gen();
        let encoded = STANDARD.encode(raw);
        password.extend(encoded.chars().filter(|c| c.is_ascii_alphanumeric()));
    }

    password.truncate(PASSWORD_LEN);
    password
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("credentials.toml"))
    }

    #[test]
    fn test_generated_token_shape() {
        let token = generate_token();
        assert!(token.starts_with("apiv3_"));
        assert_eq!(token.len(), TOKEN_PREFIX.len() + TOKEN_RANDOM_LEN);
        assert!(token[TOKEN_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_password_shape() {
        let password = generate_password();
        assert_eq!(password.len(), PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_obtain_generates_on_first_run() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let set = obtain(&store, false).unwrap();
        assert!(set.get(DATABASE_TOKEN).unwrap().starts_with("apiv3_"));
        assert_eq!(set.get(ADMIN_PASSWORD).unwrap().len(), PASSWORD_LEN);
        assert!(store.exists());
    }

    #[test]
    fn test_obtain_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let first = obtain(&store, false).unwrap();
        let second = obtain(&store, false).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_forced_regeneration_replaces_every_managed_value() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let first = obtain(&store, false).unwrap();
        let second = obtain(&store, true).unwrap();

        for name in MANAGED_NAMES {
            assert_ne!(first.get(name), second.get(name), "{name} was not rotated");
        }
    }

    #[test]
    fn test_regeneration_preserves_unmanaged_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        obtain(&store, false).unwrap();
        store.upsert(SERVICE_TOKEN, "glsa_existing").unwrap();

        let set = obtain(&store, true).unwrap();
        assert_eq!(set.get(SERVICE_TOKEN), Some("glsa_existing"));
    }

    #[test]
    fn test_partial_store_is_completed() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(DATABASE_TOKEN, "apiv3_only").unwrap();

        let set = obtain(&store, false).unwrap();
        assert!(set.contains(ADMIN_PASSWORD));
        // Managed names are regenerated together.
        assert_ne!(set.get(DATABASE_TOKEN), Some("apiv3_only"));
    }
}
