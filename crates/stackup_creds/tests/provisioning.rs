//! Crate-level provisioning behavior: idempotent re-runs and rotation.

use std::fs;

use tempfile::TempDir;

use stackup_creds::{materializer, pki, CredentialStore, ADMIN_PASSWORD, DATABASE_TOKEN};

#[test]
fn rerun_without_force_performs_no_generation_side_effects() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::new(dir.path().join("credentials.toml"));
    let bundle_path = dir.path().join("tls-bundle.pem");
    let alt_names = vec![
        "tig-grafana.tig-influx.test".to_string(),
        "tig-explorer.tig-influx.test".to_string(),
    ];

    let creds_first = materializer::obtain(&store, false).unwrap();
    let bundle_first = pki::obtain("tig-influx.test", &alt_names, &bundle_path, false).unwrap();

    let creds_bytes = fs::read(store.path()).unwrap();
    let bundle_bytes = fs::read(&bundle_path).unwrap();

    let creds_second = materializer::obtain(&store, false).unwrap();
    let bundle_second = pki::obtain("tig-influx.test", &alt_names, &bundle_path, false).unwrap();

    // Loaded values match the generated ones.
    assert_eq!(creds_first, creds_second);
    assert_eq!(bundle_first.certificate_pem, bundle_second.certificate_pem);
    assert_eq!(bundle_first.private_key_pem, bundle_second.private_key_pem);

    // And the on-disk state was not rewritten.
    assert_eq!(creds_bytes, fs::read(store.path()).unwrap());
    assert_eq!(bundle_bytes, fs::read(&bundle_path).unwrap());
}

#[test]
fn forced_regeneration_rotates_values_but_not_store_layout() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::new(dir.path().join("credentials.toml"));

    let first = materializer::obtain(&store, false).unwrap();
    store.upsert("grafana-service-token", "glsa_keepme").unwrap();

    let second = materializer::obtain(&store, true).unwrap();

    assert_ne!(first.get(DATABASE_TOKEN), second.get(DATABASE_TOKEN));
    assert_ne!(first.get(ADMIN_PASSWORD), second.get(ADMIN_PASSWORD));
    assert_eq!(second.get("grafana-service-token"), Some("glsa_keepme"));
}

#[test]
fn fresh_run_produces_embeddable_values_and_covering_certificate() {
    let dir = TempDir::new().unwrap();
    let store = CredentialStore::new(dir.path().join("credentials.toml"));

    let creds = materializer::obtain(&store, false).unwrap();

    let token = creds.get(DATABASE_TOKEN).unwrap();
    assert!(token.starts_with("apiv3_"));
    assert!(token["apiv3_".len()..].chars().all(|c| c.is_ascii_alphanumeric()));

    let password = creds.get(ADMIN_PASSWORD).unwrap();
    assert_eq!(password.len(), 24);
    assert!(!password.contains(['+', '/', '=']));

    let alt_names = vec![
        "tig-grafana.tig-influx.test".to_string(),
        "tig-explorer.tig-influx.test".to_string(),
    ];
    let bundle = pki::obtain(
        "tig-influx.test",
        &alt_names,
        &dir.path().join("tls-bundle.pem"),
        false,
    )
    .unwrap();

    for name in &alt_names {
        assert!(bundle.covers(name), "SAN set does not cover {name}");
    }
}
