//! Provisioning context containing run parameters and derived values.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default namespace for the monitoring stack.
pub const DEFAULT_NAMESPACE: &str = "tig-influx";

/// Default base domain for ingress hostnames.
pub const DEFAULT_DOMAIN: &str = "tig-influx.test";

/// File name of the credential store inside the state directory.
pub const CREDENTIALS_FILE: &str = "credentials.toml";

/// File name of the combined TLS certificate/key bundle inside the state directory.
pub const TLS_BUNDLE_FILE: &str = "tls-bundle.pem";

/// Provisioning context containing all run parameters.
///
/// Every phase receives this struct by reference; there are no ambient
/// globals. Derived values (ingress hostnames, state file paths) are
/// computed here so each phase sees the same view of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionContext {
    /// Unique run ID
    pub run_id: Uuid,
    /// Target namespace for the stack
    pub namespace: String,
    /// Base domain under which ingress hostnames are derived
    pub domain: String,
    /// Path to the manifest template
    pub manifest_path: PathBuf,
    /// Directory holding the credential store and TLS bundle
    pub state_dir: PathBuf,
    /// Render and validate only: no apply, no network calls
    pub dry_run: bool,
    /// Bypass the load-existing path for both secrets and certificates
    pub regenerate_creds: bool,
}

impl ProvisionContext {
    /// Create a new provisioning context.
    pub fn new(
        namespace: impl Into<String>,
        domain: impl Into<String>,
        manifest_path: impl Into<PathBuf>,
        state_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            namespace: namespace.into(),
            domain: domain.into(),
            manifest_path: manifest_path.into(),
            state_dir: state_dir.into(),
            dry_run: false,
            regenerate_creds: false,
        }
    }

    /// Enable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Force regeneration of credentials and certificates.
    pub fn with_regenerate_creds(mut self, regenerate: bool) -> Self {
        self.regenerate_creds = regenerate;
        self
    }

    /// Hostname of the dashboard UI ingress.
    pub fn grafana_host(&self) -> String {
        format!("tig-grafana.{}", self.domain)
    }

    /// Hostname of the database explorer UI ingress.
    pub fn explorer_host(&self) -> String {
        format!("tig-explorer.{}", self.domain)
    }

    /// All hostnames the rendered manifest references.
    ///
    /// The issued certificate's SAN set must cover every name in this list.
    pub fn ingress_hosts(&self) -> Vec<String> {
        vec![self.grafana_host(), self.explorer_host()]
    }

    /// Path of the credential store file.
    pub fn credentials_path(&self) -> PathBuf {
        self.state_dir.join(CREDENTIALS_FILE)
    }

    /// Path of the combined TLS certificate/key bundle.
    pub fn tls_bundle_path(&self) -> PathBuf {
        self.state_dir.join(TLS_BUNDLE_FILE)
    }
}

impl Default for ProvisionContext {
    fn default() -> Self {
        Self::new(
            DEFAULT_NAMESPACE,
            DEFAULT_DOMAIN,
            "manifests/monitoring-stack.yaml",
            ".stackup",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = ProvisionContext::new("tig-influx", "tig-influx.test", "stack.yaml", ".stackup");

        assert_eq!(ctx.namespace, "tig-influx");
        assert_eq!(ctx.domain, "tig-influx.test");
        assert!(!ctx.dry_run);
        assert!(!ctx.regenerate_creds);
    }

    #[test]
    fn test_derived_hostnames() {
        let ctx = ProvisionContext::default();

        assert_eq!(ctx.grafana_host(), "tig-grafana.tig-influx.test");
        assert_eq!(ctx.explorer_host(), "tig-explorer.tig-influx.test");
        assert_eq!(ctx.ingress_hosts().len(), 2);
    }

    #[test]
    fn test_state_paths() {
        let ctx = ProvisionContext::default();

        assert_eq!(
            ctx.credentials_path(),
            PathBuf::from(".stackup/credentials.toml")
        );
        assert_eq!(ctx.tls_bundle_path(), PathBuf::from(".stackup/tls-bundle.pem"));
    }

    #[test]
    fn test_builder_flags() {
        let ctx = ProvisionContext::default()
            .with_dry_run(true)
            .with_regenerate_creds(true);

        assert!(ctx.dry_run);
        assert!(ctx.regenerate_creds);
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = ProvisionContext::default();
        let b = ProvisionContext::default();
        assert_ne!(a.run_id, b.run_id);
    }
}
