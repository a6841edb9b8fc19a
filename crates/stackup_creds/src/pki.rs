//! Certificate issuer: load-or-issue for the self-signed TLS bundle.
//!
//! The certificate and private key live together in one combined PEM file
//! written atomically, so a mismatched pair (old cert, new key) can never
//! be observed. A persisted bundle is reused as long as it matches the
//! requested domain, covers every requested hostname and has not expired;
//! staleness short of expiry is exposed as an advisory check only.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rcgen::{CertificateParams, DistinguishedName, DnType, DnValue, KeyPair};
use tempfile::NamedTempFile;
use ::time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};
use x509_parser::prelude::*;

use crate::error::{CredsError, CredsResult};
use crate::store::{restrict_to_owner, StoreLock};

/// Validity window for issued certificates, in days.
pub const VALIDITY_DAYS: i64 = 825;

/// A self-signed certificate and its private key.
#[derive(Clone)]
pub struct CertificateBundle {
    /// Subject common name
    pub subject_domain: String,
    /// SAN entries other than the subject domain
    pub alternate_names: Vec<String>,
    /// PEM-encoded certificate
    pub certificate_pem: String,
    /// PEM-encoded private key
    pub private_key_pem: String,
    /// End of the validity window
    pub not_after: OffsetDateTime,
}

impl CertificateBundle {
    /// All DNS names the certificate covers.
    pub fn san_names(&self) -> Vec<String> {
        let mut names = vec![self.subject_domain.clone()];
        for name in &self.alternate_names {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Whether the certificate covers the given hostname.
    pub fn covers(&self, name: &str) -> bool {
        self.subject_domain == name || self.alternate_names.iter().any(|n| n == name)
    }

    /// Whether the validity window has ended.
    pub fn is_expired(&self) -> bool {
        self.not_after <= OffsetDateTime::now_utc()
    }

    /// Advisory staleness check: does the certificate expire within the
    /// given horizon?
    pub fn expires_within(&self, days: i64) -> bool {
        self.not_after <= OffsetDateTime::now_utc() + Duration::days(days)
    }
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("subject_domain", &self.subject_domain)
            .field("alternate_names", &self.alternate_names)
            .field("private_key_pem", &"<redacted>")
            .field("not_after", &self.not_after)
            .finish()
    }
}

/// Obtain the TLS bundle for a provisioning run.
///
/// Reuses a persisted bundle when it matches the requested domain, covers
/// every requested alternate name and has not expired; otherwise issues a
/// fresh key pair and self-signed certificate and persists both atomically
/// before returning.
pub fn obtain(
    domain: &str,
    alternate_names: &[String],
    bundle_path: &Path,
    force_regenerate: bool,
) -> CredsResult<CertificateBundle> {
    if !force_regenerate && bundle_path.exists() {
        match load(bundle_path) {
            Ok(bundle) => {
                let covered = alternate_names.iter().all(|n| bundle.covers(n));
                if bundle.subject_domain == domain && covered && !bundle.is_expired() {
                    debug!(path = %bundle_path.display(), "loaded existing TLS bundle");
                    return Ok(bundle);
                }
                if bundle.is_expired() {
                    warn!("persisted TLS bundle has expired, reissuing");
                } else {
                    warn!(
                        subject = %bundle.subject_domain,
                        "persisted TLS bundle does not cover the requested names, reissuing"
                    );
                }
            }
            Err(e) => warn!(error = %e, "persisted TLS bundle is unreadable, reissuing"),
        }
    }

    let _lock = StoreLock::acquire(lock_path(bundle_path))?;

    let not_before = OffsetDateTime::now_utc();
    let bundle = issue(
        domain,
        alternate_names,
        not_before,
        not_before + Duration::days(VALIDITY_DAYS),
    )?;
    persist_bundle(bundle_path, &bundle)?;
    info!(path = %bundle_path.display(), subject = %domain, "issued and persisted TLS bundle");
    Ok(bundle)
}

/// Load and parse a persisted bundle.
pub fn load(bundle_path: &Path) -> CredsResult<CertificateBundle> {
    let text = fs::read_to_string(bundle_path)?;
    let blocks = ::pem::parse_many(text.as_bytes())
        .map_err(|e| CredsError::CertificateParse(e.to_string()))?;

    let mut certificate_pem = None;
    let mut private_key_pem = None;
    let mut cert_der = None;

    for block in &blocks {
        if block.tag() == "CERTIFICATE" {
            certificate_pem = Some(::pem::encode(block));
            cert_der = Some(block.contents().to_vec());
        } else if block.tag().ends_with("PRIVATE KEY") {
            private_key_pem = Some(::pem::encode(block));
        }
    }

    let certificate_pem = certificate_pem.ok_or_else(|| {
        CredsError::CertificateParse(format!("no certificate block in {}", bundle_path.display()))
    })?;
    let private_key_pem = private_key_pem.ok_or_else(|| {
        CredsError::CertificateParse(format!("no private key block in {}", bundle_path.display()))
    })?;
    let cert_der = cert_der.unwrap_or_default();

    let (_, cert) = X509Certificate::from_der(&cert_der)
        .map_err(|e| CredsError::CertificateParse(e.to_string()))?;

    let subject_domain = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or_default()
        .to_string();

    let san_names: Vec<String> = cert
        .subject_alternative_name()
        .map_err(|e| CredsError::CertificateParse(e.to_string()))?
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|gn| match gn {
                    GeneralName::DNSName(name) => Some(name.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let alternate_names = san_names
        .into_iter()
        .filter(|n| *n != subject_domain)
        .collect();

    Ok(CertificateBundle {
        subject_domain,
        alternate_names,
        certificate_pem,
        private_key_pem,
        not_after: cert.validity().not_after.to_datetime(),
    })
}

/// Issue a fresh key pair and self-signed certificate.
fn issue(
    domain: &str,
    alternate_names: &[String],
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
) -> CredsResult<CertificateBundle> {
    let mut san = vec![domain.to_string()];
    for name in alternate_names {
        if !san.contains(name) {
            san.push(name.clone());
        }
    }

    let mut params = CertificateParams::new(san)
        .map_err(|e| CredsError::IssuanceFailed(format!("invalid SAN set: {e}")))?;

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, DnValue::Utf8String(domain.to_string()));
    params.distinguished_name = dn;
    params.not_before = not_before;
    params.not_after = not_after;

    let key_pair = KeyPair::generate()
        .map_err(|e| CredsError::IssuanceFailed(format!("key generation failed: {e}")))?;

    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| CredsError::IssuanceFailed(format!("self-signing failed: {e}")))?;

    Ok(CertificateBundle {
        subject_domain: domain.to_string(),
        alternate_names: alternate_names
            .iter()
            .filter(|n| n.as_str() != domain)
            .cloned()
            .collect(),
        certificate_pem: cert.pem(),
        private_key_pem: key_pair.serialize_pem(),
        not_after,
    })
}

fn lock_path(bundle_path: &Path) -> PathBuf {
    let mut name = bundle_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tls-bundle".to_string());
    name.push_str(".lock");
    bundle_path.with_file_name(name)
}

/// Write key and certificate as one combined PEM file, atomically.
fn persist_bundle(bundle_path: &Path, bundle: &CertificateBundle) -> CredsResult<()> {
    let parent = bundle_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let unwritable = |message: String| CredsError::StoreUnwritable {
        path: bundle_path.to_path_buf(),
        message,
    };

    fs::create_dir_all(&parent).map_err(|e| unwritable(e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| unwritable(e.to_string()))?;
    tmp.write_all(bundle.private_key_pem.as_bytes())
        .and_then(|_| tmp.write_all(bundle.certificate_pem.as_bytes()))
        .map_err(|e| unwritable(e.to_string()))?;

    restrict_to_owner(tmp.as_file()).map_err(|e| unwritable(e.to_string()))?;

    tmp.persist(bundle_path)
        .map_err(|e| unwritable(e.to_string()))?;

    Ok(())
}
