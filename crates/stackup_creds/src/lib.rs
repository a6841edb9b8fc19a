//! # stackup_creds
//!
//! Credential and certificate provisioning for stackup.
//!
//! This crate owns the two idempotent leaves of a provisioning run:
//!
//! - **Store**: a permission-restricted TOML credential file with atomic
//!   replace semantics and an advisory lock around generation
//! - **Materializer**: load-or-generate for the stack's credential set
//! - **Pki**: load-or-issue for the self-signed TLS bundle covering the
//!   stack's ingress hostnames
//!
//! Both the materializer and the issuer return existing material unchanged
//! unless regeneration is forced; generation always persists atomically
//! before returning, so a partially written set is never observable.

pub mod error;
pub mod materializer;
pub mod pki;
pub mod store;

pub use error::{CredsError, CredsResult};
pub use materializer::{ADMIN_PASSWORD, DATABASE_TOKEN, SERVICE_TOKEN};
pub use pki::CertificateBundle;
pub use store::{CredentialEntry, CredentialSet, CredentialStore, StoreLock};
