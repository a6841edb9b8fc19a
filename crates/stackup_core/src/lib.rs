//! # stackup_core
//!
//! Core provisioning primitives for stackup.
//!
//! This crate provides the pieces every provisioning phase shares:
//!
//! - **Context**: an explicit configuration struct threaded through each
//!   phase, replacing ambient globals
//! - **Poll**: a bounded condition-poll abstraction for external readiness
//! - **Summary**: aggregation of non-fatal outcomes for the end-of-run report
//! - **Error**: run-level error types (prerequisites, cancellation)
//!
//! # Example
//!
//! ```rust
//! use stackup_core::ProvisionContext;
//!
//! let ctx = ProvisionContext::new(
//!     "tig-influx",
//!     "tig-influx.test",
//!     "manifests/monitoring-stack.yaml",
//!     ".stackup",
//! );
//! assert_eq!(ctx.grafana_host(), "tig-grafana.tig-influx.test");
//! ```

pub mod context;
pub mod error;
pub mod poll;
pub mod summary;

pub use context::{
    ProvisionContext, CREDENTIALS_FILE, DEFAULT_DOMAIN, DEFAULT_NAMESPACE, TLS_BUNDLE_FILE,
};
pub use error::{CoreError, CoreResult};
pub use poll::{poll_until, PollConfig, PollOutcome, PollStatus};
pub use summary::{PhaseReport, PhaseStatus, RunSummary};
