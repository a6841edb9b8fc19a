//! # stackup_kube
//!
//! Resource apply and readiness awaiting for stackup.
//!
//! The external declarative system is reached through the `kubectl` CLI
//! behind the [`ClusterRunner`] trait seam, so every operation can be
//! exercised against a fake runner in tests:
//!
//! - **Applier**: submits a rendered manifest in one `kubectl apply -f -`
//!   call with no automatic retry
//! - **Readiness**: awaits an ordered sequence of per-resource readiness
//!   specs with bounded timeouts, reporting `Ready`, `TimedOut` or
//!   `NotFound` per resource and continuing past timeouts

pub mod applier;
pub mod error;
pub mod readiness;
pub mod runner;

pub use applier::{ApplyOutcome, ResourceApplier};
pub use error::{KubeError, KubeResult};
pub use readiness::{
    ReadinessCondition, ReadinessOutcome, ReadinessReport, ReadinessWaiter, ResourceKind,
    ResourceReadinessSpec,
};
pub use runner::{kubectl_path, ClusterRunner, CommandOutput, KubectlRunner};
