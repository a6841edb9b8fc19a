//! End-of-run outcome aggregation.
//!
//! Non-fatal conditions (readiness timeouts, a failed token exchange) are
//! collected here during the run and surfaced in one final report instead
//! of being raised individually.

use serde::{Deserialize, Serialize};

/// Outcome of a single run phase or per-resource check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseStatus {
    Ok,
    Warning,
    Failed,
    Skipped,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARN",
            Self::Failed => "FAIL",
            Self::Skipped => "SKIP",
        }
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single named entry in the run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    /// Phase or resource name
    pub phase: String,
    pub status: PhaseStatus,
    /// Human-readable detail
    pub detail: String,
    /// Manual-recovery hint for non-fatal conditions
    pub hint: Option<String>,
}

/// Aggregated report for one provisioning run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub reports: Vec<PhaseReport>,
    /// Whether the run was cancelled by the user
    pub cancelled: bool,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful phase.
    pub fn add_ok(&mut self, phase: impl Into<String>, detail: impl Into<String>) {
        self.reports.push(PhaseReport {
            phase: phase.into(),
            status: PhaseStatus::Ok,
            detail: detail.into(),
            hint: None,
        });
    }

    /// Record a non-fatal condition with a manual-recovery hint.
    pub fn add_warning(
        &mut self,
        phase: impl Into<String>,
        detail: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.reports.push(PhaseReport {
            phase: phase.into(),
            status: PhaseStatus::Warning,
            detail: detail.into(),
            hint: Some(hint.into()),
        });
    }

    /// Record a fatal phase failure.
    pub fn add_failure(&mut self, phase: impl Into<String>, detail: impl Into<String>) {
        self.reports.push(PhaseReport {
            phase: phase.into(),
            status: PhaseStatus::Failed,
            detail: detail.into(),
            hint: None,
        });
    }

    /// Record a phase that did not run.
    pub fn add_skipped(&mut self, phase: impl Into<String>, detail: impl Into<String>) {
        self.reports.push(PhaseReport {
            phase: phase.into(),
            status: PhaseStatus::Skipped,
            detail: detail.into(),
            hint: None,
        });
    }

    /// Mark the run as cancelled by the user.
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Whether no phase failed fatally.
    pub fn succeeded(&self) -> bool {
        !self
            .reports
            .iter()
            .any(|r| r.status == PhaseStatus::Failed)
    }

    /// Whether any non-fatal condition was recorded.
    pub fn has_warnings(&self) -> bool {
        self.reports
            .iter()
            .any(|r| r.status == PhaseStatus::Warning)
    }

    /// Iterate over recorded warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &PhaseReport> {
        self.reports
            .iter()
            .filter(|r| r.status == PhaseStatus::Warning)
    }
}
