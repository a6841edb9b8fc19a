//! Ordered readiness awaiting with per-resource outcomes.
//!
//! Specs are evaluated in the given order. A timeout on one resource is
//! reported for that resource specifically and processing continues, since
//! some readiness failures are transient and operator-diagnosable after
//! the fact. A namespace that never becomes active gates its dependent
//! resources: they are reported `NotFound` immediately instead of burning
//! their own timeouts.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stackup_core::poll::{poll_until, PollConfig, PollOutcome, PollStatus};
use tracing::info;

use crate::error::KubeResult;
use crate::runner::ClusterRunner;

/// Resource kinds the waiter knows how to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Namespace,
    Deployment,
    Pod,
    Job,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::Deployment => "deployment",
            Self::Pod => "pod",
            Self::Job => "job",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named readiness predicates of the external system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessCondition {
    NamespaceActive,
    DeploymentAvailable,
    PodReady,
    JobComplete,
}

impl ReadinessCondition {
    fn jsonpath(&self) -> &'static str {
        match self {
            Self::NamespaceActive => "jsonpath={.status.phase}",
            Self::DeploymentAvailable => {
                r#"jsonpath={.status.conditions[?(@.type=="Available")].status}"#
            }
            Self::PodReady => r#"jsonpath={.status.conditions[?(@.type=="Ready")].status}"#,
            Self::JobComplete => r#"jsonpath={.status.conditions[?(@.type=="Complete")].status}"#,
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            Self::NamespaceActive => "Active",
            _ => "True",
        }
    }
}

/// One entry in the ordered readiness plan.
#[derive(Debug, Clone)]
pub struct ResourceReadinessSpec {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    pub condition: ReadinessCondition,
    pub timeout: Duration,
}

impl ResourceReadinessSpec {
    /// Spec awaiting a namespace reaching the Active phase.
    pub fn namespace_active(name: impl Into<String>, timeout: Duration) -> Self {
        let name = name.into();
        Self {
            kind: ResourceKind::Namespace,
            namespace: name.clone(),
            name,
            condition: ReadinessCondition::NamespaceActive,
            timeout,
        }
    }

    /// Spec awaiting a deployment reporting the Available condition.
    pub fn deployment_available(
        name: impl Into<String>,
        namespace: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            kind: ResourceKind::Deployment,
            name: name.into(),
            namespace: namespace.into(),
            condition: ReadinessCondition::DeploymentAvailable,
            timeout,
        }
    }

    /// `kind/name` label used in logs and reports.
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.kind, self.name)
    }
}

/// Three-way outcome of awaiting one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// The condition was satisfied within the timeout.
    Ready,
    /// The resource appeared but the condition never held.
    TimedOut,
    /// The resource never appeared.
    NotFound,
}

/// Per-spec result of a readiness pass.
#[derive(Debug, Clone)]
pub struct ReadinessReport {
    pub resource: String,
    pub namespace: String,
    pub outcome: ReadinessOutcome,
    pub waited: Duration,
}

/// Awaits ordered readiness specs against the external system.
pub struct ReadinessWaiter {
    runner: Arc<dyn ClusterRunner>,
    interval: Duration,
}

impl ReadinessWaiter {
    pub fn new(runner: Arc<dyn ClusterRunner>) -> Self {
        Self {
            runner,
            interval: Duration::from_secs(5),
        }
    }

    /// Set the poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Await every spec in order, one report per spec.
    ///
    /// Never aborts on a timeout; later specs still run. A non-ready
    /// namespace short-circuits dependent specs in that namespace to
    /// `NotFound` without waiting.
    pub async fn await_ready(
        &self,
        specs: &[ResourceReadinessSpec],
    ) -> KubeResult<Vec<ReadinessReport>> {
        let mut reports = Vec::with_capacity(specs.len());
        let mut failed_namespaces: HashSet<String> = HashSet::new();

        for spec in specs {
            if spec.kind != ResourceKind::Namespace && failed_namespaces.contains(&spec.namespace)
            {
                info!(
                    resource = %spec.display_name(),
                    namespace = %spec.namespace,
                    "namespace not active, reporting resource as not found"
                );
                reports.push(ReadinessReport {
                    resource: spec.display_name(),
                    namespace: spec.namespace.clone(),
                    outcome: ReadinessOutcome::NotFound,
                    waited: Duration::ZERO,
                });
                continue;
            }

            let report = self.await_one(spec).await?;
            if spec.kind == ResourceKind::Namespace && report.outcome != ReadinessOutcome::Ready {
                failed_namespaces.insert(spec.name.clone());
            }
            reports.push(report);
        }

        Ok(reports)
    }

    async fn await_one(&self, spec: &ResourceReadinessSpec) -> KubeResult<ReadinessReport> {
        let display_name = spec.display_name();
        info!(resource = %display_name, timeout_s = spec.timeout.as_secs(), "awaiting readiness");

        let appeared = AtomicBool::new(false);
        let config = PollConfig {
            interval: self.interval,
            timeout: spec.timeout,
        };

        let outcome = poll_until::<_, _, crate::error::KubeError>(&config, &display_name, || {
            let appeared = &appeared;
            async move {
                match self.probe(spec).await? {
                    Some(observed) => {
                        appeared.store(true, Ordering::Relaxed);
                        if observed == spec.condition.expected() {
                            Ok(PollStatus::Satisfied)
                        } else {
                            Ok(PollStatus::Pending)
                        }
                    }
                    None => Ok(PollStatus::Pending),
                }
            }
        })
        .await?;

        let (outcome, waited) = match outcome {
            PollOutcome::Satisfied { waited } => (ReadinessOutcome::Ready, waited),
            PollOutcome::TimedOut { waited } => {
                if appeared.load(Ordering::Relaxed) {
                    (ReadinessOutcome::TimedOut, waited)
                } else {
                    (ReadinessOutcome::NotFound, waited)
                }
            }
        };

        Ok(ReadinessReport {
            resource: display_name,
            namespace: spec.namespace.clone(),
            outcome,
            waited,
        })
    }

    /// Probe the condition value, or `None` when the resource is absent.
    async fn probe(&self, spec: &ResourceReadinessSpec) -> KubeResult<Option<String>> {
        let jsonpath = spec.condition.jsonpath();
        let mut args = vec!["get", spec.kind.as_str(), spec.name.as_str()];
        if spec.kind != ResourceKind::Namespace {
            args.extend(["-n", spec.namespace.as_str()]);
        }
        args.extend(["-o", jsonpath]);

        let output = self.runner.run(&args, None).await?;
        if !output.success {
            return Ok(None);
        }
        Ok(Some(output.stdout.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::runner::CommandOutput;

    /// Fake cluster state keyed by resource name.
    #[derive(Default)]
    struct FakeCluster {
        /// Resources whose condition is satisfied
        ready: Vec<String>,
        /// Resources that exist but whose condition never holds
        stuck: Vec<String>,
        probes: AtomicU32,
        probed_names: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ClusterRunner for FakeCluster {
        async fn run(&self, args: &[&str], _stdin: Option<&str>) -> KubeResult<CommandOutput> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            let kind = args[1];
            let name = args[2].to_string();
            self.probed_names.lock().unwrap().push(name.clone());

            if self.ready.contains(&name) {
                let value = if kind == "namespace" { "Active" } else { "True" };
                Ok(CommandOutput::ok(value))
            } else if self.stuck.contains(&name) {
                let value = if kind == "namespace" { "Terminating" } else { "False" };
                Ok(CommandOutput::ok(value))
            } else {
                Ok(CommandOutput::failed(format!("Error from server (NotFound): {name}")))
            }
        }
    }

    fn fast_waiter(cluster: Arc<FakeCluster>) -> ReadinessWaiter {
        ReadinessWaiter::new(cluster).with_interval(Duration::from_millis(1))
    }

    fn short(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[tokio::test]
    async fn test_timeout_on_one_spec_does_not_abort_later_specs() {
        let cluster = Arc::new(FakeCluster {
            ready: vec!["tig-influx".into(), "grafana".into()],
            stuck: vec!["influxdb".into()],
            ..Default::default()
        });
        let waiter = fast_waiter(cluster);

        let specs = vec![
            ResourceReadinessSpec::namespace_active("tig-influx", short(20)),
            ResourceReadinessSpec::deployment_available("influxdb", "tig-influx", short(20)),
            ResourceReadinessSpec::deployment_available("grafana", "tig-influx", short(20)),
        ];

        let reports = waiter.await_ready(&specs).await.unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].outcome, ReadinessOutcome::Ready);
        assert_eq!(reports[1].outcome, ReadinessOutcome::TimedOut);
        assert_eq!(reports[2].outcome, ReadinessOutcome::Ready);
    }

    #[tokio::test]
    async fn test_absent_resource_reports_not_found() {
        let cluster = Arc::new(FakeCluster::default());
        let waiter = fast_waiter(cluster);

        let specs = vec![ResourceReadinessSpec::deployment_available(
            "ghost",
            "tig-influx",
            short(20),
        )];

        let reports = waiter.await_ready(&specs).await.unwrap();
        assert_eq!(reports[0].outcome, ReadinessOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_failed_namespace_short_circuits_dependents() {
        let cluster = Arc::new(FakeCluster::default());
        let waiter = fast_waiter(cluster.clone());

        let specs = vec![
            ResourceReadinessSpec::namespace_active("tig-influx", short(10)),
            ResourceReadinessSpec::deployment_available("influxdb", "tig-influx", short(10)),
            ResourceReadinessSpec::deployment_available("grafana", "tig-influx", short(10)),
        ];

        let reports = waiter.await_ready(&specs).await.unwrap();
        assert_eq!(reports[0].outcome, ReadinessOutcome::NotFound);
        assert_eq!(reports[1].outcome, ReadinessOutcome::NotFound);
        assert_eq!(reports[2].outcome, ReadinessOutcome::NotFound);

        // Dependent specs were never probed and burned no wait time.
        let probed = cluster.probed_names.lock().unwrap().clone();
        assert!(probed.iter().all(|n| n == "tig-influx"));
        assert_eq!(reports[1].waited, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_other_namespaces_are_not_gated() {
        let cluster = Arc::new(FakeCluster {
            ready: vec!["other-ns".into(), "webapp".into()],
            ..Default::default()
        });
        let waiter = fast_waiter(cluster);

        let specs = vec![
            ResourceReadinessSpec::namespace_active("tig-influx", short(10)),
            ResourceReadinessSpec::namespace_active("other-ns", short(10)),
            ResourceReadinessSpec::deployment_available("webapp", "other-ns", short(10)),
        ];

        let reports = waiter.await_ready(&specs).await.unwrap();
        assert_eq!(reports[0].outcome, ReadinessOutcome::NotFound);
        assert_eq!(reports[1].outcome, ReadinessOutcome::Ready);
        assert_eq!(reports[2].outcome, ReadinessOutcome::Ready);
    }
}
