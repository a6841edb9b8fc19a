//! One-shot manifest application.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{KubeError, KubeResult};
use crate::runner::ClusterRunner;

/// Result of a successful apply.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// Per-resource result lines reported by the external system
    pub resources: Vec<String>,
}

/// Submits rendered artifacts to the declarative resource system.
pub struct ResourceApplier {
    runner: Arc<dyn ClusterRunner>,
}

impl ResourceApplier {
    pub fn new(runner: Arc<dyn ClusterRunner>) -> Self {
        Self { runner }
    }

    /// Apply a rendered manifest in one `kubectl apply -f -` invocation.
    ///
    /// No automatic retry: submission is idempotent at the resource level,
    /// so the caller may simply re-run. On rejection the external system's
    /// diagnostic is carried in the error; resources it already committed
    /// stay committed.
    pub async fn apply(&self, rendered: &str) -> KubeResult<ApplyOutcome> {
        let output = self.runner.run(&["apply", "-f", "-"], Some(rendered)).await?;

        if !output.success {
            return Err(KubeError::ApplyRejected {
                diagnostic: output.stderr.trim().to_string(),
            });
        }

        let resources: Vec<String> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();

        info!(resources = resources.len(), "manifest applied");
        Ok(ApplyOutcome { resources })
    }

    /// Create or update a generic Secret from literal key/value pairs.
    ///
    /// Renders the Secret client-side (`--dry-run=client -o yaml`) and
    /// pipes it through [`apply`](Self::apply), so the operation is an
    /// upsert rather than a create-only call.
    pub async fn upsert_secret(
        &self,
        namespace: &str,
        name: &str,
        literals: &[(&str, &str)],
    ) -> KubeResult<ApplyOutcome> {
        let mut args: Vec<String> = vec![
            "create".into(),
            "secret".into(),
            "generic".into(),
            name.into(),
            "-n".into(),
            namespace.into(),
            "--dry-run=client".into(),
            "-o".into(),
            "yaml".into(),
        ];
        for (key, value) in literals {
            args.push(format!("--from-literal={key}={value}"));
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        debug!(secret = name, namespace, "rendering secret client-side");
        let rendered = self.runner.run(&arg_refs, None).await?;

        if !rendered.success {
            return Err(KubeError::CommandFailed {
                command: format!("kubectl create secret generic {name}"),
                message: rendered.stderr.trim().to_string(),
            });
        }

        self.apply(&rendered.stdout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::runner::CommandOutput;

    /// Records every invocation and replays canned outputs.
    struct RecordingRunner {
        calls: Mutex<Vec<(Vec<String>, Option<String>)>>,
        outputs: Mutex<Vec<CommandOutput>>,
    }

    impl RecordingRunner {
        fn new(outputs: Vec<CommandOutput>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                outputs: Mutex::new(outputs),
            }
        }

        fn calls(&self) -> Vec<(Vec<String>, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClusterRunner for RecordingRunner {
        async fn run(&self, args: &[&str], stdin: Option<&str>) -> KubeResult<CommandOutput> {
            self.calls.lock().unwrap().push((
                args.iter().map(|s| s.to_string()).collect(),
                stdin.map(String::from),
            ));
            Ok(self.outputs.lock().unwrap().remove(0))
        }
    }

    #[tokio::test]
    async fn test_apply_pipes_manifest_once() {
        let runner = Arc::new(RecordingRunner::new(vec![CommandOutput::ok(
            "namespace/tig-influx created\ndeployment.apps/grafana created\n",
        )]));
        let applier = ResourceApplier::new(runner.clone());

        let outcome = applier.apply("kind: Namespace").await.unwrap();
        assert_eq!(outcome.resources.len(), 2);

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec!["apply", "-f", "-"]);
        assert_eq!(calls[0].1.as_deref(), Some("kind: Namespace"));
    }

    #[tokio::test]
    async fn test_rejected_apply_carries_diagnostic() {
        let runner = Arc::new(RecordingRunner::new(vec![CommandOutput::failed(
            "error validating data: unknown field\n",
        )]));
        let applier = ResourceApplier::new(runner);

        let err = applier.apply("bad: manifest").await.unwrap_err();
        match err {
            KubeError::ApplyRejected { diagnostic } => {
                assert!(diagnostic.contains("unknown field"));
            }
            other => panic!("expected ApplyRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upsert_secret_renders_then_applies() {
        let runner = Arc::new(RecordingRunner::new(vec![
            CommandOutput::ok("apiVersion: v1\nkind: Secret\n"),
            CommandOutput::ok("secret/grafana-service-token configured\n"),
        ]));
        let applier = ResourceApplier::new(runner.clone());

        applier
            .upsert_secret("tig-influx", "grafana-service-token", &[("token", "glsa_x")])
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].0.contains(&"--dry-run=client".to_string()));
        assert!(calls[0].0.contains(&"--from-literal=token=glsa_x".to_string()));
        assert_eq!(calls[1].0, vec!["apply", "-f", "-"]);
        assert!(calls[1].1.as_deref().unwrap().contains("kind: Secret"));
    }
}
