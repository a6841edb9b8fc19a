//! Cluster CLI seam.
//!
//! Every cluster interaction funnels through the [`ClusterRunner`] trait,
//! with [`KubectlRunner`] as the subprocess implementation. Tests
//! substitute their own runner.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::KubeResult;

/// Captured output of one cluster CLI invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful invocation with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed invocation with the given stderr.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs the cluster CLI.
#[async_trait]
pub trait ClusterRunner: Send + Sync {
    /// Run the CLI with the given arguments, optionally piping stdin.
    async fn run(&self, args: &[&str], stdin: Option<&str>) -> KubeResult<CommandOutput>;
}

/// Locate the `kubectl` binary on the PATH.
pub fn kubectl_path() -> Option<PathBuf> {
    which::which("kubectl").ok()
}

/// Subprocess-backed [`ClusterRunner`] invoking `kubectl`.
#[derive(Debug, Clone)]
pub struct KubectlRunner {
    binary: PathBuf,
}

impl Default for KubectlRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl KubectlRunner {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("kubectl"),
        }
    }

    /// Use a specific binary path instead of resolving from the PATH.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ClusterRunner for KubectlRunner {
    async fn run(&self, args: &[&str], stdin: Option<&str>) -> KubeResult<CommandOutput> {
        debug!(binary = %self.binary.display(), ?args, "running cluster CLI");

        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = if let Some(input) = stdin {
            command.stdin(Stdio::piped());
            let mut child = command.spawn()?;

            if let Some(mut pipe) = child.stdin.take() {
                use tokio::io::AsyncWriteExt;
                pipe.write_all(input.as_bytes()).await?;
            }

            child.wait_with_output().await?
        } else {
            command.output().await?
        };

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
