//! CLI command definitions.
//!
//! This module defines the command structure for the stackup CLI.
//! Each subcommand maps to one provisioning workflow or a standalone
//! re-runnable step of it.

use std::path::PathBuf;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::{Args, Parser, Subcommand};

use stackup_core::{PhaseStatus, ProvisionContext, RunSummary, DEFAULT_DOMAIN, DEFAULT_NAMESPACE};
use stackup_creds::{CertificateBundle, CredentialSet, ADMIN_PASSWORD, DATABASE_TOKEN};
use stackup_templates::PlaceholderBindings;

pub mod cert_status;
pub mod deploy;
pub mod exchange_token;
pub mod render;

/// stackup - single-node monitoring stack bootstrap provisioner
#[derive(Parser)]
#[command(name = "stackup")]
#[command(version, about = "stackup - single-node monitoring stack bootstrap provisioner")]
#[command(long_about = r#"
stackup stands up a monitoring stack (metrics collector, time-series
database, dashboard UI, database explorer UI) on a single-node Kubernetes
cluster, with generated credentials, a self-signed TLS certificate and
ingress routing.

WORKFLOWS:
  deploy          → Provision the stack end to end
  render          → Render the manifest template without applying it
  exchange-token  → Re-run the post-provisioning token exchange
  cert-status     → Inspect the persisted TLS bundle

EXIT CODES:
  0 - Success or user cancellation
  1 - General error
  2 - Invalid arguments
  3 - Missing prerequisite (tool or manifest)
  4 - Provisioning error (credentials, certificate, template)
  5 - Apply rejected by the cluster
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision the monitoring stack end to end
    Deploy(deploy::DeployArgs),

    /// Render the manifest template without applying it
    Render(render::RenderArgs),

    /// Re-run the post-provisioning token exchange
    #[command(name = "exchange-token")]
    ExchangeToken(exchange_token::ExchangeTokenArgs),

    /// Inspect the persisted TLS bundle
    #[command(name = "cert-status")]
    CertStatus(cert_status::CertStatusArgs),
}

/// Arguments shared by every stack-facing command.
#[derive(Args)]
pub struct StackArgs {
    /// Target namespace
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Base domain for ingress hostnames
    #[arg(long, default_value = DEFAULT_DOMAIN)]
    pub domain: String,

    /// Path to the manifest template
    #[arg(long, default_value = "manifests/monitoring-stack.yaml")]
    pub manifest: PathBuf,

    /// Directory holding the credential store and TLS bundle
    #[arg(long, default_value = ".stackup")]
    pub state_dir: PathBuf,
}

impl StackArgs {
    pub fn to_context(&self) -> ProvisionContext {
        ProvisionContext::new(
            &self.namespace,
            &self.domain,
            self.manifest.clone(),
            self.state_dir.clone(),
        )
    }
}

/// Build the full placeholder binding table for a render.
pub(crate) fn stack_bindings(
    ctx: &ProvisionContext,
    creds: &CredentialSet,
    bundle: &CertificateBundle,
) -> Result<PlaceholderBindings> {
    let token = creds
        .get(DATABASE_TOKEN)
        .ok_or_else(|| anyhow::anyhow!("credential store has no {DATABASE_TOKEN} entry"))?;
    let password = creds
        .get(ADMIN_PASSWORD)
        .ok_or_else(|| anyhow::anyhow!("credential store has no {ADMIN_PASSWORD} entry"))?;

    Ok(PlaceholderBindings::new()
        .bind(stackup_templates::NAMESPACE, &ctx.namespace)
        .bind(stackup_templates::DOMAIN, &ctx.domain)
        .bind(stackup_templates::ADMIN_TOKEN, token)
        .bind(stackup_templates::ADMIN_PASSWORD, password)
        .bind(
            stackup_templates::CERT_BASE64,
            STANDARD.encode(&bundle.certificate_pem),
        )
        .bind(
            stackup_templates::KEY_BASE64,
            STANDARD.encode(&bundle.private_key_pem),
        ))
}

/// Print the aggregated end-of-run report.
pub(crate) fn print_summary(summary: &RunSummary) {
    println!();
    println!("=== Run summary ===");
    for report in &summary.reports {
        let mark = match report.status {
            PhaseStatus::Ok => "✅",
            PhaseStatus::Warning => "⚠️ ",
            PhaseStatus::Failed => "❌",
            PhaseStatus::Skipped => "⏭️ ",
        };
        println!("  {} {:<24} {}", mark, report.phase, report.detail);
        if let Some(hint) = &report.hint {
            println!("       ↳ {}", hint);
        }
    }
    if summary.cancelled {
        println!();
        println!("⚠️  Run cancelled; state on disk is consistent and safe to re-run.");
    }
}
