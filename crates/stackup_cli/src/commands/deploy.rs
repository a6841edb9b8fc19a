//! Deploy command - Provision the monitoring stack end to end.
//!
//! Phases run strictly in sequence: prerequisites, materialize secrets,
//! issue certificate, render, apply, await readiness, token exchange.
//! Fatal errors in early phases abort before any side effect; readiness
//! timeouts and a failed token exchange are collected as warnings and the
//! run still exits successfully.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stackup_core::{CoreError, ProvisionContext, RunSummary};
use stackup_creds::{materializer, pki, CredentialSet, CredentialStore, ADMIN_PASSWORD, SERVICE_TOKEN};
use stackup_kube::{
    kubectl_path, KubectlRunner, ReadinessOutcome, ReadinessWaiter, ResourceApplier,
    ResourceReadinessSpec,
};
use stackup_templates::TemplateRenderer;
use stackup_tokens::TokenExchanger;

use super::{print_summary, stack_bindings, StackArgs};

/// Name of the service account minted for long-lived API access.
pub(crate) const SERVICE_ACCOUNT: &str = "stackup-provisioner";

/// Cluster Secret holding the minted token.
pub(crate) const SERVICE_TOKEN_SECRET: &str = "grafana-service-token";

/// Hint printed when a prerequisite tool is absent.
pub(crate) const KUBECTL_HINT: &str = "Install kubectl: https://kubernetes.io/docs/tasks/tools/";

/// Settle delay before talking to the freshly deployed dashboard.
const EXCHANGE_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Staleness horizon used for the deploy-time certificate advisory.
const CERT_WARN_DAYS: i64 = 30;

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Render and validate only: no apply, no network calls
    #[arg(long)]
    pub dry_run: bool,

    /// Regenerate credentials and certificates instead of loading existing ones
    #[arg(long)]
    pub regenerate_creds: bool,

    /// Skip the post-provisioning token exchange
    #[arg(long)]
    pub skip_token_exchange: bool,
}

pub async fn execute(args: DeployArgs) -> Result<()> {
    let ctx = args
        .stack
        .to_context()
        .with_dry_run(args.dry_run)
        .with_regenerate_creds(args.regenerate_creds);
    let mut summary = RunSummary::new();

    check_prerequisites(&ctx)?;
    info!(
        run_id = %ctx.run_id,
        namespace = %ctx.namespace,
        domain = %ctx.domain,
        "starting provisioning run"
    );

    println!("🔐 Materializing credentials...");
    let store = CredentialStore::new(ctx.credentials_path());
    let creds = materializer::obtain(&store, ctx.regenerate_creds)?;
    summary.add_ok(
        "credentials",
        format!("{} entries in {}", creds.len(), store.path().display()),
    );

    println!("📜 Issuing TLS bundle...");
    let bundle = pki::obtain(
        &ctx.domain,
        &ctx.ingress_hosts(),
        &ctx.tls_bundle_path(),
        ctx.regenerate_creds,
    )?;
    if bundle.expires_within(CERT_WARN_DAYS) {
        summary.add_warning(
            "certificate",
            format!("TLS bundle expires within {CERT_WARN_DAYS} days"),
            "rotate with: stackup deploy --regenerate-creds",
        );
    } else {
        summary.add_ok(
            "certificate",
            format!("covers {}", bundle.san_names().join(", ")),
        );
    }

    println!("📝 Rendering manifest...");
    let renderer = TemplateRenderer::new();
    let template = renderer.load(&ctx.manifest_path)?;
    let rendered = renderer.render(&template, &stack_bindings(&ctx, &creds, &bundle)?)?;
    summary.add_ok("render", format!("{} bytes rendered", rendered.text.len()));

    if ctx.dry_run {
        summary.add_skipped("apply", "dry run");
        summary.add_skipped("readiness", "dry run");
        summary.add_skipped("token-exchange", "dry run");
        print_summary(&summary);
        println!();
        println!("✅ Dry run complete; nothing was applied.");
        return Ok(());
    }

    println!("🚀 Applying manifest...");
    let runner = Arc::new(KubectlRunner::new());
    let applier = ResourceApplier::new(runner.clone());
    let outcome = applier
        .apply(&rendered.text)
        .await
        .context("applying manifest (already-committed resources stay committed)")?;
    summary.add_ok("apply", format!("{} resources reconciled", outcome.resources.len()));

    println!("⏳ Awaiting readiness (Ctrl-C stops waiting, state stays consistent)...");
    let waiter = ReadinessWaiter::new(runner.clone());
    let specs = readiness_plan(&ctx);
    let reports = tokio::select! {
        reports = waiter.await_ready(&specs) => Some(reports.context("awaiting readiness")?),
        _ = tokio::signal::ctrl_c() => None,
    };

    let Some(reports) = reports else {
        summary.mark_cancelled();
        print_summary(&summary);
        return Ok(());
    };

    for report in &reports {
        let phase = format!("readiness/{}", report.resource);
        match report.outcome {
            ReadinessOutcome::Ready => summary.add_ok(
                phase,
                format!("ready after {}s", report.waited.as_secs()),
            ),
            ReadinessOutcome::TimedOut => summary.add_warning(
                phase,
                format!("not ready after {}s", report.waited.as_secs()),
                format!(
                    "inspect with: kubectl describe {} -n {}",
                    report.resource, report.namespace
                ),
            ),
            ReadinessOutcome::NotFound => summary.add_warning(
                phase,
                "resource never appeared",
                format!("inspect with: kubectl get events -n {}", report.namespace),
            ),
        }
    }

    if args.skip_token_exchange {
        summary.add_skipped("token-exchange", "skipped by flag");
    } else {
        println!("🎫 Exchanging bootstrap password for a service-account token...");
        tokio::time::sleep(EXCHANGE_SETTLE_DELAY).await;
        match exchange_token(&ctx, &creds, &store, &applier).await {
            Ok(()) => summary.add_ok(
                "token-exchange",
                format!("token stored as {SERVICE_TOKEN} and secret {SERVICE_TOKEN_SECRET}"),
            ),
            Err(e) => summary.add_warning(
                "token-exchange",
                format!("{e:#}"),
                format!(
                    "retry with: stackup exchange-token --namespace {} --domain {}",
                    ctx.namespace, ctx.domain
                ),
            ),
        }
    }

    print_summary(&summary);
    println!();
    if summary.has_warnings() {
        println!("✅ Deploy finished with warnings; see the hints above.");
    } else {
        println!("✅ Deploy complete.");
        println!("   Dashboard: https://{}", ctx.grafana_host());
        println!("   Explorer:  https://{}", ctx.explorer_host());
    }
    Ok(())
}

/// Verify external prerequisites before any side effect.
fn check_prerequisites(ctx: &ProvisionContext) -> Result<()> {
    if !ctx.manifest_path.exists() {
        return Err(CoreError::ManifestMissing(ctx.manifest_path.clone()).into());
    }

    if !ctx.dry_run && kubectl_path().is_none() {
        return Err(CoreError::PrerequisiteMissing {
            tool: "kubectl".to_string(),
            hint: KUBECTL_HINT.to_string(),
        }
        .into());
    }

    Ok(())
}

/// Ordered readiness plan for the stack.
///
/// The namespace gates everything else; workloads follow in dependency
/// order, database before the UIs that talk to it.
fn readiness_plan(ctx: &ProvisionContext) -> Vec<ResourceReadinessSpec> {
    let ns = ctx.namespace.as_str();
    vec![
        ResourceReadinessSpec::namespace_active(ns, Duration::from_secs(60)),
        ResourceReadinessSpec::deployment_available("influxdb", ns, Duration::from_secs(180)),
        ResourceReadinessSpec::deployment_available("grafana", ns, Duration::from_secs(180)),
        ResourceReadinessSpec::deployment_available("chronograf", ns, Duration::from_secs(120)),
        ResourceReadinessSpec::deployment_available("telegraf", ns, Duration::from_secs(120)),
    ]
}

/// Mint and persist the service-account token (store entry + cluster Secret).
async fn exchange_token(
    ctx: &ProvisionContext,
    creds: &CredentialSet,
    store: &CredentialStore,
    applier: &ResourceApplier,
) -> Result<()> {
    let password = creds
        .get(ADMIN_PASSWORD)
        .ok_or_else(|| anyhow::anyhow!("credential store has no {ADMIN_PASSWORD} entry"))?;

    let exchanger = TokenExchanger::new(
        format!("https://{}", ctx.grafana_host()),
        "admin",
        password,
    )?;
    let token_name = format!("stackup-{}", &ctx.run_id.simple().to_string()[..8]);
    let token = exchanger.exchange(SERVICE_ACCOUNT, &token_name).await?;

    store.upsert(SERVICE_TOKEN, &token)?;
    applier
        .upsert_secret(&ctx.namespace, SERVICE_TOKEN_SECRET, &[("token", token.as_str())])
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackup_kube::ResourceKind;

    #[test]
    fn test_readiness_plan_starts_with_the_namespace() {
        let ctx = ProvisionContext::default();
        let plan = readiness_plan(&ctx);

        assert_eq!(plan[0].kind, ResourceKind::Namespace);
        assert!(plan.len() > 1);
        assert!(plan.iter().all(|s| s.namespace == ctx.namespace));
    }

    #[test]
    fn test_readiness_plan_waits_for_database_before_uis() {
        let ctx = ProvisionContext::default();
        let plan = readiness_plan(&ctx);

        let position = |name: &str| plan.iter().position(|s| s.name == name).unwrap();
        assert!(position("influxdb") < position("grafana"));
        assert!(position("influxdb") < position("chronograf"));
    }
}
