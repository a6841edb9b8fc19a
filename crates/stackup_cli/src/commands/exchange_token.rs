//! Exchange-token command - Standalone re-run of the token exchange.
//!
//! The deploy flow runs this step best-effort; when the dashboard was not
//! reachable yet, this command repeats it against the existing credential
//! store. Lookup is by stable account name, so re-running never duplicates
//! the service identity.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Args;
use tracing::info;

use stackup_core::CoreError;
use stackup_creds::{CredentialStore, ADMIN_PASSWORD, SERVICE_TOKEN};
use stackup_kube::{kubectl_path, KubectlRunner, ResourceApplier};
use stackup_tokens::TokenExchanger;

use super::deploy::{KUBECTL_HINT, SERVICE_ACCOUNT, SERVICE_TOKEN_SECRET};
use super::StackArgs;

#[derive(Args)]
pub struct ExchangeTokenArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Service account to look up or create
    #[arg(long, default_value = SERVICE_ACCOUNT)]
    pub account: String,

    /// Dashboard admin username for the bootstrap login
    #[arg(long, default_value = "admin")]
    pub username: String,
}

pub async fn execute(args: ExchangeTokenArgs) -> Result<()> {
    let ctx = args.stack.to_context();

    if kubectl_path().is_none() {
        return Err(CoreError::PrerequisiteMissing {
            tool: "kubectl".to_string(),
            hint: KUBECTL_HINT.to_string(),
        }
        .into());
    }

    let store = CredentialStore::new(ctx.credentials_path());
    let creds = store.load()?.ok_or_else(|| {
        anyhow!(
            "no credential store at {}; run `stackup deploy` first",
            store.path().display()
        )
    })?;
    let password = creds
        .get(ADMIN_PASSWORD)
        .ok_or_else(|| anyhow!("credential store has no {ADMIN_PASSWORD} entry"))?;

    info!(account = %args.account, host = %ctx.grafana_host(), "re-running token exchange");
    println!(
        "🎫 Exchanging bootstrap password at https://{}...",
        ctx.grafana_host()
    );
    let exchanger = TokenExchanger::new(
        format!("https://{}", ctx.grafana_host()),
        &args.username,
        password,
    )?;
    let token_name = format!("stackup-{}", &ctx.run_id.simple().to_string()[..8]);
    let token = exchanger.exchange(&args.account, &token_name).await?;

    store.upsert(SERVICE_TOKEN, &token)?;

    let applier = ResourceApplier::new(Arc::new(KubectlRunner::new()));
    applier
        .upsert_secret(&ctx.namespace, SERVICE_TOKEN_SECRET, &[("token", token.as_str())])
        .await?;

    println!(
        "✅ Token minted for '{}'; stored as {} and cluster secret {}.",
        args.account, SERVICE_TOKEN, SERVICE_TOKEN_SECRET
    );
    Ok(())
}
