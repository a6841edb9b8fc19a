//! Cert-status command - Inspect the persisted TLS bundle.

use anyhow::{anyhow, Result};
use clap::Args;

use stackup_creds::pki;

use super::StackArgs;

#[derive(Args)]
pub struct CertStatusArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Staleness horizon in days
    #[arg(long, default_value_t = 30)]
    pub within_days: i64,
}

pub async fn execute(args: CertStatusArgs) -> Result<()> {
    let ctx = args.stack.to_context();
    let path = ctx.tls_bundle_path();

    if !path.exists() {
        return Err(anyhow!(
            "no TLS bundle at {}; run `stackup deploy` first",
            path.display()
        ));
    }

    let bundle = pki::load(&path)?;

    println!("Subject:   {}", bundle.subject_domain);
    println!("SAN:       {}", bundle.san_names().join(", "));
    println!("Not after: {}", bundle.not_after);
    println!();

    if bundle.is_expired() {
        println!("❌ Bundle has expired; rotate with: stackup deploy --regenerate-creds");
    } else if bundle.expires_within(args.within_days) {
        println!(
            "⚠️  Bundle expires within {} days; consider: stackup deploy --regenerate-creds",
            args.within_days
        );
    } else {
        println!("✅ Bundle is current (horizon: {} days).", args.within_days);
    }

    Ok(())
}
