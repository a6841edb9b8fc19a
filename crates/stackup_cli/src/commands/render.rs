//! Render command - Render the manifest template without applying it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stackup_core::CoreError;
use stackup_creds::{materializer, pki, CredentialStore};
use stackup_templates::TemplateRenderer;

use super::{stack_bindings, StackArgs};

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Write the rendered manifest to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Regenerate credentials and certificates instead of loading existing ones
    #[arg(long)]
    pub regenerate_creds: bool,
}

pub async fn execute(args: RenderArgs) -> Result<()> {
    let ctx = args
        .stack
        .to_context()
        .with_regenerate_creds(args.regenerate_creds);

    if !ctx.manifest_path.exists() {
        return Err(CoreError::ManifestMissing(ctx.manifest_path.clone()).into());
    }

    let store = CredentialStore::new(ctx.credentials_path());
    let creds = materializer::obtain(&store, ctx.regenerate_creds)?;
    let bundle = pki::obtain(
        &ctx.domain,
        &ctx.ingress_hosts(),
        &ctx.tls_bundle_path(),
        ctx.regenerate_creds,
    )?;

    let renderer = TemplateRenderer::new();
    let template = renderer.load(&ctx.manifest_path)?;
    let rendered = renderer.render(&template, &stack_bindings(&ctx, &creds, &bundle)?)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered.text)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("✅ Rendered manifest written to {}", path.display());
        }
        None => print!("{}", rendered.text),
    }

    Ok(())
}
