//! stackup CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success or user cancellation
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Missing prerequisite (tool or manifest)
//! - 4: Provisioning error (credentials, certificate, template)
//! - 5: Apply rejected by the cluster

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const PREREQUISITE_MISSING: u8 = 3;
    pub const PROVISIONING_ERROR: u8 = 4;
    pub const APPLY_REJECTED: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "stackup=debug" } else { "stackup=info" };
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(
            EnvFilter::from_default_env()
                .add_directive(default_level.parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Deploy(args) => commands::deploy::execute(args).await,
        Commands::Render(args) => commands::render::execute(args).await,
        Commands::ExchangeToken(args) => commands::exchange_token::execute(args).await,
        Commands::CertStatus(args) => commands::cert_status::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    use stackup_core::CoreError;
    use stackup_creds::CredsError;
    use stackup_kube::KubeError;
    use stackup_templates::TemplateError;

    if let Some(core) = e.downcast_ref::<CoreError>() {
        return match core {
            CoreError::PrerequisiteMissing { .. } | CoreError::ManifestMissing(_) => {
                ExitCodes::PREREQUISITE_MISSING
            }
            _ => ExitCodes::GENERAL_ERROR,
        };
    }

    if let Some(kube) = e.downcast_ref::<KubeError>() {
        return match kube {
            KubeError::ApplyRejected { .. } => ExitCodes::APPLY_REJECTED,
            _ => ExitCodes::GENERAL_ERROR,
        };
    }

    if e.downcast_ref::<CredsError>().is_some() || e.downcast_ref::<TemplateError>().is_some() {
        return ExitCodes::PROVISIONING_ERROR;
    }

    ExitCodes::GENERAL_ERROR
}
