//! `preview-deploy`: per-pull-request preview environments on Azure.
//!
//! ```text
//! preview-deploy run --action opened --owner acme --repo shop --pr 42
//! preview-deploy teardown --owner acme --repo shop --pr 42
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use preview_deploy_rs::{
    AccessToken, ArmClient, ClientConfig, ComposeDescriptor, DeployError, Deployer,
    DeployerConfig, EnvironmentIdentity, NoopReporter, PipelineOutcome, PipelineSettings,
    PlatformKind, PreviewPipeline, PullRequestAction, StatusReporter, StdoutReporter,
    TracingObserver,
};

#[derive(Debug, Parser)]
#[command(name = "preview-deploy", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, env = "AZURE_SUBSCRIPTION_ID", global = true)]
    subscription_id: Option<String>,

    #[arg(long, env = "AZURE_LOCATION", default_value = "eastus", global = true)]
    location: String,

    #[arg(long, env = "AZURE_ACCESS_TOKEN", hide_env_values = true, global = true)]
    access_token: Option<String>,

    #[arg(long, env = "COMPOSE_FILE", default_value = "docker-compose.yml", global = true)]
    compose_file: PathBuf,

    #[arg(long, env = "PREVIEW_PLATFORM", default_value = "managed-application", global = true)]
    platform: PlatformKind,

    #[arg(long, env = "PREVIEW_STATUS_OUTPUT", value_enum, default_value = "stdout", global = true)]
    status_output: StatusOutput,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusOutput {
    Stdout,
    None,
}

#[derive(Debug, Args)]
struct PullRequestArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    repo: String,
    #[arg(long)]
    pr: u64,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or update the preview environment.
    Deploy(PullRequestArgs),
    /// Delete the preview environment.
    Teardown(PullRequestArgs),
    /// Dispatch a pull-request event action (opened, synchronize, reopened, closed).
    Run {
        #[arg(long, env = "PR_ACTION")]
        action: String,
        #[command(flatten)]
        pull_request: PullRequestArgs,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, code = e.code().unwrap_or("-"), "preview-deploy failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), DeployError> {
    let global = cli.global;

    let (action, args) = match cli.command {
        Command::Deploy(args) => (PullRequestAction::Deploy, args),
        Command::Teardown(args) => (PullRequestAction::Teardown, args),
        Command::Run {
            action,
            pull_request,
        } => {
            let parsed = action
                .parse::<PullRequestAction>()
                .unwrap_or(PullRequestAction::Ignore);
            (parsed, pull_request)
        }
    };

    let identity = EnvironmentIdentity::new(args.owner, args.repo, args.pr)?;
    if action == PullRequestAction::Ignore {
        info!(pull_request = %identity, "action ignored");
        return Ok(());
    }

    let subscription_id = global
        .subscription_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| DeployError::Config("AZURE_SUBSCRIPTION_ID is required".into()))?;
    let token = global
        .access_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| DeployError::Config("AZURE_ACCESS_TOKEN is required".into()))?;

    let client = ArmClient::new(subscription_id, AccessToken::new(token), ClientConfig::default())?;

    let observer = TracingObserver;
    let deployer = Deployer::new(
        &client,
        &observer,
        DeployerConfig {
            platform: global.platform,
            ..DeployerConfig::default()
        },
    );

    let stdout = StdoutReporter::new();
    let reporter: &dyn StatusReporter = match global.status_output {
        StatusOutput::Stdout => &stdout,
        StatusOutput::None => &NoopReporter,
    };

    let pipeline = PreviewPipeline::new(
        deployer,
        reporter,
        &observer,
        PipelineSettings {
            location: global.location,
            ..PipelineSettings::default()
        },
    );

    info!(
        pull_request = %identity,
        platform = %global.platform,
        action = ?action,
        "starting"
    );

    let source = if action == PullRequestAction::Deploy {
        ComposeDescriptor::from_path(&global.compose_file)?
    } else {
        ComposeDescriptor::default()
    };

    match pipeline.handle(action, &identity, &source).await? {
        PipelineOutcome::Deployed(outcome) => {
            info!(url = %outcome.url, elapsed_ms = outcome.elapsed.as_millis() as u64, "preview ready");
        }
        PipelineOutcome::TornDown { resource_group } => {
            info!(%resource_group, "preview removed");
        }
        PipelineOutcome::Ignored => {}
    }

    Ok(())
}
