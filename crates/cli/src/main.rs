mod commands;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use sentry_api_client::{ApiError, Client, Context, PollPolicy};
use sentry_api_config::{profile_token_env, resolve_token, Config, TOKEN_ENV};
use sentry_api_output::{OutputFormat, OutputRenderer};
use tracing_subscriber::{fmt, EnvFilter};

use commands::CommandContext;

#[derive(Parser, Debug)]
#[command(name = "sentryctl", version, about = "Command line client for the Sentry REST API", long_about = None)]
struct Cli {
    /// Profile to use from config file
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Path to config file (defaults to ~/.sentry-api/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for command results
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: SentryCommand,
}

#[derive(Subcommand, Debug, Clone)]
enum SentryCommand {
    /// Manage profiles in the config file
    #[command(subcommand)]
    Profile(commands::profile::ProfileCommand),
    #[command(flatten)]
    Api(ApiCommand),
}

/// Commands that talk to the API.
#[derive(Subcommand, Debug, Clone)]
enum ApiCommand {
    /// Organization commands
    #[command(subcommand)]
    Orgs(commands::organizations::OrgsCommand),
    /// Team commands
    #[command(subcommand)]
    Teams(commands::teams::TeamsCommand),
    /// Project commands
    #[command(subcommand)]
    Projects(commands::projects::ProjectsCommand),
    /// Issue alert rule commands
    #[command(subcommand)]
    Alerts(commands::alerts::AlertsCommand),
    /// Inbound data filter commands
    #[command(subcommand)]
    Filters(commands::filters::FiltersCommand),
    /// Show the rate limit counters reported for a request
    Rate(commands::rate::RateArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        if let Some(hint) = err.downcast_ref::<ApiError>().and_then(ApiError::suggestion) {
            eprintln!("Hint: {hint}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.debug)?;

    let mut config = Config::load(cli.config.as_ref())?;
    let renderer = OutputRenderer::new(cli.output);

    let command = match cli.command {
        SentryCommand::Profile(command) => {
            return commands::profile::handle(
                command,
                &mut config,
                cli.config.as_deref(),
                &renderer,
            );
        }
        SentryCommand::Api(command) => command,
    };

    let profile = resolve_active_profile(&config, cli.profile.as_deref())?;
    let client = build_client(&profile)?;

    let (ctx, cancel) = Context::with_cancel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight requests");
            cancel.cancel();
        }
    });

    let cmd = CommandContext {
        client,
        renderer: &renderer,
        ctx,
        organization: profile.organization,
    };

    match command {
        ApiCommand::Orgs(command) => commands::organizations::execute(command, &cmd).await,
        ApiCommand::Teams(command) => commands::teams::execute(command, &cmd).await,
        ApiCommand::Projects(command) => commands::projects::execute(command, &cmd).await,
        ApiCommand::Alerts(command) => commands::alerts::execute(command, &cmd).await,
        ApiCommand::Filters(command) => commands::filters::execute(command, &cmd).await,
        ApiCommand::Rate(args) => commands::rate::execute(args, &cmd).await,
    }
}

fn init_tracing(debug: bool) -> Result<()> {
    let default = if debug {
        "info,sentryctl=debug,sentry_api_client=debug,sentry_api_config=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}

struct ActiveProfile {
    base_url: Option<String>,
    on_premise: bool,
    token: String,
    organization: Option<String>,
    poll_policy: PollPolicy,
}

/// Pick the profile and its token. A missing config file is fine as long as
/// a token comes from the environment.
fn resolve_active_profile(config: &Config, requested: Option<&str>) -> Result<ActiveProfile> {
    let (name, profile) = match (config.resolve_profile(requested), requested) {
        (Some((name, profile)), _) => (name, Some(profile)),
        (None, Some(requested)) => {
            return Err(anyhow!("Profile '{requested}' not found in config file."));
        }
        (None, None) => ("default", None),
    };

    let token = resolve_token(name, profile).ok_or_else(|| {
        anyhow!(
            "No auth token found for profile '{name}'. Set {} or {TOKEN_ENV}, or add auth_token to the profile.",
            profile_token_env(name)
        )
    })?;

    let profile = profile.cloned().unwrap_or_default();
    let defaults = PollPolicy::default();

    Ok(ActiveProfile {
        poll_policy: PollPolicy {
            attempts: profile.poll_attempts.unwrap_or(defaults.attempts),
            interval: profile.poll_interval().unwrap_or(defaults.interval),
        },
        base_url: profile.base_url,
        on_premise: profile.on_premise,
        token,
        organization: profile.organization,
    })
}

fn build_client(profile: &ActiveProfile) -> Result<Client> {
    let mut builder = Client::builder()
        .bearer_token(profile.token.clone())
        .timeout(Some(Duration::from_secs(60)))
        .poll_policy(profile.poll_policy);

    if let Some(base_url) = &profile.base_url {
        builder = if profile.on_premise {
            builder.on_premise(base_url.clone())
        } else {
            builder.base_url(base_url.clone())
        };
    }

    Ok(builder.build()?)
}
