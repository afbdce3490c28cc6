use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use sentry_api_config::Config;
use sentry_api_output::OutputRenderer;
use serde::Serialize;
use url::Url;

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    /// Add or update a profile in the config file
    Set(SetArgs),
    /// Remove a profile from the config file
    Remove(RemoveArgs),
    /// List configured profiles
    List,
}

#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    /// Profile name to create or update.
    pub name: String,
    /// API root (e.g. https://sentry.io/api/), or the host of a self-hosted install with --on-premise.
    #[arg(long)]
    pub base_url: Option<String>,
    /// Treat --base-url as a self-hosted host root.
    #[arg(long)]
    pub on_premise: bool,
    /// Organization slug used when --org is omitted.
    #[arg(long)]
    pub organization: Option<String>,
    /// Auth token to store in the profile (prefer SENTRY_AUTH_TOKEN_<PROFILE>).
    #[arg(long)]
    pub token: Option<String>,
    /// Mark this profile as the default one.
    #[arg(long)]
    pub default: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    /// Profile to remove.
    pub name: String,
}

/// Profile commands only touch the config file, so they run without a client.
pub fn handle(
    command: ProfileCommand,
    config: &mut Config,
    config_path: Option<&Path>,
    renderer: &OutputRenderer,
) -> Result<()> {
    match command {
        ProfileCommand::Set(args) => set(args, config, config_path),
        ProfileCommand::Remove(args) => remove(args, config, config_path),
        ProfileCommand::List => list(config, renderer),
    }
}

fn set(args: SetArgs, config: &mut Config, config_path: Option<&Path>) -> Result<()> {
    if args.name.trim().is_empty() {
        return Err(anyhow!("Profile name cannot be empty"));
    }

    if let Some(base_url) = &args.base_url {
        Url::parse(base_url).with_context(|| format!("Invalid base URL: {base_url}"))?;
    }

    let profile = config.profiles.entry(args.name.clone()).or_default();
    if let Some(base_url) = args.base_url {
        profile.base_url = Some(base_url);
        profile.on_premise = args.on_premise;
    }
    if let Some(organization) = args.organization {
        profile.organization = Some(organization);
    }
    if let Some(token) = args.token.map(|t| t.trim().to_owned()) {
        if token.is_empty() {
            return Err(anyhow!("Auth token cannot be empty"));
        }
        profile.auth_token = Some(token);
    }

    if args.default || config.default_profile.is_none() {
        config.default_profile = Some(args.name.clone());
    }

    config
        .save(config_path)
        .context("Unable to persist configuration file")?;

    eprintln!("Profile '{}' saved", args.name);
    Ok(())
}

fn remove(args: RemoveArgs, config: &mut Config, config_path: Option<&Path>) -> Result<()> {
    if config.profiles.remove(&args.name).is_none() {
        return Err(anyhow!("Profile '{}' does not exist", args.name));
    }

    if config.default_profile.as_deref() == Some(args.name.as_str()) {
        config.default_profile = config.profiles.keys().min().cloned();
    }

    config
        .save(config_path)
        .context("Unable to persist configuration file")?;

    eprintln!("Profile '{}' removed", args.name);
    Ok(())
}

fn list(config: &Config, renderer: &OutputRenderer) -> Result<()> {
    #[derive(Serialize)]
    struct Row<'a> {
        name: &'a str,
        base_url: &'a str,
        organization: &'a str,
        on_premise: bool,
        has_token: bool,
        is_default: bool,
    }

    let mut names: Vec<&String> = config.profiles.keys().collect();
    names.sort();

    let rows: Vec<Row<'_>> = names
        .into_iter()
        .filter_map(|name| config.profiles.get(name).map(|profile| (name, profile)))
        .map(|(name, profile)| Row {
            name,
            base_url: profile.base_url.as_deref().unwrap_or(""),
            organization: profile.organization.as_deref().unwrap_or(""),
            on_premise: profile.on_premise,
            has_token: profile.auth_token.is_some(),
            is_default: config.default_profile.as_deref() == Some(name.as_str()),
        })
        .collect();

    renderer.render_list(&rows, "No profiles configured.")
}
