use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Subcommand;
use sentry_api_client::resources::{CreateIssueAlertParams, ProjectScope};
use serde::Serialize;

use super::{list_items, CommandContext, ListArgs};

#[derive(Subcommand, Debug, Clone)]
pub enum AlertsCommand {
    /// List the issue alert rules of a project
    List {
        /// Project slug
        #[arg(long)]
        project: String,

        /// Organization slug (defaults to the profile's organization)
        #[arg(long)]
        org: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },
    /// Create an issue alert rule from a JSON or YAML file
    Create {
        /// Project slug
        #[arg(long)]
        project: String,

        /// Organization slug (defaults to the profile's organization)
        #[arg(long)]
        org: Option<String>,

        /// Rule definition (actionMatch, frequency, name, conditions, actions, filters)
        #[arg(long)]
        file: PathBuf,
    },
}

pub async fn execute(command: AlertsCommand, cmd: &CommandContext<'_>) -> Result<()> {
    match command {
        AlertsCommand::List { project, org, list } => {
            let scope = ProjectScope::new(cmd.organization(org.as_deref())?, project);
            let alerts = list_items(cmd.client.issue_alerts(), &cmd.ctx, &scope, &list)
                .await
                .with_context(|| format!("Failed to list issue alerts of {}", scope.project))?;

            #[derive(Serialize)]
            struct Row<'a> {
                id: &'a str,
                name: &'a str,
                action_match: &'a str,
                frequency: i64,
                environment: &'a str,
                actions: usize,
            }

            let rows: Vec<Row<'_>> = alerts
                .iter()
                .map(|alert| Row {
                    id: &alert.id,
                    name: &alert.name,
                    action_match: &alert.action_match,
                    frequency: alert.frequency,
                    environment: alert.environment.as_deref().unwrap_or(""),
                    actions: alert.actions.len(),
                })
                .collect();

            cmd.renderer.render_list(
                &rows,
                &format!("No issue alerts configured for {}.", scope.project),
            )
        }
        AlertsCommand::Create { project, org, file } => {
            let scope = ProjectScope::new(cmd.organization(org.as_deref())?, project);
            let params = read_rule(&file)?;

            let (alert, _) = cmd
                .client
                .issue_alerts()
                .create_deferred(&cmd.ctx, &scope, &params)
                .await
                .with_context(|| format!("Failed to create issue alert {}", params.name))?;

            cmd.renderer.render(&alert)
        }
    }
}

/// YAML is a superset of JSON, so one parser covers both file kinds.
fn read_rule(path: &PathBuf) -> Result<CreateIssueAlertParams> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Unable to read rule file {}", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("Malformed rule definition in {}", path.display()))
}
