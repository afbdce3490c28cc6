use anyhow::{Context as _, Result};
use clap::Subcommand;
use sentry_api_client::resources::{Project, TeamScope};
use serde::Serialize;

use super::{list_items, CommandContext, ListArgs};

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectsCommand {
    /// List projects of an organization, or of one team
    List {
        /// Organization slug (defaults to the profile's organization)
        #[arg(long)]
        org: Option<String>,

        /// Only list projects owned by this team
        #[arg(long)]
        team: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },
}

pub async fn execute(command: ProjectsCommand, cmd: &CommandContext<'_>) -> Result<()> {
    match command {
        ProjectsCommand::List { org, team, list } => {
            let organization = cmd.organization(org.as_deref())?;

            let projects = match team {
                Some(team) => {
                    let scope = TeamScope::new(organization, team);
                    list_items(cmd.client.team_projects(), &cmd.ctx, &scope, &list)
                        .await
                        .with_context(|| {
                            format!("Failed to list projects of team {}", scope.team)
                        })?
                }
                None => list_items(cmd.client.projects(), &cmd.ctx, organization, &list)
                    .await
                    .with_context(|| format!("Failed to list projects of {organization}"))?,
            };

            render_projects(cmd, &projects)
        }
    }
}

fn render_projects(cmd: &CommandContext<'_>, projects: &[Project]) -> Result<()> {
    #[derive(Serialize)]
    struct Row<'a> {
        id: String,
        slug: &'a str,
        name: &'a str,
        platform: &'a str,
        status: &'a str,
    }

    let rows: Vec<Row<'_>> = projects
        .iter()
        .map(|project| Row {
            id: project.id.to_string(),
            slug: &project.slug,
            name: &project.name,
            platform: project.platform.as_deref().unwrap_or(""),
            status: &project.status,
        })
        .collect();

    cmd.renderer.render_list(&rows, "No projects found.")
}
