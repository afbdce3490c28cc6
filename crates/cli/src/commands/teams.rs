use anyhow::{Context as _, Result};
use clap::Subcommand;
use serde::Serialize;

use super::{list_items, CommandContext, ListArgs};

#[derive(Subcommand, Debug, Clone)]
pub enum TeamsCommand {
    /// List the teams of an organization
    List {
        /// Organization slug (defaults to the profile's organization)
        #[arg(long)]
        org: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },
}

pub async fn execute(command: TeamsCommand, cmd: &CommandContext<'_>) -> Result<()> {
    match command {
        TeamsCommand::List { org, list } => {
            let organization = cmd.organization(org.as_deref())?;
            let teams = list_items(cmd.client.teams(), &cmd.ctx, organization, &list)
                .await
                .with_context(|| format!("Failed to list teams of {organization}"))?;

            #[derive(Serialize)]
            struct Row<'a> {
                id: String,
                slug: &'a str,
                name: &'a str,
                member: bool,
            }

            let rows: Vec<Row<'_>> = teams
                .iter()
                .map(|team| Row {
                    id: team.id.to_string(),
                    slug: &team.slug,
                    name: &team.name,
                    member: team.is_member,
                })
                .collect();

            cmd.renderer
                .render_list(&rows, &format!("No teams found in {organization}."))
        }
    }
}
