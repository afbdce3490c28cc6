use anyhow::{Context as _, Result};
use clap::Subcommand;
use serde::Serialize;

use super::{list_items, CommandContext, ListArgs};

#[derive(Subcommand, Debug, Clone)]
pub enum OrgsCommand {
    /// List organizations the token can access
    List(ListArgs),
    /// Show a single organization
    Get {
        /// Organization slug
        slug: String,
    },
}

pub async fn execute(command: OrgsCommand, cmd: &CommandContext<'_>) -> Result<()> {
    match command {
        OrgsCommand::List(args) => list(cmd, &args).await,
        OrgsCommand::Get { slug } => {
            let (organization, _) = cmd
                .client
                .organizations()
                .get(&cmd.ctx, &(), &slug)
                .await
                .with_context(|| format!("Failed to fetch organization {slug}"))?;
            cmd.renderer.render(&organization)
        }
    }
}

async fn list(cmd: &CommandContext<'_>, args: &ListArgs) -> Result<()> {
    let organizations = list_items(cmd.client.organizations(), &cmd.ctx, &(), args)
        .await
        .context("Failed to list organizations")?;

    #[derive(Serialize)]
    struct Row<'a> {
        slug: &'a str,
        name: &'a str,
        status: &'a str,
        early_adopter: bool,
    }

    let rows: Vec<Row<'_>> = organizations
        .iter()
        .map(|org| Row {
            slug: &org.slug,
            name: &org.name,
            status: &org.status.id,
            early_adopter: org.is_early_adopter,
        })
        .collect();

    cmd.renderer
        .render_list(&rows, "No organizations returned for this token.")
}
