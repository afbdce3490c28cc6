use anyhow::{Context as _, Result};
use clap::Subcommand;
use sentry_api_client::resources::ProjectScope;
use sentry_api_client::BoolOrStringList;
use serde::Serialize;

use super::{list_items, CommandContext, ListArgs};

#[derive(Subcommand, Debug, Clone)]
pub enum FiltersCommand {
    /// List the inbound data filters of a project
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
}

pub async fn execute(command: FiltersCommand, cmd: &CommandContext<'_>) -> Result<()> {
    match command {
        FiltersCommand::List { project, org, list } => {
            let scope = ProjectScope::new(cmd.organization(org.as_deref())?, project);
            let filters = list_items(cmd.client.inbound_filters(), &cmd.ctx, &scope, &list)
                .await
                .with_context(|| format!("Failed to list inbound filters of {}", scope.project))?;

            #[derive(Serialize)]
            struct Row<'a> {
                id: &'a str,
                active: String,
            }

            let rows: Vec<Row<'_>> = filters
                .iter()
                .map(|filter| Row {
                    id: &filter.id,
                    active: describe_active(&filter.active),
                })
                .collect();

            cmd.renderer
                .render_list(&rows, &format!("No inbound filters for {}.", scope.project))
        }
    }
}

fn describe_active(active: &BoolOrStringList) -> String {
    match active {
        BoolOrStringList::Bool(enabled) => enabled.to_string(),
        BoolOrStringList::StringList(subfilters) => subfilters.join(", "),
    }
}
