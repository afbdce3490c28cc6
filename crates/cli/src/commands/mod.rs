use anyhow::{anyhow, Result};
use clap::Args;
use sentry_api_client::pagination::collect_pages;
use sentry_api_client::resources::{Resource, ResourceClient};
use sentry_api_client::{Client, Context};
use sentry_api_output::OutputRenderer;

pub mod alerts;
pub mod filters;
pub mod organizations;
pub mod profile;
pub mod projects;
pub mod rate;
pub mod teams;

pub struct CommandContext<'a> {
    pub client: Client,
    pub renderer: &'a OutputRenderer,
    pub ctx: Context,
    /// Organization slug from the active profile.
    pub organization: Option<String>,
}

impl CommandContext<'_> {
    /// The `--org` flag, falling back to the profile's organization.
    pub fn organization<'s>(&'s self, flag: Option<&'s str>) -> Result<&'s str> {
        flag.or(self.organization.as_deref()).ok_or_else(|| {
            anyhow!("No organization given. Pass --org or set organization in the profile.")
        })
    }
}

/// Paging flags shared by every `list` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Follow pagination cursors and fetch every page
    #[arg(long)]
    pub all: bool,

    /// Stop after this many items
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Fetch one page, or every page with `--all`, honouring `--limit`.
pub async fn list_items<R: Resource>(
    resources: ResourceClient<'_, R>,
    ctx: &Context,
    parent: &R::Parent,
    args: &ListArgs,
) -> Result<Vec<R::Item>> {
    if args.all {
        let listing = resources.listing(parent);
        return Ok(collect_pages(&listing, ctx, args.limit).await?);
    }

    let (mut items, response) = resources.list(ctx, parent, None).await?;
    if let Some(limit) = args.limit {
        items.truncate(limit);
    }
    if response.has_next_page() {
        eprintln!("More results available, pass --all to fetch every page.");
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentry_api_output::OutputFormat;

    #[test]
    fn test_organization_flag_wins_over_profile() {
        let renderer = OutputRenderer::new(OutputFormat::Json);
        let cmd = CommandContext {
            client: Client::new("token").unwrap(),
            renderer: &renderer,
            ctx: Context::background(),
            organization: Some("from-profile".to_string()),
        };

        assert_eq!(cmd.organization(Some("from-flag")).unwrap(), "from-flag");
        assert_eq!(cmd.organization(None).unwrap(), "from-profile");
    }

    #[test]
    fn test_missing_organization_is_an_error() {
        let renderer = OutputRenderer::new(OutputFormat::Json);
        let cmd = CommandContext {
            client: Client::new("token").unwrap(),
            renderer: &renderer,
            ctx: Context::background(),
            organization: None,
        };

        assert!(cmd.organization(None).is_err());
    }
}
