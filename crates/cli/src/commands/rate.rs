use anyhow::{Context as _, Result};
use clap::Args;
use sentry_api_client::{Method, Rate};
use serde::Serialize;

use super::CommandContext;

#[derive(Args, Debug, Clone)]
pub struct RateArgs {
    /// API path to request, relative to the base URL
    #[arg(long, default_value = "0/organizations/")]
    pub path: String,
}

#[derive(Serialize)]
struct RateRow {
    limit: u32,
    remaining: u32,
    reset: Option<String>,
    reset_in_secs: Option<i64>,
    concurrent_limit: u32,
    concurrent_remaining: u32,
}

impl From<Rate> for RateRow {
    fn from(rate: Rate) -> Self {
        Self {
            limit: rate.limit,
            remaining: rate.remaining,
            reset: rate.reset.map(|reset| reset.to_rfc3339()),
            reset_in_secs: rate.seconds_until_reset(),
            concurrent_limit: rate.concurrent_limit,
            concurrent_remaining: rate.concurrent_remaining,
        }
    }
}

pub async fn execute(args: RateArgs, cmd: &CommandContext<'_>) -> Result<()> {
    let request = cmd.client.new_request(Method::GET, &args.path, None::<&()>)?;

    // A rate-limited answer still carries the counters.
    let rate = match cmd.client.bare_do(&cmd.ctx, request).await {
        Ok(response) => response.rate,
        Err(err) => {
            let limited = err
                .response()
                .filter(|_| err.is_rate_limited())
                .map(|response| response.rate);
            match limited {
                Some(rate) => rate,
                None => {
                    return Err(err).with_context(|| format!("Failed to request {}", args.path))
                }
            }
        }
    };

    cmd.renderer.render(&RateRow::from(rate))
}
