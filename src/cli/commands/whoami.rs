//! Whoami command implementation

use super::CommandContext;
use anyhow::Result;
use awstools::session::caller_identity;
use clap::Parser;

/// Arguments for the whoami command
#[derive(Parser, Debug, Clone)]
pub struct WhoamiArgs {}

impl WhoamiArgs {
    /// Execute the whoami command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let sdk_config = ctx.sdk_config().await?;
        let identity = caller_identity(&sdk_config).await?;

        if ctx.output.is_json() {
            ctx.output.json(&identity)?;
            return Ok(0);
        }

        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_default();

        ctx.output.field("Account", &identity.account);
        ctx.output.field("Arn", &identity.arn);
        ctx.output.field("UserId", &identity.user_id);
        ctx.output.field("Region", &region);

        Ok(0)
    }
}
