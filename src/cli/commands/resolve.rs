//! Resolve command implementation

use super::CommandContext;
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

/// Arguments for the resolve command
#[derive(Parser, Debug, Clone)]
pub struct ResolveArgs {
    /// JSON configuration document
    pub file: PathBuf,

    /// Write the result to a file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

impl ResolveArgs {
    /// Execute the resolve command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let values = ctx.load_values(&self.file)?;
        let resolved = Value::Object(ctx.resolve_values(&values).await?);

        let mut rendered = if self.compact {
            serde_json::to_string(&resolved)?
        } else {
            serde_json::to_string_pretty(&resolved)?
        };
        rendered.push('\n');

        match &self.out {
            Some(path) => {
                std::fs::write(path, rendered)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                ctx.output
                    .info(&format!("Wrote resolved config to {}", path.display()));
            }
            None => print!("{}", rendered),
        }

        Ok(0)
    }
}
