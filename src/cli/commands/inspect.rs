//! Inspect command implementation

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the inspect command
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// JSON configuration document
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct PlaceholderEntry<'a> {
    key: String,
    #[serde(rename = "type")]
    source_type: String,
    name: &'a str,
    identifier: &'a str,
}

impl InspectArgs {
    /// Execute the inspect command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let values = ctx.load_values(&self.file)?;

        let entries: Vec<PlaceholderEntry<'_>> = values
            .sources()
            .into_iter()
            .map(|(key, source)| PlaceholderEntry {
                key,
                source_type: source.source_type.to_string(),
                name: &source.name,
                identifier: &source.identifier,
            })
            .collect();

        if ctx.output.is_json() {
            ctx.output.json(&entries)?;
            return Ok(0);
        }

        if entries.is_empty() {
            ctx.output
                .info(&format!("No placeholders in {}", self.file.display()));
        }
        for entry in &entries {
            println!("{} -> {} {}", entry.key, entry.source_type, entry.identifier);
        }

        Ok(0)
    }
}
