//! Subcommands module for awstools CLI
//!
//! This module contains all the subcommand implementations.

pub mod env;
pub mod inspect;
pub mod resolve;
pub mod whoami;

use crate::cli::output::OutputFormatter;
use anyhow::{Context, Result};
use aws_config::SdkConfig;
use awstools::config::Settings;
use awstools::config_values::{ConfigValues, SourceType};
use awstools::session::{open_session, SessionFlags};
use serde_json::{Map, Value};
use std::path::Path;

/// Common context shared between commands
pub struct CommandContext {
    /// Tool settings
    pub settings: Settings,
    /// Output formatter
    pub output: OutputFormatter,
    /// AWS session flags
    pub session: SessionFlags,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, settings: Settings) -> Self {
        let use_color = !cli.no_color && settings.colors.enabled;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());

        Self {
            settings,
            output,
            session: cli.session.clone(),
        }
    }

    /// Parse a configuration document into its placeholder tree
    pub fn load_values(&self, file: &Path) -> Result<ConfigValues> {
        let mut values = ConfigValues::from_settings(&self.settings.resolver);
        values
            .set_from_json(file)
            .with_context(|| format!("Failed to load {}", file.display()))?;

        self.output.debug(&format!(
            "Found {} placeholder(s) in {}",
            values.sources().len(),
            file.display()
        ));
        Ok(values)
    }

    /// Open an AWS session from the global flags and settings
    pub async fn sdk_config(&self) -> Result<SdkConfig> {
        if self.session.uses_sts() {
            self.output.flush();
        }

        open_session(&self.session, &self.settings.defaults)
            .await
            .context("Failed to set up AWS session")
    }

    /// Resolve every placeholder of a document, with retries
    pub async fn resolve_values(&self, values: &ConfigValues) -> Result<Map<String, Value>> {
        let local_only = values
            .sources()
            .iter()
            .all(|(_, source)| source.source_type == SourceType::File);

        // Local files need no credentials
        let sdk_config = if local_only {
            SdkConfig::builder().build()
        } else {
            self.sdk_config().await?
        };

        let resolved = values
            .refresh_with_retries::<Map<String, Value>>(&sdk_config)
            .await?;

        self.output
            .info(&format!("Resolved {} top-level key(s)", resolved.len()));
        Ok(resolved)
    }
}
