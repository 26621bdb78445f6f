//! Env command implementation
//!
//! Flattens a resolved document into environment variables and either prints
//! them or runs a command with them.

use super::CommandContext;
use anyhow::{Context, Result};
use awstools::config_values::flatten_to_env;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Arguments for the env command
#[derive(Parser, Debug, Clone)]
pub struct EnvArgs {
    /// JSON configuration document
    pub file: PathBuf,

    /// Prefix prepended to every variable name
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Print `export KEY='value'` lines
    #[arg(long)]
    pub export: bool,

    /// Command to run with the variables set
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl EnvArgs {
    /// Execute the env command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let values = ctx.load_values(&self.file)?;
        let resolved = ctx.resolve_values(&values).await?;
        let env = flatten_to_env(&resolved, &self.prefix);

        match self.command.split_first() {
            Some((program, args)) => {
                if self.export {
                    ctx.output.warning("--export has no effect when running a command");
                }
                run_command(ctx, program, args, &env).await
            }
            None => {
                if ctx.output.is_json() {
                    ctx.output.json(&env)?;
                } else {
                    for line in render_lines(&env, self.export) {
                        println!("{}", line);
                    }
                }
                Ok(0)
            }
        }
    }
}

async fn run_command(
    ctx: &CommandContext,
    program: &str,
    args: &[String],
    env: &BTreeMap<String, String>,
) -> Result<i32> {
    ctx.output.debug(&format!(
        "Running {} with {} variable(s)",
        program,
        env.len()
    ));

    let status = tokio::process::Command::new(program)
        .args(args)
        .envs(env)
        .status()
        .await
        .with_context(|| format!("Failed to run {}", program))?;

    // Killed by a signal
    Ok(status.code().unwrap_or(1))
}

fn render_lines(env: &BTreeMap<String, String>, export: bool) -> Vec<String> {
    env.iter()
        .map(|(key, value)| {
            if export {
                format!("export {}={}", key, shell_words::quote(value))
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BTreeMap<String, String> {
        [
            ("DB_HOST".to_string(), "localhost".to_string()),
            ("GREETING".to_string(), "hello world".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_render_plain_lines() {
        assert_eq!(
            render_lines(&sample(), false),
            vec!["DB_HOST=localhost", "GREETING=hello world"]
        );
    }

    #[test]
    fn test_render_export_lines_are_quoted() {
        assert_eq!(
            render_lines(&sample(), true),
            vec!["export DB_HOST=localhost", "export GREETING='hello world'"]
        );
    }
}
