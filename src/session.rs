//! AWS session setup.
//!
//! Every command that talks to AWS starts here: the region is picked from the
//! command line, the environment, or the settings fallback, and the default
//! credential chain is optionally exchanged for temporary credentials through
//! STS (assumed role, or an MFA session token).

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use clap::Args;
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::config::Defaults;
use crate::error::{Error, Result};

const CREDENTIALS_PROVIDER_NAME: &str = "awstools";

/// Session flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct SessionFlags {
    /// ARN of a role to assume before running the command
    #[arg(long, global = true)]
    pub assume_role_arn: Option<String>,

    /// External ID passed when assuming the role
    #[arg(long, global = true)]
    pub assume_role_external_id: Option<String>,

    /// Session name used when assuming the role
    #[arg(long, global = true)]
    pub assume_role_session_name: Option<String>,

    /// AWS region (falls back to AWS_REGION, AWS_DEFAULT_REGION, then settings)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Serial number or ARN of the MFA device
    #[arg(long, global = true)]
    pub mfa_serial_number: Option<String>,

    /// Current MFA token code; prompted for when missing
    #[arg(long, global = true)]
    pub mfa_token_code: Option<String>,

    /// Lifetime of temporary credentials (e.g. "1h", "90m")
    #[arg(long, global = true, value_parser = humantime_serde::re::humantime::parse_duration)]
    pub session_duration: Option<Duration>,
}

impl SessionFlags {
    /// Whether temporary credentials will be requested from STS.
    pub fn uses_sts(&self) -> bool {
        self.assume_role_arn.is_some() || self.mfa_serial_number.is_some()
    }
}

/// Identity reported by STS `GetCallerIdentity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerIdentity {
    /// Account number
    pub account: String,
    /// ARN of the calling principal
    pub arn: String,
    /// Unique id of the calling principal
    pub user_id: String,
}

/// Pick the region: flag, `AWS_REGION`, `AWS_DEFAULT_REGION`, then `fallback`.
pub fn resolve_region(flag: Option<&str>, fallback: &str) -> String {
    flag.filter(|r| !r.is_empty())
        .map(str::to_string)
        .or_else(|| non_empty_env("AWS_REGION"))
        .or_else(|| non_empty_env("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|| fallback.to_string())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Reject static credentials in the environment that carry stray whitespace.
pub fn check_credential_env() -> Result<()> {
    for name in ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"] {
        if let Ok(value) = std::env::var(name) {
            if value.trim() != value {
                return Err(Error::Session(format!(
                    "{} has leading or trailing whitespace",
                    name
                )));
            }
        }
    }
    Ok(())
}

/// Default session name for assumed roles: `awstools-<unix seconds>`.
pub fn default_session_name() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("awstools-{}", now)
}

fn duration_seconds(duration: Duration) -> Result<i32> {
    i32::try_from(duration.as_secs())
        .map_err(|_| Error::Session(format!("Session duration too long: {:?}", duration)))
}

/// Load the AWS configuration for a command, exchanging credentials through
/// STS when a role or MFA device is given.
pub async fn open_session(flags: &SessionFlags, defaults: &Defaults) -> Result<SdkConfig> {
    check_credential_env()?;

    let region = resolve_region(flags.region.as_deref(), &defaults.fallback_region);
    debug!("Using region {}", region);

    let base = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.clone()))
        .load()
        .await;

    if !flags.uses_sts() {
        return Ok(base);
    }

    let duration = flags.session_duration.unwrap_or(defaults.session_duration);
    let credentials = match &flags.assume_role_arn {
        Some(role_arn) => assume_role(&base, flags, defaults, role_arn, duration).await?,
        None => session_token(&base, flags, duration).await?,
    };

    Ok(aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region))
        .credentials_provider(credentials)
        .load()
        .await)
}

async fn assume_role(
    base: &SdkConfig,
    flags: &SessionFlags,
    defaults: &Defaults,
    role_arn: &str,
    duration: Duration,
) -> Result<Credentials> {
    let session_name = flags
        .assume_role_session_name
        .clone()
        .or_else(|| defaults.role_session_name.clone())
        .unwrap_or_else(default_session_name);

    info!("Assuming role {} as {}", role_arn, session_name);

    let mut request = aws_sdk_sts::Client::new(base)
        .assume_role()
        .role_arn(role_arn)
        .role_session_name(session_name)
        .duration_seconds(duration_seconds(duration)?);

    if let Some(external_id) = &flags.assume_role_external_id {
        request = request.external_id(external_id);
    }
    if let Some(serial) = &flags.mfa_serial_number {
        request = request.serial_number(serial).token_code(mfa_token_code(flags)?);
    }

    let output = request.send().await.map_err(|e| Error::provider("STS", e))?;
    let credentials = output
        .credentials
        .ok_or_else(|| Error::Session(format!("AssumeRole on {} returned no credentials", role_arn)))?;

    Ok(static_credentials(&credentials))
}

async fn session_token(base: &SdkConfig, flags: &SessionFlags, duration: Duration) -> Result<Credentials> {
    let serial = flags.mfa_serial_number.as_deref().unwrap_or_default();
    info!("Requesting session token for MFA device {}", serial);

    let output = aws_sdk_sts::Client::new(base)
        .get_session_token()
        .serial_number(serial)
        .token_code(mfa_token_code(flags)?)
        .duration_seconds(duration_seconds(duration)?)
        .send()
        .await
        .map_err(|e| Error::provider("STS", e))?;

    let credentials = output
        .credentials
        .ok_or_else(|| Error::Session("GetSessionToken returned no credentials".to_string()))?;

    Ok(static_credentials(&credentials))
}

fn static_credentials(credentials: &aws_sdk_sts::types::Credentials) -> Credentials {
    Credentials::new(
        credentials.access_key_id(),
        credentials.secret_access_key(),
        Some(credentials.session_token().to_string()),
        SystemTime::try_from(*credentials.expiration()).ok(),
        CREDENTIALS_PROVIDER_NAME,
    )
}

fn mfa_token_code(flags: &SessionFlags) -> Result<String> {
    if let Some(code) = &flags.mfa_token_code {
        return Ok(code.clone());
    }

    dialoguer::Input::<String>::new()
        .with_prompt("MFA token code")
        .interact_text()
        .map_err(|e| Error::Session(format!("Failed to read MFA token code: {}", e)))
}

/// Ask STS who the current credentials belong to.
pub async fn caller_identity(config: &SdkConfig) -> Result<CallerIdentity> {
    let output = aws_sdk_sts::Client::new(config)
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| Error::provider("STS", e))?;

    Ok(CallerIdentity {
        account: output.account().unwrap_or_default().to_string(),
        arn: output.arn().unwrap_or_default().to_string(),
        user_id: output.user_id().unwrap_or_default().to_string(),
    })
}
