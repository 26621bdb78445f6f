//! # awstools - operational helpers for AWS
//!
//! awstools resolves configuration documents whose values live in AWS. A
//! JSON document may mark any leaf as a placeholder for a KMS ciphertext, an
//! SSM parameter (or a whole parameter path), a Secrets Manager secret, or a
//! local file. The resolver replaces each placeholder with the fetched value
//! and hands back plain JSON or a typed struct.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           CLI Interface                              │
//! │          (resolve / env / inspect / whoami, clap-based)              │
//! └─────────────────────────────────────────────────────────────────────┘
//!                  │                                   │
//!                  ▼                                   ▼
//! ┌──────────────────────────────────┐   ┌──────────────────────────────┐
//! │          ConfigValues            │   │           Session             │
//! │  (placeholder tree + refresh,    │   │  (region, STS assume-role,    │
//! │   retried with backoff)          │   │   MFA session tokens)         │
//! └──────────────────────────────────┘   └──────────────────────────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            Providers                                 │
//! │             (SSM, Secrets Manager, KMS, local files)                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use awstools::prelude::*;
//!
//! #[derive(serde::Deserialize)]
//! struct AppConfig {
//!     database_url: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let settings = Settings::load(None)?;
//!     let sdk_config = open_session(&SessionFlags::default(), &settings.defaults).await?;
//!
//!     let mut values = ConfigValues::from_settings(&settings.resolver);
//!     values.set_from_json("config.json")?;
//!
//!     let config: AppConfig = values.refresh_with_retries(&sdk_config).await?;
//!     println!("{}", config.database_url);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.
    //!
    //! ```rust,ignore
    //! use awstools::prelude::*;
    //! ```

    pub use crate::config::Settings;
    pub use crate::config_values::{
        flatten_to_env, ConfigNode, ConfigValues, Providers, Source, SourceType,
    };
    pub use crate::error::{Error, Result};
    pub use crate::retry::RetryPolicy;
    pub use crate::session::{open_session, SessionFlags};
}

/// Error types and the crate `Result` alias.
pub mod error;

/// Tool settings loaded from TOML files and the environment.
pub mod config;

/// Placeholder recognition and resolution.
pub mod config_values;

/// Bounded retries with backoff.
pub mod retry;

/// AWS region and credential setup.
pub mod session;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
