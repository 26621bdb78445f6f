//! Shared test utilities for the awstools test suite.
//!
//! This module provides:
//! - An in-memory [`Providers`] implementation with call counting
//! - Helpers for writing JSON documents into temporary directories
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use awstools::config_values::{Providers, SecretPayload};
use awstools::error::{Error, Result};

/// Prefix a fake ciphertext must carry to decrypt.
pub const FAKE_CIPHERTEXT_PREFIX: &[u8] = b"enc:";

/// In-memory providers backed by plain maps.
#[derive(Debug, Default, Clone)]
pub struct FakeProviders {
    /// SSM parameters by full name
    pub parameters: BTreeMap<String, String>,
    /// Secrets by id
    pub secrets: BTreeMap<String, SecretPayload>,
    /// When set, every call fails with this message
    pub fail_with: Option<String>,
    /// Number of provider calls made
    pub calls: Arc<AtomicU32>,
}

impl FakeProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.parameters.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_secret(mut self, id: &str, json: &str) -> Self {
        self.secrets
            .insert(id.to_string(), SecretPayload::Text(json.to_string()));
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, provider: &'static str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(message) => Err(Error::Provider {
                provider,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Providers for FakeProviders {
    async fn get_parameter(&mut self, name: &str) -> Result<String> {
        self.record("SSM")?;
        self.parameters.get(name).cloned().ok_or_else(|| Error::Provider {
            provider: "SSM",
            message: format!("ParameterNotFound: {}", name),
        })
    }

    async fn get_parameters_by_path(&mut self, path: &str) -> Result<Vec<(String, String)>> {
        self.record("SSM")?;
        let prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(self
            .parameters
            .iter()
            .filter(|(name, _)| {
                name.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.contains('/'))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect())
    }

    async fn get_secret_value(&mut self, secret_id: &str) -> Result<SecretPayload> {
        self.record("SECRETS_MANAGER")?;
        self.secrets
            .get(secret_id)
            .cloned()
            .ok_or_else(|| Error::Provider {
                provider: "SECRETS_MANAGER",
                message: format!("ResourceNotFoundException: {}", secret_id),
            })
    }

    async fn decrypt(&mut self, ciphertext: Vec<u8>) -> Result<Vec<u8>> {
        self.record("KMS")?;
        ciphertext
            .strip_prefix(FAKE_CIPHERTEXT_PREFIX)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Provider {
                provider: "KMS",
                message: "InvalidCiphertextException".to_string(),
            })
    }
}

/// Write `value` as JSON to `dir/name` and return the path.
pub fn write_json(dir: &Path, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

/// Write raw text to `dir/name` and return the path.
pub fn write_text(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}
