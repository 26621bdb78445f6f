//! Provider clients used to dereference placeholder sources.
//!
//! [`Providers`] is the seam between the resolver and the network: one method
//! per remote lookup, returning raw provider data. Interpretation of that data
//! (path keying, secret decoding, UTF-8 conversion) stays in the resolver.
//!
//! [`AwsProviders`] is the production implementation. Each SDK client is built
//! on first use and reused for the rest of the refresh.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_kms::primitives::Blob;
use tracing::debug;

use crate::error::{Error, Result};

/// Raw secret content as returned by Secrets Manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretPayload {
    /// `SecretString`
    Text(String),
    /// `SecretBinary`, expected to hold base64 text
    Binary(Vec<u8>),
}

/// Remote lookups needed to resolve placeholder sources.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Providers: Send {
    /// Fetch one decrypted SSM parameter value.
    async fn get_parameter(&mut self, name: &str) -> Result<String>;

    /// Fetch every decrypted SSM parameter directly under `path`, as
    /// `(full name, value)` pairs.
    async fn get_parameters_by_path(&mut self, path: &str) -> Result<Vec<(String, String)>>;

    /// Fetch the `AWSCURRENT` version of a secret.
    async fn get_secret_value(&mut self, secret_id: &str) -> Result<SecretPayload>;

    /// Decrypt a KMS ciphertext blob.
    async fn decrypt(&mut self, ciphertext: Vec<u8>) -> Result<Vec<u8>>;
}

/// Providers backed by the AWS SDK.
pub struct AwsProviders {
    config: SdkConfig,
    ssm: Option<aws_sdk_ssm::Client>,
    secrets_manager: Option<aws_sdk_secretsmanager::Client>,
    kms: Option<aws_sdk_kms::Client>,
}

impl AwsProviders {
    /// Create providers for one refresh; no client is built yet.
    pub fn new(config: SdkConfig) -> Self {
        Self {
            config,
            ssm: None,
            secrets_manager: None,
            kms: None,
        }
    }

    fn ssm(&mut self) -> &aws_sdk_ssm::Client {
        let config = &self.config;
        self.ssm.get_or_insert_with(|| {
            debug!("Creating SSM client");
            aws_sdk_ssm::Client::new(config)
        })
    }

    fn secrets_manager(&mut self) -> &aws_sdk_secretsmanager::Client {
        let config = &self.config;
        self.secrets_manager.get_or_insert_with(|| {
            debug!("Creating Secrets Manager client");
            aws_sdk_secretsmanager::Client::new(config)
        })
    }

    fn kms(&mut self) -> &aws_sdk_kms::Client {
        let config = &self.config;
        self.kms.get_or_insert_with(|| {
            debug!("Creating KMS client");
            aws_sdk_kms::Client::new(config)
        })
    }
}

#[async_trait]
impl Providers for AwsProviders {
    async fn get_parameter(&mut self, name: &str) -> Result<String> {
        let output = self
            .ssm()
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| Error::provider("SSM", e))?;

        output
            .parameter
            .and_then(|p| p.value)
            .ok_or_else(|| Error::Provider {
                provider: "SSM",
                message: format!("parameter '{}' has no value", name),
            })
    }

    async fn get_parameters_by_path(&mut self, path: &str) -> Result<Vec<(String, String)>> {
        let client = self.ssm().clone();
        let mut parameters = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = client
                .get_parameters_by_path()
                .path(path)
                .with_decryption(true)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| Error::provider("SSM", e))?;

            for parameter in output.parameters.unwrap_or_default() {
                if let (Some(name), Some(value)) = (parameter.name, parameter.value) {
                    parameters.push((name, value));
                }
            }

            match output.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        debug!("Fetched {} parameters under {}", parameters.len(), path);
        Ok(parameters)
    }

    async fn get_secret_value(&mut self, secret_id: &str) -> Result<SecretPayload> {
        let output = self
            .secrets_manager()
            .get_secret_value()
            .secret_id(secret_id)
            .version_stage("AWSCURRENT")
            .send()
            .await
            .map_err(|e| Error::provider("SECRETS_MANAGER", e))?;

        if let Some(text) = output.secret_string {
            Ok(SecretPayload::Text(text))
        } else if let Some(binary) = output.secret_binary {
            Ok(SecretPayload::Binary(binary.into_inner()))
        } else {
            Err(Error::InvalidSecretFormat {
                secret: secret_id.to_string(),
                message: "no secret data in response".to_string(),
            })
        }
    }

    async fn decrypt(&mut self, ciphertext: Vec<u8>) -> Result<Vec<u8>> {
        let output = self
            .kms()
            .decrypt()
            .ciphertext_blob(Blob::new(ciphertext))
            .send()
            .await
            .map_err(|e| Error::provider("KMS", e))?;

        output
            .plaintext
            .map(Blob::into_inner)
            .ok_or_else(|| Error::Provider {
                provider: "KMS",
                message: "decrypt returned no plaintext".to_string(),
            })
    }
}

impl std::fmt::Debug for AwsProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsProviders")
            .field("region", &self.config.region())
            .field("ssm", &self.ssm.is_some())
            .field("secrets_manager", &self.secrets_manager.is_some())
            .field("kms", &self.kms.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::BehaviorVersion;

    #[tokio::test]
    async fn test_clients_are_built_lazily_and_once() {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new("eu-west-1"))
            .load()
            .await;
        let mut providers = AwsProviders::new(config);
        assert!(providers.ssm.is_none());
        assert!(providers.kms.is_none());

        providers.ssm();
        providers.ssm();
        assert!(providers.ssm.is_some());
        assert!(providers.secrets_manager.is_none());
        assert!(providers.kms.is_none());
    }
}
