//! Configuration value resolution.
//!
//! A configuration document is a JSON object whose leaves are either literals
//! or placeholders pointing at an external provider. A leaf is a placeholder
//! when its key carries a key prefix (`KMS_`, `SSM_`, `SECRETS_MANAGER_`,
//! `FILE_`) or, failing that, when its string value carries a value prefix
//! (`kms://`, `ssm://`, `secrets-manager://`, `file://`).
//!
//! Resolution happens in two steps:
//!
//! 1. [`ConfigValues::set_from_map`] (or [`ConfigValues::set_from_json`]) turns
//!    the document into a tree of [`ConfigNode`]s, replacing placeholders with
//!    [`Source`] descriptors. No network access happens here.
//! 2. [`ConfigValues::refresh`] walks the tree and fetches each source through
//!    a [`Providers`] implementation. Any provider error aborts the whole
//!    refresh; [`ConfigValues::refresh_with_retries`] repeats it with backoff.
//!
//! ```json
//! {
//!   "SSM_DATABASE_PASSWORD": "/prod/db/password",
//!   "api_key": "kms://AQICAHh...",
//!   "SECRETS_MANAGER__": "prod/app",
//!   "settings": { "tls_cert": "file:///etc/app/cert.pem" }
//! }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use awstools::config_values::ConfigValues;
//!
//! let mut values = ConfigValues::new();
//! values.set_from_json("config.json")?;
//! let resolved: serde_json::Value = values.refresh_with_retries(&sdk_config).await?;
//! ```

mod providers;
mod source;

pub use providers::{AwsProviders, Providers, SecretPayload};
pub use source::{PrefixTable, Source, SourceType};

use aws_config::SdkConfig;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tracing::{debug, warn};

use crate::config::ResolverSettings;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// A node of the placeholder tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigNode {
    /// A value taken as is
    Literal(Value),
    /// A nested object
    Map(BTreeMap<String, ConfigNode>),
    /// A placeholder resolved at refresh time
    Source(Source),
}

impl ConfigNode {
    fn contains_source(&self) -> bool {
        match self {
            ConfigNode::Literal(_) => false,
            ConfigNode::Source(_) => true,
            ConfigNode::Map(map) => map.values().any(ConfigNode::contains_source),
        }
    }

    fn collect_sources<'a>(&'a self, path: String, out: &mut Vec<(String, &'a Source)>) {
        match self {
            ConfigNode::Literal(_) => {}
            ConfigNode::Source(source) => out.push((path, source)),
            ConfigNode::Map(map) => {
                for (key, node) in map {
                    let child = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };
                    node.collect_sources(child, out);
                }
            }
        }
    }
}

/// A configuration document with its placeholders identified.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValues {
    static_values: BTreeMap<String, ConfigNode>,
    /// Key prefixes marking placeholders
    pub key_prefixes: PrefixTable,
    /// Value prefixes marking placeholders
    pub value_prefixes: PrefixTable,
    /// Policy used by the `*_with_retries` methods
    pub retry: RetryPolicy,
}

impl Default for ConfigValues {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValues {
    /// Create an empty document with the default prefixes and retry policy.
    pub fn new() -> Self {
        Self {
            static_values: BTreeMap::new(),
            key_prefixes: PrefixTable::default_keys(),
            value_prefixes: PrefixTable::default_values(),
            retry: RetryPolicy::default(),
        }
    }

    /// Create an empty document configured from the tool settings.
    pub fn from_settings(settings: &ResolverSettings) -> Self {
        let mut values = Self::new().with_retry_policy(settings.retry_policy());
        if let Some(overrides) = &settings.key_prefixes {
            values.key_prefixes = values.key_prefixes.merged(overrides);
        }
        if let Some(overrides) = &settings.value_prefixes {
            values.value_prefixes = values.value_prefixes.merged(overrides);
        }
        values
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Drop every value.
    pub fn clear(&mut self) {
        self.static_values.clear();
    }

    /// Load the document from a JSON file whose root is an object.
    pub fn set_from_json(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::read_file(path, e))?;

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => {
                self.set_from_map(&map);
                Ok(())
            }
            other => Err(Error::InvalidConfig(format!(
                "{}: expected a JSON object at the root, found {}",
                path.display(),
                json_type_name(&other)
            ))),
        }
    }

    /// Replace the document with the placeholder tree of `map`.
    pub fn set_from_map(&mut self, map: &Map<String, Value>) {
        self.static_values = self.generate_from_map(map);
    }

    /// Build the placeholder tree of `src` without touching `self`.
    ///
    /// Key prefixes are checked before value prefixes. A key-prefixed source
    /// is stored under the key with the prefix removed, or under the original
    /// key when the remainder starts with `_` (the source is then unnamed).
    pub fn generate_from_map(&self, src: &Map<String, Value>) -> BTreeMap<String, ConfigNode> {
        let mut dst = BTreeMap::new();

        for (key, value) in src {
            let node = match value {
                Value::Object(inner) => ConfigNode::Map(self.generate_from_map(inner)),
                Value::String(text) => {
                    if let Some((source_type, rest)) = self.key_prefixes.strip(key) {
                        let name = if rest.starts_with('_') { "" } else { rest };
                        let stored_under = if name.is_empty() { key.as_str() } else { name };
                        dst.insert(
                            stored_under.to_string(),
                            ConfigNode::Source(Source::new(source_type, name, text.as_str())),
                        );
                        continue;
                    }

                    match self.value_prefixes.strip(text) {
                        Some((source_type, identifier)) => {
                            ConfigNode::Source(Source::new(source_type, key.as_str(), identifier))
                        }
                        None => ConfigNode::Literal(value.clone()),
                    }
                }
                _ => ConfigNode::Literal(value.clone()),
            };
            dst.insert(key.clone(), node);
        }

        dst
    }

    /// The placeholder tree.
    pub fn static_values(&self) -> &BTreeMap<String, ConfigNode> {
        &self.static_values
    }

    /// Whether refreshing would contact any provider.
    pub fn is_refreshable(&self) -> bool {
        self.static_values.values().any(ConfigNode::contains_source)
    }

    /// Every source in the tree with its dotted key path.
    pub fn sources(&self) -> Vec<(String, &Source)> {
        let mut out = Vec::new();
        for (key, node) in &self.static_values {
            node.collect_sources(key.clone(), &mut out);
        }
        out
    }

    /// Resolve every source once using the given providers.
    pub async fn resolve<P>(&self, providers: &mut P) -> Result<Map<String, Value>>
    where
        P: Providers + ?Sized,
    {
        refresh_map(&self.static_values, providers).await
    }

    /// Resolve with the retry policy, building fresh providers per attempt.
    pub async fn resolve_with_retries<P, F>(&self, mut make_providers: F) -> Result<Map<String, Value>>
    where
        P: Providers,
        F: FnMut() -> P,
    {
        self.retry
            .execute(|| {
                let mut providers = make_providers();
                async move { self.resolve(&mut providers).await }
            })
            .await
            .map_err(|e| {
                match &e.last_error {
                    Some(last) => warn!("Giving up on config refresh: {}", last),
                    None => warn!("Config refresh allows no attempts"),
                }
                Error::RefreshFailed {
                    attempts: e.attempts,
                }
            })
    }

    /// Resolve every source through AWS once and deserialize the result.
    pub async fn refresh<T: DeserializeOwned>(&self, sdk_config: &SdkConfig) -> Result<T> {
        let mut providers = AwsProviders::new(sdk_config.clone());
        let resolved = self.resolve(&mut providers).await?;
        Ok(serde_json::from_value(Value::Object(resolved))?)
    }

    /// Like [`refresh`](Self::refresh), retried according to `self.retry`.
    pub async fn refresh_with_retries<T: DeserializeOwned>(
        &self,
        sdk_config: &SdkConfig,
    ) -> Result<T> {
        let resolved = self
            .resolve_with_retries(|| AwsProviders::new(sdk_config.clone()))
            .await?;
        Ok(serde_json::from_value(Value::Object(resolved))?)
    }
}

type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<Map<String, Value>>> + Send + 'a>>;

/// Resolve one level of the placeholder tree, recursing into nested maps.
pub fn refresh_map<'a, P>(
    src: &'a BTreeMap<String, ConfigNode>,
    providers: &'a mut P,
) -> RefreshFuture<'a>
where
    P: Providers + ?Sized,
{
    Box::pin(async move {
        let mut dst = Map::new();

        for (key, node) in src {
            match node {
                ConfigNode::Map(inner) => {
                    let resolved = refresh_map(inner, &mut *providers).await?;
                    dst.insert(key.clone(), Value::Object(resolved));
                }
                ConfigNode::Source(source) => {
                    resolve_source(key, source, &mut *providers, &mut dst).await?;
                }
                ConfigNode::Literal(value) => {
                    dst.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(dst)
    })
}

async fn resolve_source<P>(
    key: &str,
    source: &Source,
    providers: &mut P,
    dst: &mut Map<String, Value>,
) -> Result<()>
where
    P: Providers + ?Sized,
{
    debug!(
        source_type = %source.source_type,
        name = %source.name,
        "Resolving {}",
        source.identifier
    );

    match source.source_type {
        SourceType::File => {
            let contents = tokio::fs::read_to_string(&source.identifier)
                .await
                .map_err(|e| Error::read_file(&source.identifier, e))?;
            dst.insert(source.name.clone(), Value::String(contents));
        }
        SourceType::Ssm => {
            if let Some(path) = source.identifier.strip_suffix("/*") {
                let parameters = providers.get_parameters_by_path(path).await?;
                insert_map(dst, key, source, key_by_last_segment(parameters));
            } else {
                let value = providers.get_parameter(&source.identifier).await?;
                dst.insert(source.name.clone(), Value::String(value));
            }
        }
        SourceType::SecretsManager => {
            let payload = providers.get_secret_value(&source.identifier).await?;
            insert_map(dst, key, source, decode_secret(&source.identifier, payload)?);
        }
        SourceType::Kms => {
            let ciphertext = BASE64.decode(source.identifier.trim())?;
            let plaintext = providers.decrypt(ciphertext).await?;
            let text = String::from_utf8(plaintext).map_err(|e| Error::Provider {
                provider: "KMS",
                message: format!("plaintext is not valid UTF-8: {}", e),
            })?;
            dst.insert(source.name.clone(), Value::String(text));
        }
    }

    Ok(())
}

// Unnamed sources spread their entries into the enclosing map.
fn insert_map(
    dst: &mut Map<String, Value>,
    key: &str,
    source: &Source,
    values: BTreeMap<String, String>,
) {
    if source.name.is_empty() {
        for (k, v) in values {
            dst.insert(k, Value::String(v));
        }
    } else {
        let object = values
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        dst.insert(key.to_string(), Value::Object(object));
    }
}

/// Key SSM parameters by the last `/`-separated segment of their name.
pub fn key_by_last_segment(parameters: Vec<(String, String)>) -> BTreeMap<String, String> {
    parameters
        .into_iter()
        .map(|(name, value)| {
            let key = name.rsplit('/').next().unwrap_or(&name).to_string();
            (key, value)
        })
        .collect()
}

/// Decode a Secrets Manager payload into a flat map of strings.
///
/// Binary payloads hold base64 text. The decoded content must be a JSON
/// object; numbers and booleans are stringified, `null` becomes empty.
pub fn decode_secret(secret_id: &str, payload: SecretPayload) -> Result<BTreeMap<String, String>> {
    let content = match payload {
        SecretPayload::Text(text) => text.into_bytes(),
        SecretPayload::Binary(bytes) => BASE64.decode(bytes)?,
    };

    let invalid = |message: String| Error::InvalidSecretFormat {
        secret: secret_id.to_string(),
        message,
    };

    let parsed: Map<String, Value> =
        serde_json::from_slice(&content).map_err(|e| invalid(e.to_string()))?;

    let mut result = BTreeMap::new();
    for (key, value) in parsed {
        let text = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            other => {
                return Err(invalid(format!(
                    "key '{}' holds {}, expected a string",
                    key,
                    json_type_name(&other)
                )))
            }
        };
        result.insert(key, text);
    }

    Ok(result)
}

/// Upper-case the keys of `source`, prefixing them with `PREFIX_` when a
/// prefix is given.
pub fn convert_map(source: &BTreeMap<String, String>, prefix: &str) -> BTreeMap<String, String> {
    source
        .iter()
        .map(|(key, value)| (env_key(prefix, key), value.clone()))
        .collect()
}

/// Flatten a resolved document into environment variables.
///
/// Nested objects are joined with `_`; keys are upper-cased. Strings are
/// kept verbatim, every other value is rendered as JSON text.
pub fn flatten_to_env(values: &Map<String, Value>, prefix: &str) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    flatten_into(&mut env, values, prefix);
    env
}

fn flatten_into(env: &mut BTreeMap<String, String>, values: &Map<String, Value>, prefix: &str) {
    for (key, value) in values {
        let name = env_key(prefix, key);
        match value {
            Value::Object(inner) => flatten_into(env, inner, &name),
            _ if name.is_empty() => {
                warn!("Skipping value with an empty name");
            }
            Value::String(text) => {
                env.insert(name, text.clone());
            }
            other => {
                env.insert(name, other.to_string());
            }
        }
    }
}

fn env_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_uppercase()
    } else if key.is_empty() {
        prefix.to_string()
    } else {
        format!("{}_{}", prefix, key.to_uppercase())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
