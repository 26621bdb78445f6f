//! Placeholder sources and the prefix tables that recognize them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Provider that supplies the value of a placeholder.
///
/// The declaration order is the order in which prefix tables are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceType {
    /// KMS-encrypted ciphertext, base64 encoded
    Kms,
    /// SSM Parameter Store parameter, or a parameter path ending in `/*`
    Ssm,
    /// Secrets Manager secret holding a JSON object
    SecretsManager,
    /// Local file read verbatim
    File,
}

impl SourceType {
    /// All source types in matching order.
    pub const ALL: [SourceType; 4] = [
        SourceType::Kms,
        SourceType::Ssm,
        SourceType::SecretsManager,
        SourceType::File,
    ];

    /// Upper-case name used in prefixes and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Kms => "KMS",
            SourceType::Ssm => "SSM",
            SourceType::SecretsManager => "SECRETS_MANAGER",
            SourceType::File => "FILE",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "KMS" => Ok(SourceType::Kms),
            "SSM" => Ok(SourceType::Ssm),
            "SECRETS_MANAGER" | "SECRETSMANAGER" => Ok(SourceType::SecretsManager),
            "FILE" => Ok(SourceType::File),
            _ => Err(format!("Unknown source type: {}", s)),
        }
    }
}

// Serialized as the upper-case name so it also works as a map key.
impl Serialize for SourceType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourceType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A reference to a value held by an external provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Provider that resolves this source
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Key the resolved value is stored under; empty merges maps into the parent
    pub name: String,
    /// Provider-specific identifier (path, parameter name, secret id, ciphertext)
    pub identifier: String,
}

impl Source {
    /// Create a new source.
    pub fn new(
        source_type: SourceType,
        name: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            source_type,
            name: name.into(),
            identifier: identifier.into(),
        }
    }
}

/// Prefixes that mark a key or a value as a placeholder, one per provider.
///
/// Lookups walk the table in [`SourceType`] order, so matching is
/// deterministic even if two prefixes overlap.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixTable(BTreeMap<SourceType, String>);

impl PrefixTable {
    /// Build a table from `(type, prefix)` pairs.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (SourceType, S)>,
        S: Into<String>,
    {
        Self(entries.into_iter().map(|(t, p)| (t, p.into())).collect())
    }

    /// Default key prefixes: `KMS_`, `SSM_`, `SECRETS_MANAGER_`, `FILE_`.
    pub fn default_keys() -> Self {
        Self::new(SourceType::ALL.map(|t| (t, format!("{}_", t.as_str()))))
    }

    /// Default value prefixes: `kms://`, `ssm://`, `secrets-manager://`, `file://`.
    pub fn default_values() -> Self {
        Self::new(SourceType::ALL.map(|t| {
            (t, format!("{}://", t.as_str().to_lowercase().replace('_', "-")))
        }))
    }

    /// Return a copy with the entries of `overrides` replacing ours.
    pub fn merged(&self, overrides: &PrefixTable) -> Self {
        let mut table = self.0.clone();
        for (source_type, prefix) in &overrides.0 {
            table.insert(*source_type, prefix.clone());
        }
        Self(table)
    }

    /// Prefix registered for a source type.
    pub fn get(&self, source_type: SourceType) -> Option<&str> {
        self.0.get(&source_type).map(String::as_str)
    }

    /// Find the first entry whose prefix starts `text`, returning the type and
    /// the remainder after the prefix.
    pub fn strip<'a>(&self, text: &'a str) -> Option<(SourceType, &'a str)> {
        self.0
            .iter()
            .filter(|(_, prefix)| !prefix.is_empty())
            .find_map(|(source_type, prefix)| {
                text.strip_prefix(prefix.as_str())
                    .map(|rest| (*source_type, rest))
            })
    }

    /// Iterate over `(type, prefix)` pairs in matching order.
    pub fn iter(&self) -> impl Iterator<Item = (SourceType, &str)> {
        self.0.iter().map(|(t, p)| (*t, p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefixes() {
        let keys = PrefixTable::default_keys();
        assert_eq!(keys.get(SourceType::Kms), Some("KMS_"));
        assert_eq!(keys.get(SourceType::SecretsManager), Some("SECRETS_MANAGER_"));

        let values = PrefixTable::default_values();
        assert_eq!(values.get(SourceType::Ssm), Some("ssm://"));
        assert_eq!(values.get(SourceType::SecretsManager), Some("secrets-manager://"));
        assert_eq!(values.get(SourceType::File), Some("file://"));
    }

    #[test]
    fn test_strip_returns_remainder() {
        let values = PrefixTable::default_values();
        assert_eq!(
            values.strip("ssm:///app/db/password"),
            Some((SourceType::Ssm, "/app/db/password"))
        );
        assert_eq!(values.strip("postgres://localhost"), None);
    }

    #[test]
    fn test_strip_follows_type_order_on_overlap() {
        let table = PrefixTable::new([(SourceType::File, "X_"), (SourceType::Kms, "X_")]);
        assert_eq!(table.strip("X_FOO"), Some((SourceType::Kms, "FOO")));
    }

    #[test]
    fn test_merged_overrides_single_entry() {
        let overrides = PrefixTable::new([(SourceType::Ssm, "PARAM_")]);
        let merged = PrefixTable::default_keys().merged(&overrides);
        assert_eq!(merged.get(SourceType::Ssm), Some("PARAM_"));
        assert_eq!(merged.get(SourceType::Kms), Some("KMS_"));
    }

    #[test]
    fn test_source_type_round_trips_through_str() {
        for source_type in SourceType::ALL {
            assert_eq!(source_type.as_str().parse::<SourceType>().unwrap(), source_type);
        }
        assert_eq!(
            "secrets-manager".parse::<SourceType>().unwrap(),
            SourceType::SecretsManager
        );
        assert!("vault".parse::<SourceType>().is_err());
    }
}
