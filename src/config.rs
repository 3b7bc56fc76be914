use crate::target::{Target, TrustSettings};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config file {0} declares no databases")]
    Empty(PathBuf),

    #[error("database with ID '{0}' not found in config")]
    UnknownTarget(String),
}

/// A single `databases.<id>` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabaseEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    host: String,
    port: Option<u16>,
    #[serde(default)]
    user: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    name: String,
    health_query: Option<String>,
    tls_mode: Option<String>,
    root_cert_path: Option<PathBuf>,
    client_cert_path: Option<PathBuf>,
    client_key_path: Option<PathBuf>,
    wallet_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    #[serde(default)]
    databases: BTreeMap<String, DatabaseEntry>,
}

/// Loaded configuration: target definitions keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct Config {
    targets: BTreeMap<String, Target>,
}

fn non_empty(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
}

impl DatabaseEntry {
    fn into_target(self, id: String) -> Target {
        Target {
            id,
            kind: self.kind,
            host: self.host,
            port: self.port,
            principal: self.user,
            encrypted_secret: self.password.trim().to_string(),
            database: self.name,
            health_query: self.health_query,
            trust: TrustSettings {
                mode: self.tls_mode,
                root_cert: non_empty(self.root_cert_path),
                client_cert: non_empty(self.client_cert_path),
                client_key: non_empty(self.client_key_path),
                wallet: non_empty(self.wallet_path),
            },
        }
    }
}

impl Config {
    /// Read and parse a configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// declares no databases
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&data).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ConfigError::Empty(_) => ConfigError::Empty(path.to_path_buf()),
            other => other,
        })
    }

    /// Parse configuration from a YAML (or JSON) string
    ///
    /// # Errors
    ///
    /// Returns an error if the document is invalid or declares no databases
    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        let document: Document =
            serde_yaml::from_str(data).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;

        if document.databases.is_empty() {
            return Err(ConfigError::Empty(PathBuf::new()));
        }

        let targets = document
            .databases
            .into_iter()
            .map(|(id, entry)| (id.clone(), entry.into_target(id)))
            .collect();

        Ok(Self { targets })
    }

    #[must_use]
    pub fn targets(&self) -> Vec<Target> {
        self.targets.values().cloned().collect()
    }

    /// Look up a single target by identifier
    ///
    /// # Errors
    ///
    /// Returns an error if no target with that identifier exists
    pub fn target(&self, id: &str) -> Result<Target, ConfigError> {
        self.targets
            .get(id)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownTarget(id.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r"
databases:
  orders:
    type: postgres
    host: db.example.com
    port: 5432
    user: app
    password: c2VjcmV0
    name: orders
    health_query: SELECT 1
    tls_mode: verify-full
    root_cert_path: /etc/ssl/ca.crt
  cache:
    type: sqlite
    name: /var/lib/cache.db
  ledger:
    type: oracle
    host: ora.example.com
    user: ledger
    name: LEDGER
    tls_mode: verify-ca
    wallet_path: /etc/oracle/wallet
    client_cert_path: ''
";

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.len(), 3);

        let orders = config.target("orders").unwrap();
        assert_eq!(orders.kind, "postgres");
        assert_eq!(orders.port, Some(5432));
        assert_eq!(orders.principal, "app");
        assert_eq!(orders.encrypted_secret, "c2VjcmV0");
        assert_eq!(orders.health_query(), Some("SELECT 1"));
        assert_eq!(orders.trust.mode.as_deref(), Some("verify-full"));
        assert_eq!(
            orders.trust.root_cert,
            Some(PathBuf::from("/etc/ssl/ca.crt"))
        );

        let cache = config.target("cache").unwrap();
        assert_eq!(cache.port, None);
        assert!(cache.encrypted_secret.is_empty());
        assert_eq!(cache.trust, TrustSettings::default());

        let ledger = config.target("ledger").unwrap();
        assert_eq!(ledger.trust.client_cert, None);
        assert_eq!(
            ledger.trust.wallet,
            Some(PathBuf::from("/etc/oracle/wallet"))
        );
    }

    #[test]
    fn test_targets_are_sorted_by_id() {
        let config = Config::parse(SAMPLE).unwrap();
        let ids: Vec<String> = config.targets().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["cache", "ledger", "orders"]);
    }

    #[test]
    fn test_unknown_kind_and_mode_are_not_rejected() {
        let config = Config::parse(
            "databases:\n  x:\n    type: cassandra\n    tls_mode: sometimes\n",
        )
        .unwrap();
        let x = config.target("x").unwrap();
        assert_eq!(x.kind, "cassandra");
        assert_eq!(x.trust.mode.as_deref(), Some("sometimes"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = Config::parse("databases:\n  x:\n    type: mysql\n    tls: true\n");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            Config::parse("databases: {}\n"),
            Err(ConfigError::Empty(_))
        ));
        assert!(matches!(Config::parse("{}"), Err(ConfigError::Empty(_))));
    }

    #[test]
    fn test_json_is_accepted() {
        let config =
            Config::parse(r#"{"databases": {"a": {"type": "mongodb", "port": 27018}}}"#).unwrap();
        assert_eq!(config.target("a").unwrap().port, Some(27018));
    }

    #[test]
    fn test_unknown_target() {
        let config = Config::parse(SAMPLE).unwrap();
        let err = config.target("missing").unwrap_err();
        assert!(err.to_string().contains("'missing' not found"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/dbdiag.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/dbdiag.yaml"));
    }
}
