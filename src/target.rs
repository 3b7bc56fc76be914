use serde::Serialize;
use std::{fmt, path::PathBuf, str::FromStr};

/// Database engine kind declared by a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Postgres,
    Mysql,
    SqlServer,
    Oracle,
    Sqlite,
    MongoDb,
}

impl Kind {
    pub const ALL: [Self; 6] = [
        Self::Postgres,
        Self::Mysql,
        Self::SqlServer,
        Self::Oracle,
        Self::Sqlite,
        Self::MongoDb,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::SqlServer => "sqlserver",
            Self::Oracle => "oracle",
            Self::Sqlite => "sqlite",
            Self::MongoDb => "mongodb",
        }
    }

    /// Port used when the target does not declare one, `None` for file based engines
    #[must_use]
    pub const fn default_port(&self) -> Option<u16> {
        match self {
            Self::Postgres => Some(5432),
            Self::Mysql => Some(3306),
            Self::SqlServer => Some(1433),
            Self::Oracle => Some(1521),
            Self::Sqlite => None,
            Self::MongoDb => Some(27017),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            "sqlserver" | "mssql" => Ok(Self::SqlServer),
            "oracle" => Ok(Self::Oracle),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "mongodb" | "mongo" => Ok(Self::MongoDb),
            _ => Err(format!("unsupported database type: {s}")),
        }
    }
}

/// Transport security settings exactly as declared for a target
///
/// The mode is kept as the raw string so that an unknown value surfaces as a
/// per-target outcome instead of aborting configuration loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustSettings {
    pub mode: Option<String>,
    pub root_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    pub wallet: Option<PathBuf>,
}

/// One configured database endpoint to check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    /// Engine kind as written in the configuration, parsed by the registry
    pub kind: String,
    pub host: String,
    pub port: Option<u16>,
    pub principal: String,
    /// Base64 `nonce || sealed` ciphertext, empty when no credential is stored
    pub encrypted_secret: String,
    pub database: String,
    pub health_query: Option<String>,
    pub trust: TrustSettings,
}

impl Target {
    /// Declared port, or the engine default
    #[must_use]
    pub fn port_or(&self, kind: Kind) -> u16 {
        self.port.or_else(|| kind.default_port()).unwrap_or_default()
    }

    /// Health query, treating an empty or blank string as absent
    #[must_use]
    pub fn health_query(&self) -> Option<&str> {
        self.health_query
            .as_deref()
            .map(str::trim)
            .filter(|query| !query.is_empty())
    }
}
