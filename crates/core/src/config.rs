//! Connection and environment configuration.
//!
//! Every config type can be built from an arbitrary key lookup so tests
//! never need to mutate the process environment. The `from_env`
//! constructors are thin wrappers over `std::env::var`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CoreError;

/// Default PostgreSQL port, used whenever a port is left blank.
pub const DEFAULT_PG_PORT: u16 = 5432;

/// Name of the table holding extracted works.
pub const WORKS_TABLE: &str = "aphrc_works";

// ---------------------------------------------------------------------------
// Local database
// ---------------------------------------------------------------------------

/// Connection settings for the database container, as seen from the
/// host through the published port.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalDbConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Full URL override (`DATABASE_URL`), takes precedence when set.
    pub url_override: Option<String>,
}

impl Default for LocalDbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PG_PORT,
            dbname: "openalex".to_string(),
            user: "user".to_string(),
            password: "password".to_string(),
            url_override: None,
        }
    }
}

impl LocalDbConfig {
    /// Read `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD` and
    /// `DATABASE_URL` through `lookup`, falling back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let port = match lookup("DB_PORT") {
            Some(raw) => parse_port("DB_PORT", &raw)?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup("DB_HOST").unwrap_or(defaults.host),
            port,
            dbname: lookup("DB_NAME").unwrap_or(defaults.dbname),
            user: lookup("DB_USER").unwrap_or(defaults.user),
            password: lookup("DB_PASSWORD").unwrap_or(defaults.password),
            url_override: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
        })
    }

    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Connection URL for `sqlx`.
    pub fn connection_url(&self) -> String {
        match &self.url_override {
            Some(url) => url.clone(),
            None => postgres_url(&self.user, &self.password, &self.host, self.port, &self.dbname),
        }
    }
}

impl fmt::Debug for LocalDbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalDbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("url_override", &self.url_override.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Remote database (export target)
// ---------------------------------------------------------------------------

/// The five parameters of an export target.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteDbConfig {
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl RemoteDbConfig {
    /// Positional arguments for the export script, in the order
    /// `dbname user password host port`.
    pub fn to_args(&self) -> [String; 5] {
        [
            self.dbname.clone(),
            self.user.clone(),
            self.password.clone(),
            self.host.clone(),
            self.port.to_string(),
        ]
    }

    pub fn connection_url(&self) -> String {
        postgres_url(&self.user, &self.password, &self.host, self.port, &self.dbname)
    }
}

impl fmt::Debug for RemoteDbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteDbConfig")
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Export parameters collected from flags and environment. Fields left
/// `None` are asked for interactively.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PartialRemoteDbConfig {
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
}

impl PartialRemoteDbConfig {
    /// Read the `REMOTE_DB_*` variables through `lookup`. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            dbname: set("REMOTE_DB_NAME"),
            user: set("REMOTE_DB_USER"),
            password: set("REMOTE_DB_PASSWORD"),
            host: set("REMOTE_DB_HOST"),
            port: set("REMOTE_DB_PORT"),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Fill any field missing in `self` from `fallback`.
    pub fn or(self, fallback: Self) -> Self {
        Self {
            dbname: self.dbname.or(fallback.dbname),
            user: self.user.or(fallback.user),
            password: self.password.or(fallback.password),
            host: self.host.or(fallback.host),
            port: self.port.or(fallback.port),
        }
    }

    /// Build the final config when every text field is present. A
    /// missing or blank port becomes [`DEFAULT_PG_PORT`].
    pub fn complete(&self) -> Result<Option<RemoteDbConfig>, CoreError> {
        let (Some(dbname), Some(user), Some(password), Some(host)) =
            (&self.dbname, &self.user, &self.password, &self.host)
        else {
            return Ok(None);
        };

        let port = normalize_port(self.port.as_deref().unwrap_or(""))?;
        Ok(Some(RemoteDbConfig {
            dbname: dbname.clone(),
            user: user.clone(),
            password: password.clone(),
            host: host.clone(),
            port,
        }))
    }
}

impl fmt::Debug for PartialRemoteDbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialRemoteDbConfig")
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Parse a user-supplied port. Blank input (after trimming) yields
/// [`DEFAULT_PG_PORT`].
pub fn normalize_port(input: &str) -> Result<u16, CoreError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_PG_PORT);
    }
    parse_port("port", trimmed)
}

fn parse_port(field: &'static str, raw: &str) -> Result<u16, CoreError> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(CoreError::InvalidConfig {
            field,
            message: format!("'{raw}' is not a valid TCP port"),
        }),
        Ok(port) => Ok(port),
    }
}

fn postgres_url(user: &str, password: &str, host: &str, port: u16, dbname: &str) -> String {
    format!(
        "postgres://{}:{}@{host}:{port}/{}",
        urlencoding::encode(user),
        urlencoding::encode(password),
        urlencoding::encode(dbname),
    )
}

// ---------------------------------------------------------------------------
// Runner environment
// ---------------------------------------------------------------------------

/// Where extraction, verification and export actually run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunnerMode {
    /// In-process implementation.
    #[default]
    Native,
    /// External Python scripts executed inside the runner container.
    Container,
}

impl RunnerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Container => "container",
        }
    }
}

impl FromStr for RunnerMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "container" => Ok(Self::Container),
            other => Err(CoreError::InvalidConfig {
                field: "mode",
                message: format!("'{other}' is not one of: native, container"),
            }),
        }
    }
}

impl fmt::Display for RunnerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names and paths of the container environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub compose_file: PathBuf,
    pub db_container: String,
    pub runner_container: String,
    /// Working directory inside the runner container.
    pub runner_workdir: String,
    /// Host directory holding the external scripts (container mode).
    pub scripts_dir: PathBuf,
    /// Role used for `psql` inside the database container.
    pub db_service_user: String,
    /// Database used for `psql` inside the database container.
    pub db_service_name: String,
    pub readiness_timeout: Duration,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            compose_file: PathBuf::from("docker-compose.yml"),
            db_container: "openalex_db".to_string(),
            runner_container: "openalex_runner".to_string(),
            runner_workdir: "/app".to_string(),
            scripts_dir: PathBuf::from("scripts"),
            db_service_user: "user".to_string(),
            db_service_name: "openalex".to_string(),
            readiness_timeout: Duration::from_secs(60),
        }
    }
}

impl EnvironmentConfig {
    /// Destination of `script` inside the runner container.
    pub fn runner_path(&self, script: &str) -> String {
        format!("{}/{script}", self.runner_workdir.trim_end_matches('/'))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
