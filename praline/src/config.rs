//! Explicit connection and mapping configuration.

use crate::common::DEFAULT_DATABASE;
use crate::errors::{ErrorKind, PralineError, PralineResult};
use indexmap::IndexMap;

/// Configuration for a [Praline](crate::Praline) handle.
///
/// Everything is explicit and threaded through [`Praline::open`]; there is
/// no process-wide connection state. Host, port, and the option map are
/// passed along to backends that dial out; the bundled in-memory backend
/// ignores them.
///
/// # Examples
///
/// ```rust,ignore
/// use praline::Config;
///
/// let config = Config::new()
///     .database("candy_test")
///     .host("localhost")
///     .port(27017)
///     .hydrate_finds(true);
/// let db = praline::Praline::open(config)?;
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    host: Option<String>,
    port: Option<u16>,
    database: String,
    options: IndexMap<String, String>,
    hydrate_finds: bool,
}

impl Config {
    /// A configuration for the default database.
    pub fn new() -> Self {
        Config {
            host: None,
            port: None,
            database: DEFAULT_DATABASE.to_string(),
            options: IndexMap::new(),
            hydrate_finds: false,
        }
    }

    /// Sets the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sets the host passed to dial-out backends.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the port passed to dial-out backends.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Adds a backend option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Switches single-document finders (`first`, `find_by`) from
    /// identity-only projection to full-document hydration.
    pub fn hydrate_finds(mut self, hydrate: bool) -> Self {
        self.hydrate_finds = hydrate;
        self
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn host_name(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port_number(&self) -> Option<u16> {
        self.port
    }

    pub fn options(&self) -> &IndexMap<String, String> {
        &self.options
    }

    pub fn hydrates_finds(&self) -> bool {
        self.hydrate_finds
    }

    pub(crate) fn validate(&self) -> PralineResult<()> {
        if self.database.is_empty() {
            log::error!("Database name cannot be empty");
            return Err(PralineError::new(
                "Database name cannot be empty",
                ErrorKind::ConnectionConfig,
            ));
        }
        if self.port == Some(0) {
            log::error!("Port 0 is not a valid backend port");
            return Err(PralineError::new(
                "Port 0 is not a valid backend port",
                ErrorKind::ConnectionConfig,
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
