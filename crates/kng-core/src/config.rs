//! Harvester configuration.
//!
//! Read once from a YAML file, then overridden by environment variables:
//!
//! ```yaml
//! email: reader@example.com
//! password: app-password
//! service: gmail
//! ```
//!
//! Every other field has a default.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dedup::{COMPLETED_FILE_NAME, DATA_DIR_NAME};
use crate::error::{Error, Result};
use crate::extract::SUBJECT_PREFIX;
use crate::fetcher::DEFAULT_FETCH_BUFFER;

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "kng-config.yaml";

/// Environment variable overriding `email`.
pub const EMAIL_ENV: &str = "KNG_EMAIL";

/// Environment variable overriding `password`.
pub const PASSWORD_ENV: &str = "KNG_PASSWORD";

/// Default mailbox search text, matched against message bodies.
pub const DEFAULT_SEARCH: &str = "FROM no-reply@amazon.com";

/// Default mail service preset.
pub const DEFAULT_SERVICE: &str = "gmail";

/// IMAP server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapServer {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl ImapServer {
    /// Looks up the implicit-TLS server of a known mail service.
    #[must_use]
    pub fn for_service(service: &str) -> Option<Self> {
        let host = match service.to_ascii_lowercase().as_str() {
            "gmail" => "imap.gmail.com",
            "outlook" => "outlook.office365.com",
            "yahoo" => "imap.mail.yahoo.com",
            "icloud" => "imap.mail.me.com",
            "fastmail" => "imap.fastmail.com",
            _ => return None,
        };
        Some(Self {
            host: host.to_string(),
            port: kng_imap::Security::Implicit.default_port(),
        })
    }
}

/// Settings for one harvester run.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mailbox login.
    pub email: String,
    /// Mailbox password, usually an app password.
    pub password: String,
    /// Mail service preset, see [`ImapServer::for_service`].
    pub service: String,
    /// Server hostname, overriding the service preset.
    pub host: Option<String>,
    /// Server port, overriding the preset port.
    pub port: Option<u16>,
    /// Mailbox to search.
    pub mailbox: String,
    /// Text the message body must contain.
    pub search: String,
    /// Subject prefix of notification mail.
    pub subject_prefix: String,
    /// Capacity of the fetch channel.
    pub fetch_buffer: usize,
    /// Seconds allowed for TCP connect plus TLS handshake.
    pub connect_timeout_secs: u64,
    /// Seconds allowed for each server response.
    pub io_timeout_secs: u64,
    /// Directory notebook files are written to.
    pub output_dir: PathBuf,
    /// Directory holding the completed-notebooks file. Defaults to
    /// `~/kindle-notes`.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            service: DEFAULT_SERVICE.to_string(),
            host: None,
            port: None,
            mailbox: "INBOX".to_string(),
            search: DEFAULT_SEARCH.to_string(),
            subject_prefix: SUBJECT_PREFIX.to_string(),
            fetch_buffer: DEFAULT_FETCH_BUFFER,
            connect_timeout_secs: 30,
            io_timeout_secs: 60,
            output_dir: PathBuf::from("."),
            data_dir: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("service", &self.service)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("mailbox", &self.mailbox)
            .field("search", &self.search)
            .field("subject_prefix", &self.subject_prefix)
            .field("fetch_buffer", &self.fetch_buffer)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("io_timeout_secs", &self.io_timeout_secs)
            .field("output_dir", &self.output_dir)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl Config {
    /// Parses a YAML document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML for this shape.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads the configuration and applies environment overrides.
    ///
    /// With no explicit path, [`Config::default_path`] is tried and a missing
    /// file means defaults plus environment. Credentials are not checked
    /// here; see [`Config::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing or the file does not
    /// parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::read(&path)?
                } else {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml(&yaml)
    }

    /// `~/kng-config.yaml` when it exists, else `./kng-config.yaml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Overrides credentials from `KNG_EMAIL` and `KNG_PASSWORD`.
    ///
    /// Empty variables are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(email) = lookup(EMAIL_ENV).filter(|v| !v.is_empty()) {
            self.email = email;
        }
        if let Some(password) = lookup(PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.password = password;
        }
    }

    /// Checks that credentials are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the missing setting.
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(Error::Config(format!("email is not set (config file or {EMAIL_ENV})")));
        }
        if self.password.is_empty() {
            return Err(Error::Config(format!(
                "password is not set (config file or {PASSWORD_ENV})"
            )));
        }
        Ok(())
    }

    /// Directory holding the completed-notebooks file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no data directory is set and the home
    /// directory cannot be determined.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(DATA_DIR_NAME))
            .ok_or_else(|| Error::Config("cannot determine home directory".to_string()))
    }

    /// Path of the completed-notebooks file.
    ///
    /// # Errors
    ///
    /// See [`Config::data_dir`].
    pub fn completed_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(COMPLETED_FILE_NAME))
    }

    /// Resolves the server from `host`/`port` or the service preset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown service without `host`.
    pub fn server(&self) -> Result<ImapServer> {
        let mut server = match &self.host {
            Some(host) => ImapServer {
                host: host.clone(),
                port: kng_imap::Security::Implicit.default_port(),
            },
            None => ImapServer::for_service(&self.service).ok_or_else(|| {
                Error::Config(format!(
                    "unknown service '{}', set host in the config file",
                    self.service
                ))
            })?,
        };
        if let Some(port) = self.port {
            server.port = port;
        }
        Ok(server)
    }

    /// Builds the IMAP connection settings.
    ///
    /// # Errors
    ///
    /// See [`Config::server`].
    pub fn imap_config(&self) -> Result<kng_imap::Config> {
        let server = self.server()?;
        Ok(kng_imap::Config::new(server.host)
            .port(server.port)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .io_timeout(Duration::from_secs(self.io_timeout_secs)))
    }
}
