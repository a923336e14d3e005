//! Configuration structures for DKIM key provisioning.
//!
//! Everything the workflow needs is gathered into a [`ProvisionConfig`] once at
//! startup and handed to each component by reference.

use crate::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default RSA key size. Also the "unset" sentinel for ed25519 keys.
pub const DEFAULT_KEY_SIZE: u32 = 2048;

/// Key sizes accepted for RSA keys
pub const RSA_KEY_SIZES: &[u32] = &[512, 1024, 2048, 4096];

/// Default DKIM selector
pub const DEFAULT_SELECTOR: &str = "mail";

/// File name of the signing config fragment in both config directories
pub const SIGNING_CONFIG_FILE: &str = "dkim_signing.conf";

const DEFAULT_PERSISTENCE_ROOT: &str = "/tmp/docker-mailserver";
const DEFAULT_KEY_DIR: &str = "/tmp/docker-mailserver/rspamd/dkim";
const DEFAULT_OVERRIDE_DIR: &str = "/tmp/docker-mailserver/rspamd/override.d";
const DEFAULT_LIVE_CONFIG_DIR: &str = "/etc/rspamd/override.d";
const DEFAULT_SERVICE_USER: &str = "_rspamd";
const DEFAULT_GENERATOR: &str = "rspamadm";
const DEFAULT_RESTART_COMMAND: &[&str] = &["supervisorctl", "restart", "rspamd"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Rsa,
    Ed25519,
}

impl KeyType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What key to create, and for whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    pub key_type: KeyType,
    pub key_size: u32,
    pub selector: String,
    pub domain: String,
    pub force_overwrite: bool,
}

impl KeySpec {
    /// Check the parameter combination before anything touches the filesystem.
    pub fn validate(&self) -> Result<()> {
        match self.key_type {
            KeyType::Ed25519 if self.key_size != DEFAULT_KEY_SIZE => {
                return Err(ProvisionError::Validation(format!(
                    "key size {} cannot be combined with key type ed25519 \
                     (ed25519 keys have a fixed size, omit --keysize)",
                    self.key_size
                )));
            }
            KeyType::Rsa if !RSA_KEY_SIZES.contains(&self.key_size) => {
                return Err(ProvisionError::Validation(format!(
                    "unsupported RSA key size {} (expected one of {:?})",
                    self.key_size, RSA_KEY_SIZES
                )));
            }
            _ => {}
        }

        validate_label("selector", &self.selector)?;
        validate_label("domain", &self.domain)
    }

    /// DNS name the public key has to be published under.
    #[must_use]
    pub fn dns_record_name(&self) -> String {
        format!("{}._domainkey.{}", self.selector, self.domain)
    }
}

fn validate_label(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ProvisionError::Validation(format!("{what} must not be empty")));
    }
    if value
        .chars()
        .any(|c| c == '/' || c == '\0' || c.is_whitespace())
    {
        return Err(ProvisionError::Validation(format!(
            "{what} '{value}' contains '/', whitespace or NUL"
        )));
    }
    Ok(())
}

/// How chatty the reporter is. Ordered from quietest to loudest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

/// Filesystem and service layout of the mail server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Directory holding the key files
    pub key_dir: PathBuf,

    /// Persisted, administrator-editable rspamd override directory
    pub override_dir: PathBuf,

    /// Directory rspamd loads its overrides from at runtime
    pub live_config_dir: PathBuf,

    /// Volume that must be mounted for keys to survive container recreation
    pub persistence_root: PathBuf,

    /// User rspamd runs as. `None` (an empty string in the file) runs
    /// everything as the invoking user.
    pub service_user: Option<String>,

    /// `rspamadm` binary (name on `PATH` or absolute path)
    pub generator: String,

    /// Program and arguments used to restart rspamd
    pub restart_command: Vec<String>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            key_dir: PathBuf::from(DEFAULT_KEY_DIR),
            override_dir: PathBuf::from(DEFAULT_OVERRIDE_DIR),
            live_config_dir: PathBuf::from(DEFAULT_LIVE_CONFIG_DIR),
            persistence_root: PathBuf::from(DEFAULT_PERSISTENCE_ROOT),
            service_user: Some(DEFAULT_SERVICE_USER.to_string()),
            generator: DEFAULT_GENERATOR.to_string(),
            restart_command: DEFAULT_RESTART_COMMAND
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl Layout {
    /// Load a layout from a TOML file; missing keys keep their defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml(&content).map_err(|message| ProvisionError::ConfigFile {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, String> {
        let mut layout: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        if layout.service_user.as_deref() == Some("") {
            layout.service_user = None;
        }
        if layout.restart_command.is_empty() {
            return Err("restart_command must name a program".to_string());
        }
        Ok(layout)
    }

    #[must_use]
    pub fn override_config_path(&self) -> PathBuf {
        self.override_dir.join(SIGNING_CONFIG_FILE)
    }

    #[must_use]
    pub fn live_config_path(&self) -> PathBuf {
        self.live_config_dir.join(SIGNING_CONFIG_FILE)
    }
}

/// Everything a provisioning run needs, built once in `main`.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub spec: KeySpec,
    pub layout: Layout,
    pub verbosity: Verbosity,
}

/// Base domain of this host: its FQDN without the first label.
///
/// Returns `None` when the hostname has no domain part.
#[must_use]
pub fn host_base_domain() -> Option<String> {
    let hostname = nix::unistd::gethostname().ok()?;
    base_domain(hostname.to_str()?)
}

fn base_domain(fqdn: &str) -> Option<String> {
    let (_, domain) = fqdn.trim().trim_end_matches('.').split_once('.')?;
    (!domain.is_empty()).then(|| domain.to_string())
}
