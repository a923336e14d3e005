//! The unix identity rspamd runs as.
//!
//! Key files and config copies are handed over to this user, and the key
//! generator and permission audit run under it so rspamd sees exactly what
//! they see.

use crate::error::{ProvisionError, Result};
use nix::unistd::{Gid, Uid, User};
use std::ffi::OsStr;
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub name: String,
    pub uid: Uid,
    pub gid: Gid,
}

impl ServiceIdentity {
    /// Look a user up in the passwd database.
    pub fn resolve(name: &str) -> Result<Self> {
        let user = User::from_name(name)
            .map_err(|e| ProvisionError::Identity(format!("failed to look up user '{name}': {e}")))?
            .ok_or_else(|| {
                ProvisionError::Identity(format!(
                    "user '{name}' does not exist (is rspamd installed?)"
                ))
            })?;

        Ok(Self {
            name: user.name,
            uid: user.uid,
            gid: user.gid,
        })
    }

    /// Resolve the configured user, if any.
    pub fn from_layout(service_user: Option<&str>) -> Result<Option<Self>> {
        service_user.map(Self::resolve).transpose()
    }

    /// Make `command` run as this identity.
    pub fn apply(&self, command: &mut Command) {
        command.uid(self.uid.as_raw()).gid(self.gid.as_raw());
    }

    /// Give `path` to this identity.
    pub fn chown(&self, path: &Path) -> Result<()> {
        nix::unistd::chown(path, Some(self.uid), Some(self.gid)).map_err(|e| {
            ProvisionError::Identity(format!(
                "failed to change owner of {} to {}: {e}",
                path.display(),
                self.name
            ))
        })
    }
}

/// Build a command that runs as `identity`, or as the invoking user when `None`.
pub fn command_as(program: impl AsRef<OsStr>, identity: Option<&ServiceIdentity>) -> Command {
    let mut command = Command::new(program);
    if let Some(identity) = identity {
        identity.apply(&mut command);
    }
    command
}
