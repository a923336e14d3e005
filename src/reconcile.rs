//! The `dkim_signing.conf` fragment.
//!
//! The fragment is written exactly once. After that it belongs to the
//! administrator and is never touched again, not even with `--force`.

use crate::config::{KeySpec, Layout};
use crate::error::Result;
use crate::identity::ServiceIdentity;
use crate::output::Reporter;
use crate::store::KeyArtifactSet;
use crate::{debug, info, success};
use std::path::Path;

/// What to do with the override file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// A file is already there; leave it as it is.
    Preserve,
    /// No file yet; write these bytes.
    Create(Vec<u8>),
}

/// Decide what to do given the current override file contents, if any.
#[must_use]
pub fn plan(spec: &KeySpec, artifacts: &KeyArtifactSet, existing: Option<&[u8]>) -> ConfigAction {
    match existing {
        Some(_) => ConfigAction::Preserve,
        None => ConfigAction::Create(render(spec, &artifacts.private_key).into_bytes()),
    }
}

/// Render the signing config for a single domain.
#[must_use]
pub fn render(spec: &KeySpec, private_key: &Path) -> String {
    let path = private_key.display();
    let selector = &spec.selector;
    let domain = &spec.domain;

    format!(
        r#"# documentation: https://rspamd.com/doc/modules/dkim_signing.html

enabled = true;

sign_authenticated = true;
sign_local = true;
try_fallback = false;

use_domain = "header";
use_redis = false; # don't change unless Redis also provides the DKIM keys
use_esld = true;
check_pubkey = true; # you want to use this in the beginning

selector = "{selector}";
path = "{path}";

domain {{
    {domain} {{
        path = "{path}";
        selector = "{selector}";
    }}
}}
"#
    )
}

pub struct ConfigReconciler<'a> {
    layout: &'a Layout,
    identity: Option<&'a ServiceIdentity>,
    out: &'a Reporter,
}

impl<'a> ConfigReconciler<'a> {
    pub fn new(
        layout: &'a Layout,
        identity: Option<&'a ServiceIdentity>,
        out: &'a Reporter,
    ) -> Self {
        Self {
            layout,
            identity,
            out,
        }
    }

    /// Create the signing config unless one exists. Returns whether it wrote.
    ///
    /// A fresh file is copied straight into rspamd's live config directory
    /// too, since it cannot be there yet and waiting for a change watcher
    /// would leave the new key unused.
    pub async fn reconcile(&self, spec: &KeySpec, artifacts: &KeyArtifactSet) -> Result<bool> {
        let override_path = self.layout.override_config_path();
        let existing = match tokio::fs::read(&override_path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let bytes = match plan(spec, artifacts, existing.as_deref()) {
            ConfigAction::Preserve => {
                info!(
                    self.out,
                    "{} already exists, adjust it manually to use the new key",
                    override_path.display()
                );
                return Ok(false);
            }
            ConfigAction::Create(bytes) => bytes,
        };

        tokio::fs::create_dir_all(&self.layout.override_dir).await?;
        tokio::fs::write(&override_path, &bytes).await?;

        let live_path = self.layout.live_config_path();
        tokio::fs::create_dir_all(&self.layout.live_config_dir).await?;
        tokio::fs::copy(&override_path, &live_path).await?;

        if let Some(identity) = self.identity {
            identity.chown(&override_path)?;
            identity.chown(&live_path)?;
        }

        debug!(self.out, "Copied signing config to {}", live_path.display());
        success!(self.out, "Created {}", override_path.display());
        Ok(true)
    }
}
