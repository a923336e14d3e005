//! On-disk key material: path derivation, existence checks and force-overwrite.

use crate::config::{KeySpec, KeyType, Layout};
use crate::error::{ProvisionError, Result};
use crate::identity::ServiceIdentity;
use crate::output::Reporter;
use crate::{debug, warn};
use std::path::{Path, PathBuf};

/// The three files belonging to one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyArtifactSet {
    pub key_dir: PathBuf,
    pub public_key: PathBuf,
    pub public_key_dns: PathBuf,
    pub private_key: PathBuf,
}

impl KeyArtifactSet {
    /// Derive artifact paths from the key parameters. Pure.
    ///
    /// Names follow `<type>[-<size>]-<selector>-<domain>`, the size only
    /// present for RSA keys.
    #[must_use]
    pub fn derive(spec: &KeySpec, key_dir: &Path) -> Self {
        let stem = match spec.key_type {
            KeyType::Rsa => format!(
                "{}-{}-{}-{}",
                spec.key_type, spec.key_size, spec.selector, spec.domain
            ),
            KeyType::Ed25519 => format!("{}-{}-{}", spec.key_type, spec.selector, spec.domain),
        };

        Self {
            key_dir: key_dir.to_path_buf(),
            public_key: key_dir.join(format!("{stem}.public.txt")),
            public_key_dns: key_dir.join(format!("{stem}.public.dns.txt")),
            private_key: key_dir.join(format!("{stem}.private.txt")),
        }
    }

    #[must_use]
    pub fn paths(&self) -> [&Path; 3] {
        [&self.public_key, &self.public_key_dns, &self.private_key]
    }

    /// Artifacts currently present on disk.
    pub async fn existing(&self) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for path in self.paths() {
            if tokio::fs::try_exists(path).await? {
                found.push(path.to_path_buf());
            }
        }
        Ok(found)
    }
}

/// Manages the artifact set of a single key.
pub struct KeyMaterialStore<'a> {
    spec: &'a KeySpec,
    layout: &'a Layout,
    identity: Option<&'a ServiceIdentity>,
    out: &'a Reporter,
}

impl<'a> KeyMaterialStore<'a> {
    pub fn new(
        spec: &'a KeySpec,
        layout: &'a Layout,
        identity: Option<&'a ServiceIdentity>,
        out: &'a Reporter,
    ) -> Self {
        Self {
            spec,
            layout,
            identity,
            out,
        }
    }

    #[must_use]
    pub fn artifacts(&self) -> KeyArtifactSet {
        KeyArtifactSet::derive(self.spec, &self.layout.key_dir)
    }

    /// Clear the way for a fresh key.
    ///
    /// Existing artifacts abort the run unless force-overwrite is set, in
    /// which case exactly those files are removed. Removal and the later
    /// regeneration are not atomic.
    pub async fn check_and_prepare(&self) -> Result<KeyArtifactSet> {
        let artifacts = self.artifacts();
        let existing = artifacts.existing().await?;

        if !existing.is_empty() {
            if !self.spec.force_overwrite {
                return Err(ProvisionError::ArtifactExists { paths: existing });
            }

            warn!(self.out, "Overwriting existing DKIM key files (--force)");
            for path in &existing {
                remove_artifact(path).await?;
                debug!(self.out, "Removed {}", path.display());
            }
        }

        tokio::fs::create_dir_all(&self.layout.key_dir).await?;
        tokio::fs::create_dir_all(&self.layout.override_dir).await?;

        if let Some(identity) = self.identity {
            identity.chown(&self.layout.key_dir)?;
        }

        Ok(artifacts)
    }
}

/// Remove one artifact. A file that vanished in the meantime is fine.
async fn remove_artifact(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
