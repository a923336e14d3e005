//! The provisioning run, start to finish.

use crate::audit;
use crate::config::ProvisionConfig;
use crate::dns;
use crate::error::Result;
use crate::identity::ServiceIdentity;
use crate::keygen::KeyGenerator;
use crate::output::Reporter;
use crate::reconcile::ConfigReconciler;
use crate::reload::ServiceReloader;
use crate::store::{KeyArtifactSet, KeyMaterialStore};
use crate::{debug, info, success, warn};

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub artifacts: KeyArtifactSet,
    pub record_name: String,
    pub record: String,
    pub config_written: bool,
    /// Advisory problems that did not stop the run
    pub warnings: Vec<String>,
}

pub struct Provisioner<'a> {
    config: &'a ProvisionConfig,
    out: Reporter,
}

impl<'a> Provisioner<'a> {
    #[must_use]
    pub fn new(config: &'a ProvisionConfig) -> Self {
        Self {
            config,
            out: Reporter::new(config.verbosity),
        }
    }

    /// Validate, generate, audit, configure, publish, restart.
    ///
    /// Validation and existing-key errors leave the filesystem untouched.
    /// Generation errors may leave stale keys already removed. Everything past
    /// generation only produces warnings.
    pub async fn run(&self) -> Result<ProvisionReport> {
        let spec = &self.config.spec;
        let layout = &self.config.layout;
        let out = &self.out;

        spec.validate()?;
        let identity = ServiceIdentity::from_layout(layout.service_user.as_deref())?;
        let identity = identity.as_ref();

        let mut warnings = Vec::new();
        warnings.extend(audit::check_persistence_mount(&layout.persistence_root, out).await);

        info!(
            out,
            "Creating DKIM keys of type {} for domain {} with selector '{}'",
            spec.key_type,
            spec.domain,
            spec.selector
        );

        let artifacts = KeyMaterialStore::new(spec, layout, identity, out)
            .check_and_prepare()
            .await?;

        KeyGenerator::new(layout, identity, out)
            .generate(spec, &artifacts)
            .await?;

        warnings.extend(audit::audit(&artifacts, identity, out).await);

        let reloader = ServiceReloader::new(layout, out);
        let config_written = ConfigReconciler::new(layout, identity, out)
            .reconcile(spec, &artifacts)
            .await?;
        if config_written && !reloader.reload().await {
            warnings.push("restarting rspamd after writing the signing config failed".to_string());
        }

        let record = dns::write_record(&artifacts.public_key, &artifacts.public_key_dns).await?;
        if let Some(identity) = identity {
            identity.chown(&artifacts.public_key_dns)?;
        }
        dns::print_record(spec, &record, out);

        if !reloader.reload().await {
            warnings.push("final restart of rspamd failed".to_string());
        }

        if warnings.is_empty() {
            success!(out, "DKIM setup finished");
        } else {
            warn!(out, "DKIM setup finished with {} warning(s)", warnings.len());
        }
        debug!(out, "Key files are in {}", artifacts.key_dir.display());

        Ok(ProvisionReport {
            record_name: spec.dns_record_name(),
            artifacts,
            record,
            config_written,
            warnings,
        })
    }
}
