//! Key generation through `rspamadm dkim_keygen`.
//!
//! The generator's exit status alone is not a reliable success signal: when it
//! cannot write the private key it may still exit 0 and only complain on its
//! diagnostic channel. A run therefore only counts as successful when the exit
//! status is clean AND the captured log carries no permission-denied marker.

use crate::config::{KeySpec, KeyType, Layout};
use crate::error::{ProvisionError, Result};
use crate::identity::{ServiceIdentity, command_as};
use crate::output::{Level, Reporter};
use crate::store::KeyArtifactSet;
use crate::{debug, dns, error, success};
use std::process::{ExitStatus, Stdio};

/// Marker the generator writes when it cannot access a path
const PERMISSION_DENIED_MARKER: &str = "Permission denied";

/// `rspamadm` subcommand that creates DKIM keys
const KEYGEN_SUBCOMMAND: &str = "dkim_keygen";

/// How the generator process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    Code(i32),
    /// Killed by a signal, no exit code.
    Terminated,
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            _ if status.success() => Self::Success,
            Some(code) => Self::Code(code),
            None => Self::Terminated,
        }
    }
}

/// Exit outcome and diagnostic log of one generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub exit: ExitOutcome,
    pub log: String,
    pub permission_denied: bool,
}

impl GenerationOutcome {
    #[must_use]
    pub fn new(exit: ExitOutcome, log: String) -> Self {
        let permission_denied = log.contains(PERMISSION_DENIED_MARKER);
        Self {
            exit,
            log,
            permission_denied,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit == ExitOutcome::Success && !self.permission_denied
    }

    /// Turn the outcome into a result, keeping the log on failure.
    pub fn into_result(self) -> Result<Self> {
        let reason = match self.exit {
            ExitOutcome::Success if self.permission_denied => {
                "generator reported 'Permission denied' in its log".to_string()
            }
            ExitOutcome::Success => return Ok(self),
            ExitOutcome::Code(code) => format!("generator exited with status {code}"),
            ExitOutcome::Terminated => "generator was terminated by a signal".to_string(),
        };
        Err(ProvisionError::KeyGeneration {
            reason,
            log: self.log,
        })
    }
}

/// Arguments passed to `rspamadm` for `spec`, private key written to `artifacts`.
#[must_use]
pub fn keygen_args(spec: &KeySpec, artifacts: &KeyArtifactSet) -> Vec<String> {
    let mut args = vec![
        KEYGEN_SUBCOMMAND.to_string(),
        "-s".to_string(),
        spec.selector.clone(),
        "-d".to_string(),
        spec.domain.clone(),
    ];

    match spec.key_type {
        KeyType::Rsa => args.extend(["-b".to_string(), spec.key_size.to_string()]),
        KeyType::Ed25519 => args.extend(["-t".to_string(), KeyType::Ed25519.to_string()]),
    }

    args.push("-k".to_string());
    args.push(artifacts.private_key.to_string_lossy().to_string());
    args
}

pub struct KeyGenerator<'a> {
    layout: &'a Layout,
    identity: Option<&'a ServiceIdentity>,
    out: &'a Reporter,
}

impl<'a> KeyGenerator<'a> {
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

    /// Run the generator as the service identity.
    ///
    /// Its standard output becomes the public key file; its standard error is
    /// captured and scanned. A clean run that left no quoted key material in
    /// the public key file is a failure too. On failure the whole log is
    /// printed before the error is returned.
    pub async fn generate(
        &self,
        spec: &KeySpec,
        artifacts: &KeyArtifactSet,
    ) -> Result<GenerationOutcome> {
        let generator = which::which(&self.layout.generator).map_err(|e| {
            ProvisionError::MissingDependency(format!(
                "'{}' not found ({e}). Is rspamd installed?",
                self.layout.generator
            ))
        })?;

        let public_key = tokio::fs::File::create(&artifacts.public_key)
            .await?
            .into_std()
            .await;
        if let Some(identity) = self.identity {
            identity.chown(&artifacts.public_key)?;
        }

        let args = keygen_args(spec, artifacts);
        debug!(self.out, "Running {} {}", generator.display(), args.join(" "));

        let spawn_failed = |e: std::io::Error| ProvisionError::KeyGeneration {
            reason: format!("failed to execute {}: {e}", generator.display()),
            log: String::new(),
        };
        let child = command_as(&generator, self.identity)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(public_key))
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_failed)?;
        let output = child.wait_with_output().await.map_err(spawn_failed)?;

        let log = String::from_utf8_lossy(&output.stderr).into_owned();
        let result = match GenerationOutcome::new(output.status.into(), log).into_result() {
            Ok(outcome) => require_public_key(artifacts, outcome).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(outcome) => {
                success!(self.out, "Created DKIM key pair for {}", spec.domain);
                Ok(outcome)
            }
            Err(err) => {
                if let ProvisionError::KeyGeneration { reason, log } = &err {
                    error!(self.out, "Creating the DKIM keys failed: {reason}");
                    if log.trim().is_empty() {
                        error!(self.out, "The generator produced no log output");
                    } else {
                        error!(self.out, "Generator log:");
                        self.out.emit_block(Level::Error, log);
                    }
                }
                Err(err)
            }
        }
    }
}

/// A clean run must still have left a publishable key behind.
async fn require_public_key(
    artifacts: &KeyArtifactSet,
    outcome: GenerationOutcome,
) -> Result<GenerationOutcome> {
    let zone_text = tokio::fs::read_to_string(&artifacts.public_key).await?;
    if dns::format_record(&zone_text).trim().is_empty() {
        return Err(ProvisionError::KeyGeneration {
            reason: "generator produced no public key".to_string(),
            log: outcome.log,
        });
    }
    Ok(outcome)
}
