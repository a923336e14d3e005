//! Error types for DKIM key provisioning.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Rejected input, raised before anything on disk is touched.
    #[error("Invalid parameters: {0}")]
    Validation(String),

    #[error(
        "DKIM key files already exist: {}\nRe-run with --force to overwrite them",
        display_paths(.paths)
    )]
    ArtifactExists { paths: Vec<PathBuf> },

    /// `log` holds everything the generator wrote to its diagnostic channel.
    #[error("DKIM key generation failed: {reason}")]
    KeyGeneration { reason: String, log: String },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Service identity error: {0}")]
    Identity(String),

    #[error("Invalid configuration file {}: {message}", .path.display())]
    ConfigFile { path: PathBuf, message: String },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_exists_lists_every_path_and_the_force_hint() {
        let err = ProvisionError::ArtifactExists {
            paths: vec![PathBuf::from("/k/a.private.txt"), PathBuf::from("/k/a.public.txt")],
        };
        let msg = err.to_string();
        assert!(msg.contains("/k/a.private.txt, /k/a.public.txt"));
        assert!(msg.contains("--force"));
    }
}
