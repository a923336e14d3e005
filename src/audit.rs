//! Advisory checks. Nothing in here ever aborts a run.

use crate::identity::{ServiceIdentity, command_as};
use crate::output::Reporter;
use crate::store::KeyArtifactSet;
use crate::{debug, warn};
use std::path::Path;
use std::process::Stdio;

/// Mount table of the current process
const MOUNT_TABLE: &str = "/proc/self/mounts";

/// Check that the service identity can list the key directory and read the
/// private key. Returns the warnings that were emitted.
pub async fn audit(
    artifacts: &KeyArtifactSet,
    identity: Option<&ServiceIdentity>,
    out: &Reporter,
) -> Vec<String> {
    let who = identity.map_or("the current user", |i| i.name.as_str());
    let mut warnings = Vec::new();

    if !probe("ls", &artifacts.key_dir, identity).await {
        warnings.push(format!(
            "{who} cannot list the DKIM key directory {}",
            artifacts.key_dir.display()
        ));
    }

    if !probe("cat", &artifacts.private_key, identity).await {
        warnings.push(format!(
            "{who} cannot read the private key {}",
            artifacts.private_key.display()
        ));
    }

    if warnings.is_empty() {
        debug!(out, "Permission check passed for {who}");
    }
    for warning in &warnings {
        warn!(out, "{warning}");
    }
    warnings
}

/// Run `program path` as `identity`, discarding output.
async fn probe(program: &str, path: &Path, identity: Option<&ServiceIdentity>) -> bool {
    command_as(program, identity)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Warn when `root` is not a mount point: keys written below it would not
/// survive the container being recreated.
pub async fn check_persistence_mount(root: &Path, out: &Reporter) -> Option<String> {
    let mounted = match tokio::fs::read_to_string(MOUNT_TABLE).await {
        Ok(table) => is_mount_point(&table, root),
        Err(e) => {
            debug!(out, "Could not read {MOUNT_TABLE}: {e}");
            false
        }
    };

    if mounted {
        return None;
    }

    let warning = format!(
        "{} is not a mounted volume, generated keys and config will not persist",
        root.display()
    );
    warn!(out, "{warning}");
    Some(warning)
}

/// Whether `root` appears as a mount point in a `/proc/mounts` style table.
fn is_mount_point(table: &str, root: &Path) -> bool {
    let root = root.to_string_lossy();
    let root = root.trim_end_matches('/');
    table
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(unescape_mount_path)
        .any(|mount_point| mount_point.trim_end_matches('/') == root)
}

/// Undo the octal escaping the kernel applies to spaces, tabs and newlines.
fn unescape_mount_path(field: &str) -> String {
    field
        .replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}
