//! Restarting rspamd so it picks up new keys and config.

use crate::config::Layout;
use crate::output::Reporter;
use crate::{debug, success, warn};
use std::process::Stdio;

pub struct ServiceReloader<'a> {
    command: &'a [String],
    out: &'a Reporter,
}

impl<'a> ServiceReloader<'a> {
    pub fn new(layout: &'a Layout, out: &'a Reporter) -> Self {
        Self {
            command: &layout.restart_command,
            out,
        }
    }

    /// Restart the service. Failure is reported as a warning and returned as
    /// `false`; it never fails the run.
    pub async fn reload(&self) -> bool {
        let Some((program, args)) = self.command.split_first() else {
            warn!(self.out, "No restart command configured, rspamd was not restarted");
            return false;
        };

        debug!(self.out, "Running {}", self.command.join(" "));
        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                success!(self.out, "Restarted rspamd");
                true
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(self.out, "Restarting rspamd failed ({}): {}", output.status, stderr.trim());
                false
            }
            Err(e) => {
                warn!(self.out, "Could not run '{program}' to restart rspamd: {e}");
                false
            }
        }
    }
}
