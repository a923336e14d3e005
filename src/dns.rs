//! DNS TXT record text derived from the generator's zone-file output.
//!
//! `rspamadm` prints the public key as a zone-file snippet with the value split
//! into several quoted strings:
//!
//! ```text
//! mail._domainkey IN TXT ( "v=DKIM1; k=rsa; "
//!     "p=MIIBIjANBgkqh..." ) ;
//! ```
//!
//! Most DNS provider UIs want the concatenated value on a single line.

use crate::config::KeySpec;
use crate::error::Result;
use crate::info;
use crate::output::{Level, Reporter};
use std::path::Path;

/// Concatenate every double-quoted segment of `zone_text` into one line,
/// followed by a single newline. An unterminated trailing quote is ignored.
#[must_use]
pub fn format_record(zone_text: &str) -> String {
    let closed_quotes = zone_text.matches('"').count() / 2 * 2;
    let mut record: String = zone_text
        .split('"')
        .take(closed_quotes)
        .skip(1)
        .step_by(2)
        .flat_map(|segment| segment.chars().filter(|c| *c != '\n' && *c != '\r'))
        .collect();
    record.push('\n');
    record
}

/// Derive the record from `public_key`, store it in `dns_path` and return it.
pub async fn write_record(public_key: &Path, dns_path: &Path) -> Result<String> {
    let zone_text = tokio::fs::read_to_string(public_key).await?;
    let record = format_record(&zone_text);
    tokio::fs::write(dns_path, &record).await?;
    Ok(record)
}

/// Show the administrator what to publish, unless informational output is off.
pub fn print_record(spec: &KeySpec, record: &str, out: &Reporter) {
    if !out.enabled(Level::Info) {
        return;
    }

    info!(out, "");
    info!(out, "Here is the content of the TXT DNS record {}:", spec.dns_record_name());
    info!(out, "");
    info!(out, "{}", record.trim_end_matches('\n'));
    info!(out, "");
}
