//! DKIM key provisioning for rspamd
//!
//! Creates a signing key with `rspamadm dkim_keygen`, writes the
//! `dkim_signing.conf` fragment once, derives the DNS TXT record to publish and
//! restarts rspamd.
//!
//! # Error Handling Strategy
//!
//! Fatal problems (bad parameters, keys already present without `--force`, a
//! failed generator run) are returned as [`ProvisionError`]. Everything else
//! (permission audit, restarts, the persistence mount check) is reported as a
//! warning and collected in the [`ProvisionReport`]; the run still succeeds.

pub mod audit;
pub mod config;
pub mod dns;
pub mod error;
pub mod identity;
pub mod keygen;
pub mod output;
pub mod reconcile;
pub mod reload;
pub mod store;
pub mod workflow;

// Re-export common types
pub use config::{KeySpec, KeyType, Layout, ProvisionConfig, Verbosity};
pub use error::{ProvisionError, Result};
pub use store::KeyArtifactSet;
pub use workflow::{ProvisionReport, Provisioner};
