use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use rspamd_dkim::config::{DEFAULT_KEY_SIZE, DEFAULT_SELECTOR, host_base_domain};
use rspamd_dkim::output::Reporter;
use rspamd_dkim::{KeySpec, KeyType, Layout, ProvisionConfig, Provisioner, Verbosity};

// ============================================================================
// ERROR HANDLING STRATEGY
// ============================================================================
//
// Fatal errors (invalid parameters, keys already present, generator failure)
// are printed in red and end the process with exit status 1.
//
// Advisory problems (permission audit, rspamd restarts, missing persistence
// mount) are printed as warnings by the library and never change the exit
// status.
// ============================================================================

#[derive(Parser)]
#[command(name = "rspamd-dkim")]
#[command(version, about = "Create DKIM keys for rspamd and print the DNS record to publish")]
struct Cli {
    /// Key type
    #[arg(long = "keytype", value_enum, default_value_t = KeyType::Rsa)]
    key_type: KeyType,

    /// RSA key size in bits (ed25519 keys have a fixed size)
    #[arg(long = "keysize", default_value_t = DEFAULT_KEY_SIZE)]
    key_size: u32,

    /// DKIM selector
    #[arg(long, default_value = DEFAULT_SELECTOR)]
    selector: String,

    /// Domain to sign for (defaults to the domain part of this host's name)
    #[arg(long)]
    domain: Option<String>,

    /// Overwrite existing key files
    #[arg(long, short = 'f')]
    force: bool,

    /// Output verbosity
    #[arg(long, value_enum, default_value_t = Verbosity::Info)]
    log_level: Verbosity,

    /// Path to a layout file (TOML) overriding directories and commands
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let out = Reporter::new(cli.log_level);

    let config = match build_config(cli).await {
        Ok(config) => config,
        Err(e) => {
            rspamd_dkim::error!(out, "{e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = Provisioner::new(&config).run().await {
        rspamd_dkim::error!(out, "{e}");
        std::process::exit(1);
    }

    Ok(())
}

async fn build_config(cli: Cli) -> Result<ProvisionConfig> {
    let layout = match &cli.config {
        Some(path) => Layout::load(path)
            .await
            .with_context(|| format!("Failed to load layout from {}", path.display()))?,
        None => Layout::default(),
    };

    let domain = match cli.domain {
        Some(domain) => domain,
        None => host_base_domain()
            .context("Could not determine this host's domain, pass --domain explicitly")?,
    };

    Ok(ProvisionConfig {
        spec: KeySpec {
            key_type: cli.key_type,
            key_size: cli.key_size,
            selector: cli.selector,
            domain,
            force_overwrite: cli.force,
        },
        layout,
        verbosity: cli.log_level,
    })
}
