//! Run configuration.
//!
//! Credentials come from the environment (`EXP_VCENTER_*`), everything else
//! from CLI flags. Validation happens up front; nothing talks to vCenter
//! until the configuration is known good.

use std::path::PathBuf;

use clap::Parser;

use crate::error::{Error, Result};

/// Export VM data from vCenter to CSV files in RVTools format.
#[derive(Debug, Parser)]
#[command(name = "vcexport", version, about)]
pub struct Cli {
    /// vCenter FQDN (do not include https://).
    #[arg(long, env = "EXP_VCENTER_HOST")]
    pub vcenter_host: Option<String>,

    /// vCenter username.
    #[arg(long, env = "EXP_VCENTER_USER")]
    pub vcenter_user: Option<String>,

    /// vCenter password.
    #[arg(long, env = "EXP_VCENTER_PASSWORD", hide_env_values = true)]
    pub vcenter_password: Option<String>,

    /// Accept invalid TLS certificates (lab vCenters with self-signed certs).
    #[arg(long, env = "EXP_DISABLE_SSL_VERIFICATION", default_value_t = false)]
    pub disable_ssl_verification: bool,

    /// Performance collection time window in minutes. The sampling period
    /// and sample count are derived automatically.
    #[arg(long = "perf-interval", default_value_t = 60)]
    pub perf_interval_minutes: u32,

    /// Skip performance statistics collection entirely.
    #[arg(long = "no-statistics", action = clap::ArgAction::SetTrue)]
    pub no_statistics: bool,

    /// Maximum number of VMs to process (for testing).
    #[arg(long)]
    pub max_count: Option<usize>,

    /// Path to the VM skip list file.
    #[arg(long, default_value = "vm-skip-list.txt")]
    pub skip_list: PathBuf,

    /// Directory CSV files are written into.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

/// Validated configuration for one export run.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub vcenter_host: String,
    pub vcenter_user: String,
    pub vcenter_password: String,
    pub disable_ssl_verification: bool,
    pub perf_interval_minutes: u32,
    pub collect_statistics: bool,
    pub max_count: Option<usize>,
    pub skip_list_path: PathBuf,
    pub output_dir: PathBuf,
}

impl ExportConfig {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let vcenter_host = require(cli.vcenter_host, "EXP_VCENTER_HOST")?;
        let vcenter_user = require(cli.vcenter_user, "EXP_VCENTER_USER")?;
        let vcenter_password = require(cli.vcenter_password, "EXP_VCENTER_PASSWORD")?;

        if cli.perf_interval_minutes == 0 {
            return Err(Error::Config(
                "--perf-interval must be a positive number of minutes".to_string(),
            ));
        }

        Ok(Self {
            vcenter_host,
            vcenter_user,
            vcenter_password,
            disable_ssl_verification: cli.disable_ssl_verification,
            perf_interval_minutes: cli.perf_interval_minutes,
            collect_statistics: !cli.no_statistics,
            max_count: cli.max_count,
            skip_list_path: cli.skip_list,
            output_dir: cli.output_dir,
        })
    }
}

fn require(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_credentials() -> Cli {
        Cli {
            vcenter_host: Some("vcenter.example.com".to_string()),
            vcenter_user: Some("reader".to_string()),
            vcenter_password: Some("secret".to_string()),
            disable_ssl_verification: false,
            perf_interval_minutes: 60,
            no_statistics: false,
            max_count: None,
            skip_list: PathBuf::from("vm-skip-list.txt"),
            output_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn valid_cli_produces_config() {
        let config = ExportConfig::from_cli(cli_with_credentials()).unwrap();
        assert_eq!(config.vcenter_host, "vcenter.example.com");
        assert!(config.collect_statistics);
    }

    #[test]
    fn missing_host_is_a_config_error() {
        let mut cli = cli_with_credentials();
        cli.vcenter_host = None;
        assert!(matches!(
            ExportConfig::from_cli(cli),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn zero_window_is_rejected_before_collection() {
        let mut cli = cli_with_credentials();
        cli.perf_interval_minutes = 0;
        assert!(matches!(
            ExportConfig::from_cli(cli),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn no_statistics_flag_disables_collection() {
        let mut cli = cli_with_credentials();
        cli.no_statistics = true;
        let config = ExportConfig::from_cli(cli).unwrap();
        assert!(!config.collect_statistics);
    }
}
