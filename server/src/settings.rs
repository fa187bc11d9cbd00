//! Server settings: optional TOML file plus CLI overrides.
//!
//! ```toml
//! [listing]
//! fanout_concurrency = 16
//! max_range_width = 50
//!
//! [rpc]
//! url = "http://127.0.0.1:8332"
//! user = "explorer"
//! password = "secret"
//! timeout_secs = 10
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use chainsight_explorer::config::{ListingConfig, RpcConfig};

use crate::cli::RunArgs;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listing: ListingConfig,
    pub rpc: RpcConfig,
}

impl Settings {
    /// Parses settings from TOML text. Missing sections and keys take
    /// their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid settings file")
    }

    /// Reads `path`, or returns defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Applies CLI flags on top of file values.
    pub fn apply_overrides(&mut self, args: &RunArgs) {
        if let Some(n) = args.fanout_concurrency {
            self.listing.fanout_concurrency = n;
        }
        if let Some(w) = args.max_range_width {
            self.listing.max_range_width = w;
        }
        if let Some(url) = &args.rpc_url {
            self.rpc.url = url.clone();
        }
        if args.rpc_user.is_some() {
            self.rpc.user = args.rpc_user.clone();
        }
        if args.rpc_password.is_some() {
            self.rpc.password = args.rpc_password.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.listing.validate().context("invalid [listing] settings")?;
        self.rpc.validate().context("invalid [rpc] settings")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ChainsightCli, Commands};
    use clap::Parser;
    use std::io::Write;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["chainsight-server", "run"];
        argv.extend_from_slice(extra);
        match ChainsightCli::parse_from(argv).command {
            Commands::Run(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let s = Settings::from_toml("[listing]\nmax_range_width = 20\n").unwrap();
        assert_eq!(s.listing.max_range_width, 20);
        assert_eq!(s.listing.fanout_concurrency, ListingConfig::default().fanout_concurrency);
        assert_eq!(s.rpc, RpcConfig::default());
    }

    #[test]
    fn file_is_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rpc]\nurl = \"http://node:18332\"\ntimeout_secs = 5").unwrap();
        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.rpc.url, "http://node:18332");
        assert_eq!(s.rpc.timeout_secs, 5);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/chainsight.toml"))).is_err());
    }

    #[test]
    fn cli_flags_override_file_values() {
        let mut s = Settings::from_toml("[listing]\nfanout_concurrency = 2\n").unwrap();
        s.apply_overrides(&run_args(&["--fanout-concurrency", "12", "--rpc-user", "ops"]));
        assert_eq!(s.listing.fanout_concurrency, 12);
        assert_eq!(s.rpc.user.as_deref(), Some("ops"));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn out_of_bounds_values_fail_validation() {
        let s = Settings::from_toml("[listing]\nfanout_concurrency = 0\n").unwrap();
        assert!(s.validate().is_err());
    }
}
