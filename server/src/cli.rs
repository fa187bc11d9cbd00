//! # CLI Interface
//!
//! `clap` derive definitions for `chainsight-server`: `run`, `import` and
//! `version`. Every `run` flag can also be set through a `CHAINSIGHT_*`
//! environment variable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chainsight block explorer API server.
///
/// Serves paginated transaction listings over a local chain index and
/// passes raw transaction calls through to an upstream node.
#[derive(Parser, Debug)]
#[command(
    name = "chainsight-server",
    about = "Chainsight block explorer API server",
    version,
    propagate_version = true
)]
pub struct ChainsightCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server.
    Run(RunArgs),
    /// Load a JSON block dump into the chain index.
    Import(ImportArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Optional TOML file with `[listing]` and `[rpc]` sections. Flags
    /// below override values from the file.
    #[arg(long, short = 'c', env = "CHAINSIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the chain index.
    #[arg(
        long,
        short = 'd',
        env = "CHAINSIGHT_DATA_DIR",
        default_value = "./chainsight-data"
    )]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[arg(long, env = "CHAINSIGHT_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "CHAINSIGHT_METRICS_PORT", default_value_t = 3001)]
    pub metrics_port: u16,

    /// Upstream node JSON-RPC endpoint.
    #[arg(long, env = "CHAINSIGHT_RPC_URL")]
    pub rpc_url: Option<String>,

    #[arg(long, env = "CHAINSIGHT_RPC_USER")]
    pub rpc_user: Option<String>,

    #[arg(long, env = "CHAINSIGHT_RPC_PASSWORD", hide_env_values = true)]
    pub rpc_password: Option<String>,

    /// Concurrent index/store calls per listing fan-out.
    #[arg(long, env = "CHAINSIGHT_FANOUT_CONCURRENCY")]
    pub fanout_concurrency: Option<usize>,

    /// Widest block-height range a single request may ask for.
    #[arg(long, env = "CHAINSIGHT_MAX_RANGE_WIDTH")]
    pub max_range_width: Option<u64>,

    /// Per-request timeout, in seconds.
    #[arg(long, env = "CHAINSIGHT_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "CHAINSIGHT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `import` subcommand.
#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// JSON file containing an array of blocks.
    pub file: PathBuf,

    /// Directory holding the chain index. Created if missing.
    #[arg(
        long,
        short = 'd',
        env = "CHAINSIGHT_DATA_DIR",
        default_value = "./chainsight-data"
    )]
    pub data_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        ChainsightCli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = ChainsightCli::parse_from([
            "chainsight-server",
            "run",
            "--port",
            "8080",
            "--fanout-concurrency",
            "4",
            "--rpc-url",
            "http://node:8332",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.port, 8080);
        assert_eq!(args.fanout_concurrency, Some(4));
        assert_eq!(args.rpc_url.as_deref(), Some("http://node:8332"));
        assert_eq!(args.max_range_width, None);
    }

    #[test]
    fn import_takes_a_file() {
        let cli = ChainsightCli::parse_from(["chainsight-server", "import", "blocks.json"]);
        assert!(matches!(cli.command, Commands::Import(a) if a.file == PathBuf::from("blocks.json")));
    }
}
