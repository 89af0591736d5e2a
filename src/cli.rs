use clap::{Parser, Subcommand, ValueEnum};
use console_query::MutationMethod;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "console-query")]
#[command(
    author,
    version,
    about = "Query, poll and mutate the console backend from the terminal"
)]
pub struct Cli {
    /// Path to the TOML configuration (default: ./console-query.toml when present)
    #[clap(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL; overrides the value from the configuration file
    #[clap(long, global = true)]
    pub base_url: Option<String>,

    /// Enable debug logging of attempts, retries and cancellations
    #[clap(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Per-request overrides of the configured defaults
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Deadline for each attempt in milliseconds
    #[clap(long)]
    pub timeout_ms: Option<u64>,

    /// Extra attempts for transient read failures
    #[clap(long)]
    pub retries: Option<u32>,

    /// Pause between attempts in milliseconds
    #[clap(long)]
    pub retry_delay_ms: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch one endpoint once and print the result
    Get {
        /// Endpoint path relative to the base URL, e.g. /api/projects
        endpoint: String,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Poll one endpoint and print every settled result
    Watch {
        endpoint: String,

        /// Polling period in milliseconds
        #[clap(long)]
        interval_ms: u64,

        /// Stop after this many results (default: run until Ctrl-C)
        #[clap(long)]
        count: Option<usize>,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Fetch every configured query in one parallel round
    Batch,

    /// Send one write request
    Send {
        #[clap(value_enum)]
        method: SendMethod,

        endpoint: String,

        /// JSON payload (default: no body)
        #[clap(long)]
        body: Option<String>,

        /// Deadline in milliseconds
        #[clap(long)]
        timeout_ms: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SendMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl From<SendMethod> for MutationMethod {
    fn from(method: SendMethod) -> Self {
        match method {
            SendMethod::Post => MutationMethod::Post,
            SendMethod::Put => MutationMethod::Put,
            SendMethod::Patch => MutationMethod::Patch,
            SendMethod::Delete => MutationMethod::Delete,
        }
    }
}
