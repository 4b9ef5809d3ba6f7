use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use customer_export::config::{load_config, Config};
use customer_export::models::SummaryReport;
use customer_export::pipeline::Pipeline;
use customer_export::utils::{is_terminal, render_summary_table, MissingIdPolicy};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Customer Export - Fetch, clean and export customer records from a paginated API
#[derive(Parser, Debug)]
#[command(name = "customer-export")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch, clean and export customer records from a paginated API", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log line format
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show supported environment variables and exit
    #[arg(long, global = true)]
    env: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags that take precedence over the config file and environment
#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token for the API
    #[arg(long, global = true, env = "CUSTOMER_EXPORT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Resource path listed under the base URL
    #[arg(long, global = true)]
    resource: Option<String>,

    /// Output file
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    /// Attempts per request
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Backoff table in seconds, comma separated (e.g. 1,2,4)
    #[arg(long, global = true, value_delimiter = ',')]
    backoff: Option<Vec<u64>>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// What to do with records that have no id
    #[arg(long, value_enum, global = true)]
    missing_id: Option<MissingIdArg>,

    /// Seed for enrichment values
    #[arg(long, global = true)]
    seed: Option<u64>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        if let Some(base_url) = self.base_url {
            config.api.base_url = base_url;
        }
        if self.api_key.is_some() {
            config.api.api_key = self.api_key;
        }
        if let Some(resource) = self.resource {
            config.api.resource = resource;
        }
        if let Some(output) = self.output {
            config.output.path = output;
        }
        if let Some(max_retries) = self.max_retries {
            config.retry.max_retries = max_retries;
        }
        if let Some(backoff) = self.backoff {
            config.retry.backoff_secs = backoff;
        }
        if let Some(timeout) = self.timeout {
            config.api.request_timeout_secs = timeout;
        }
        if let Some(missing_id) = self.missing_id {
            config.processing.missing_id = missing_id.into();
        }
        if self.seed.is_some() {
            config.processing.seed = self.seed;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch, process and export customers (default)
    Run {
        /// Summary format
        #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
        format: OutputFormat,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Output format for the summary
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table if stdout is a terminal, JSON otherwise
    Auto,
    Table,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum MissingIdArg {
    /// Skip the record
    Drop,
    /// Keep it as its own entry
    Keep,
}

impl From<MissingIdArg> for MissingIdPolicy {
    fn from(arg: MissingIdArg) -> Self {
        match arg {
            MissingIdArg::Drop => MissingIdPolicy::Drop,
            MissingIdArg::Keep => MissingIdPolicy::Keep,
        }
    }
}

fn print_env_vars() {
    println!("Environment Variables:");
    println!();
    println!("  CUSTOMER_EXPORT_API_KEY                      Bearer token for the API");
    println!("  CUSTOMER_EXPORT__API__BASE_URL               API base URL (default: https://reqres.in/api)");
    println!("  CUSTOMER_EXPORT__API__RESOURCE               Resource path (default: users)");
    println!("  CUSTOMER_EXPORT__API__REQUEST_TIMEOUT_SECS   Per-request timeout (default: 10)");
    println!("  CUSTOMER_EXPORT__RETRY__MAX_RETRIES          Attempts per request (default: 3)");
    println!("  CUSTOMER_EXPORT__RETRY__BACKOFF_SECS         Backoff table, comma separated (default: 1,2,4)");
    println!("  CUSTOMER_EXPORT__OUTPUT__PATH                Output file (default: sample_output.json)");
    println!("  CUSTOMER_EXPORT__PROCESSING__MISSING_ID      drop or keep (default: drop)");
    println!("  CUSTOMER_EXPORT__PROCESSING__SEED            Seed for enrichment values");
    println!("  RUST_LOG                                     Log filter (default: customer_export=info)");
}

fn init_tracing(verbose: u8, quiet: bool, format: LogFormat) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("customer_export={}", level)));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn print_summary(report: &SummaryReport, format: OutputFormat) -> Result<()> {
    let as_table = match format {
        OutputFormat::Auto => is_terminal(),
        OutputFormat::Table => true,
        OutputFormat::Json => false,
    };

    if as_table {
        println!("{}", render_summary_table(report));
    } else {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
        return;
    }

    init_tracing(cli.verbose, cli.quiet, cli.log_format);

    if let Err(e) = run(cli).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref()).context("loading configuration")?;
    cli.overrides.apply(&mut config);
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run {
        format: OutputFormat::Auto,
    }) {
        Commands::Run { format } => {
            let pipeline = Pipeline::from_config(&config)?;
            let report = pipeline.run().await?;
            print_summary(&report, format)?;
        }
        Commands::Config => {
            print!("{}", config.to_toml_redacted()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_take_precedence() {
        let cli = Cli::try_parse_from([
            "customer-export",
            "--base-url",
            "http://localhost:9000",
            "--backoff",
            "0,1",
            "--missing-id",
            "keep",
            "run",
            "--format",
            "json",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.overrides.apply(&mut config);
        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert_eq!(config.retry.backoff_secs, vec![0, 1]);
        assert_eq!(config.processing.missing_id, MissingIdPolicy::Keep);
        assert!(matches!(
            cli.command,
            Some(Commands::Run {
                format: OutputFormat::Json
            })
        ));
    }
}
