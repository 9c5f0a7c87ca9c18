/// Engage CLI -- operate the engagement automation platform from a shell:
/// crawl, analyze, and auto-post without the HTTP API.
mod bootstrap;
mod commands;

use clap::Parser;
use engage_core::config::Config;
use tracing_subscriber::EnvFilter;

/// Engagement automation platform CLI.
#[derive(Parser)]
#[command(name = "engage")]
#[command(version)]
#[command(about = "Crawl, analyze, and auto-post for the engagement automation platform")]
#[command(after_help = "\
Quick start:
  1. engage init     -- interactive setup wizard
  2. engage test     -- validate configuration and connectivity
  3. engage run       -- start crawling and auto-posting")]
struct Cli {
    /// Path to config.toml
    #[arg(short = 'c', long, global = true, default_value = "~/.engage/config.toml")]
    config: String,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Set up configuration (interactive wizard)
    Init(commands::init::InitArgs),
    /// Start crawling, analysis, and auto-posting until stopped
    Run(commands::run::RunArgs),
    /// Run one crawl + analysis + auto-post pass, then exit
    Tick(commands::tick::TickArgs),
    /// Validate configuration and connectivity
    Test(commands::test::TestArgs),
    /// Show crawl, pipeline, and posting activity
    Stats(commands::stats::StatsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("engage=debug,engage_core=debug,info")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("engage=info,engage_core=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .compact()
        .init();

    // `init` manages its own config lifecycle (it's what creates the file).
    if let Commands::Init(args) = cli.command {
        return commands::init::execute(args, &cli.config).await;
    }

    let config = Config::load(Some(&cli.config)).map_err(|e| {
        anyhow::anyhow!(
            "failed to load configuration: {e}\n\
             Hint: run 'engage init' to create a default configuration file."
        )
    })?;

    match cli.command {
        Commands::Init(_) => unreachable!(),
        Commands::Run(args) => commands::run::execute(&config, args).await,
        Commands::Tick(args) => commands::tick::execute(&config, args).await,
        Commands::Test(args) => commands::test::execute(&config, args).await,
        Commands::Stats(args) => commands::stats::execute(&config, args).await,
    }
}
