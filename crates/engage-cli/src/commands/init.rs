//! `engage init` -- interactive setup wizard producing `config.toml`.

use clap::Args;
use console::style;
use dialoguer::{Confirm, Input};
use engage_core::config::Config;

/// Arguments for the `init` subcommand.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,

    /// Skip the interactive wizard and write built-in defaults
    #[arg(long)]
    pub non_interactive: bool,
}

pub async fn execute(args: InitArgs, config_path: &str) -> anyhow::Result<()> {
    let path = expand_tilde(config_path);

    if path.exists() && !args.force {
        if args.non_interactive {
            anyhow::bail!("{} already exists; pass --force to overwrite", path.display());
        }
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    let config = if args.non_interactive {
        Config::default()
    } else {
        run_wizard()?
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(&config)?;
    std::fs::write(&path, toml_str)?;

    println!();
    println!("{} wrote {}", style("\u{2713}").green().bold(), path.display());
    println!("Next: {} to check connectivity, then {}.", style("engage test").cyan(), style("engage run").cyan());
    Ok(())
}

fn run_wizard() -> anyhow::Result<Config> {
    println!("{}", style("Engage setup").bold());
    println!("A few questions to get a working config.toml. Press Enter to accept the default.\n");

    let mut config = Config::default();

    config.org.organization_id = Input::<String>::new()
        .with_prompt("Organization id (used for rate-limit accounting)")
        .interact_text()?;
    config.org.app_name = Input::<String>::new().with_prompt("Product/app name").interact_text()?;
    config.org.value_prop = Input::<String>::new()
        .with_prompt("One-line value proposition")
        .allow_empty(true)
        .interact_text()?;
    config.org.target_audience = Input::<String>::new()
        .with_prompt("Target audience")
        .allow_empty(true)
        .interact_text()?;
    config.org.website_url = Input::<String>::new()
        .with_prompt("Website URL")
        .allow_empty(true)
        .interact_text()?;

    let keywords: String = Input::new()
        .with_prompt("Crawl keywords (comma-separated)")
        .interact_text()?;
    config.crawl.keywords = split_csv(&keywords);

    let subreddits: String = Input::new()
        .with_prompt("Subreddits to monitor (comma-separated, Reddit only)")
        .allow_empty(true)
        .interact_text()?;
    config.crawl.subreddits = split_csv(&subreddits);

    config.llm.provider = Input::<String>::new()
        .with_prompt("LLM provider (openai, anthropic, or an OpenAI-compatible name)")
        .default("openai".to_string())
        .interact_text()?;
    if matches!(config.llm.provider.as_str(), "openai" | "anthropic") {
        let api_key: String = Input::new().with_prompt("LLM API key").interact_text()?;
        config.llm.api_key = Some(api_key);
    }
    config.llm.model = Input::<String>::new()
        .with_prompt("LLM model")
        .default("gpt-4o-mini".to_string())
        .interact_text()?;

    config.auto_post_enabled = Confirm::new()
        .with_prompt("Enable auto-posting once eligibility checks pass?")
        .default(false)
        .interact()?;

    if let Some(errors) = config.validate().err() {
        println!();
        println!("{}", style("Saved with validation warnings:").yellow());
        for error in errors {
            println!("  - {error}");
        }
    }

    Ok(config)
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',').map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect()
}

fn expand_tilde(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    std::path::PathBuf::from(path)
}
