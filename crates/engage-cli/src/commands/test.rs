//! `engage test` -- validate configuration, credentials, and connectivity.
//!
//! Each check runs independently; a failure in one does not skip the rest.

use clap::Args;
use engage_core::config::Config;
use serde::Serialize;

/// Arguments for the `test` subcommand.
#[derive(Debug, Args)]
pub struct TestArgs {
    /// Print results as JSON instead of a human summary
    #[arg(long)]
    pub json: bool,
}

/// A single diagnostic check result.
#[derive(Clone, Serialize)]
struct CheckResult {
    label: &'static str,
    passed: bool,
    message: String,
}

impl CheckResult {
    fn ok(label: &'static str, message: impl Into<String>) -> Self {
        Self { label, passed: true, message: message.into() }
    }

    fn fail(label: &'static str, message: impl Into<String>) -> Self {
        Self { label, passed: false, message: message.into() }
    }
}

impl std::fmt::Display for CheckResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.passed { "OK" } else { "FAIL" };
        write!(f, "{:<18}{status} ({})", format!("{}:", self.label), self.message)
    }
}

#[derive(Serialize)]
struct TestOutput {
    passed: bool,
    checks: Vec<CheckResult>,
}

pub async fn execute(config: &Config, args: TestArgs) -> anyhow::Result<()> {
    let mut checks = vec![check_config(config)];
    checks.push(check_database(config).await);
    checks.push(check_llm(config).await);
    checks.extend(check_platform_credentials());

    let passed = checks.iter().all(|c| c.passed);
    let output = TestOutput { passed, checks };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Engage configuration check\n");
        for check in &output.checks {
            println!("{check}");
        }
        println!();
        println!("{}", if output.passed { "All checks passed." } else { "Some checks failed." });
    }

    if !output.passed {
        std::process::exit(1);
    }
    Ok(())
}

fn check_config(config: &Config) -> CheckResult {
    match config.validate() {
        Ok(()) => CheckResult::ok("config", "valid"),
        Err(errors) => CheckResult::fail(
            "config",
            errors.iter().map(std::string::ToString::to_string).collect::<Vec<_>>().join("; "),
        ),
    }
}

async fn check_database(config: &Config) -> CheckResult {
    match engage_core::storage::init_db(&config.storage.db_path).await {
        Ok(pool) => {
            if engage_core::storage::health_check(&pool).await {
                CheckResult::ok("database", config.storage.db_path.clone())
            } else {
                CheckResult::fail("database", "connected but health check query failed")
            }
        }
        Err(e) => CheckResult::fail("database", e.to_string()),
    }
}

async fn check_llm(config: &Config) -> CheckResult {
    if config.llm.provider.is_empty() {
        return CheckResult::fail("llm", "no provider configured");
    }
    let Some(api_key) = config.llm.api_key.clone() else {
        return CheckResult::fail("llm", format!("{} requires an api_key", config.llm.provider));
    };
    let base_url =
        config.llm.base_url.clone().unwrap_or_else(|| "https://api.openai.com/v1".to_string());
    let provider = engage_core::llm::openai_compat::OpenAiCompatProvider::new(
        base_url,
        api_key,
        config.llm.model.clone(),
        config.llm.model.clone(),
        config.llm.provider.clone(),
    );
    match engage_core::llm::LlmProvider::health_check(&provider).await {
        Ok(()) => CheckResult::ok("llm", format!("{} ({}) reachable", config.llm.provider, config.llm.model)),
        Err(e) => CheckResult::fail("llm", e.to_string()),
    }
}

fn check_platform_credentials() -> Vec<CheckResult> {
    let mut checks = Vec::new();

    checks.push(if std::env::var("REDDIT_CLIENT_ID").is_ok() && std::env::var("REDDIT_CLIENT_SECRET").is_ok() {
        CheckResult::ok("reddit", "credentials present")
    } else {
        CheckResult::fail("reddit", "REDDIT_CLIENT_ID / REDDIT_CLIENT_SECRET not set, crawler disabled")
    });

    checks.push(if std::env::var("TWITTER_BEARER_TOKEN").is_ok() {
        CheckResult::ok("twitter", "credentials present")
    } else {
        CheckResult::fail("twitter", "TWITTER_BEARER_TOKEN not set, crawler disabled")
    });

    checks.push(CheckResult::ok("quora", "no credentials required"));

    checks.push(if std::env::var("GOOGLE_API_KEY").is_ok() {
        CheckResult::ok("google", "credentials present")
    } else {
        CheckResult::fail("google", "GOOGLE_API_KEY not set, crawler disabled")
    });

    checks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_config_reports_failures() {
        let config = Config::default();
        let result = check_config(&config);
        assert!(!result.passed);
    }

    #[test]
    fn check_config_passes_for_valid_config() {
        let mut config = Config::default();
        config.org.organization_id = "acme".to_string();
        config.crawl.keywords = vec!["budgeting".to_string()];
        config.llm.provider = "ollama".to_string();
        let result = check_config(&config);
        assert!(result.passed);
    }

    #[tokio::test]
    async fn check_database_creates_and_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.db_path = dir.path().join("engage.db").to_string_lossy().to_string();
        let result = check_database(&config).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn check_llm_fails_without_api_key() {
        let mut config = Config::default();
        config.llm.provider = "openai".to_string();
        let result = check_llm(&config).await;
        assert!(!result.passed);
    }
}
