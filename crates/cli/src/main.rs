//! # hivemind-cli
//!
//! Ask a question from the terminal and get back the course resources that
//! answer it.
//!
//! ```bash
//! hivemind-cli -q "I don't understand orthogonalization of matrices"
//! hivemind-cli -i ./whiteboard.png -q "what is this" --verbose
//! hivemind-cli -q "limits" --json
//! ```

mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hivemind_core::{load_config, validate_config, Config, ImageInput, ResourceFinder};

/// Config file read when `--config` is not given.
const DEFAULT_CONFIG: &str = "config.toml";

/// Find relevant Canvas resources based on your question or image.
#[derive(Parser, Debug)]
#[command(name = "hivemind-cli", version)]
struct Cli {
    /// Your learning question (e.g. "I don't understand orthogonalization of matrices")
    #[arg(short, long)]
    query: Option<String>,

    /// Path to an image file containing educational content to analyze
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Print type, course, module and score for each resource
    #[arg(short, long)]
    verbose: bool,

    /// Print the raw result list as JSON
    #[arg(long)]
    json: bool,

    /// Path to configuration file (TOML). Falls back to `HIVEMIND_CONFIG`,
    /// then `./config.toml`, then built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let query = cli.query.clone().filter(|q| !q.trim().is_empty());
    if query.is_none() && cli.image.is_none() {
        Cli::command().print_help()?;
        println!();
        return Ok(ExitCode::SUCCESS);
    }

    let query = query.unwrap_or_default();

    let image = match &cli.image {
        Some(path) => {
            if !path.exists() {
                eprintln!("Error: Image file not found at path '{}'", path.display());
                return Ok(ExitCode::FAILURE);
            }
            eprintln!("Analyzing image: {}", path.display());
            eprintln!("Query context: {}", query);
            Some(
                ImageInput::from_path(path)
                    .await
                    .with_context(|| format!("Failed to read image {}", path.display()))?,
            )
        }
        None => {
            eprintln!("Searching for resources related to: {}", query);
            None
        }
    };
    eprintln!("Please wait, this may take a few moments...\n");

    let config = resolve_config(cli.config.as_deref())?;
    let finder = ResourceFinder::from_config(&config).context("Failed to create LMS client")?;
    let outcome = finder.find_resources(&query, image.as_ref()).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", output::render(&outcome, cli.verbose));
    }

    Ok(ExitCode::SUCCESS)
}

/// Load the config named on the command line, or the default one if present.
fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let fallback = std::env::var("HIVEMIND_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG));
            fallback.exists().then_some(fallback)
        }
    };

    let config = match path {
        Some(path) => load_config(&path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::default(),
    };
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_short_flags() {
        let cli = Cli::parse_from(["hivemind-cli", "-q", "limits", "-i", "board.png", "-v"]);
        assert_eq!(cli.query.as_deref(), Some("limits"));
        assert_eq!(cli.image, Some(PathBuf::from("board.png")));
        assert!(cli.verbose);
        assert!(!cli.json);
    }

    #[test]
    fn test_parse_long_flags() {
        let cli = Cli::parse_from([
            "hivemind-cli",
            "--query",
            "eigenvalues",
            "--json",
            "--config",
            "/etc/hivemind.toml",
        ]);
        assert_eq!(cli.query.as_deref(), Some("eigenvalues"));
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/hivemind.toml")));
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        assert!(resolve_config(Some(Path::new("/nonexistent/hivemind.toml"))).is_err());
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[brain]\nmodule_fallback_count = 4\n").unwrap();
        file.flush().unwrap();

        let config = resolve_config(Some(file.path())).unwrap();
        assert_eq!(config.brain.module_fallback_count, 4);
    }

    #[tokio::test]
    async fn test_missing_image_fails() {
        let cli = Cli::parse_from(["hivemind-cli", "-i", "/nonexistent/board.png"]);
        assert_eq!(run(cli).await.unwrap(), ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn test_blank_query_without_image_prints_help() {
        for query in ["", "   "] {
            // The config path does not exist, so reaching the search would fail.
            let cli = Cli::parse_from([
                "hivemind-cli",
                "-q",
                query,
                "--config",
                "/nonexistent/hivemind.toml",
            ]);
            assert_eq!(run(cli).await.unwrap(), ExitCode::SUCCESS);
        }
    }
}
