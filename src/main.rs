use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::Parser;
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use critic_core::{split_patterns, CriticConfig};
use critic_review::event::PullRequestEvent;
use critic_review::github::GitHubClient;
use critic_review::llm::LlmClient;
use critic_review::pipeline::{run, RunOutcome};

const DEFAULT_CONFIG: &str = ".critic.toml";

#[derive(Parser)]
#[command(
    name = "critic",
    version,
    about = "First-pass AI review for pull requests",
    long_about = "Reads a pull_request event, asks a completion model to critique every\n\
                   changed hunk, and posts the findings back as one GitHub review.\n\n\
                   Inputs follow GitHub Actions conventions, so inside a workflow every\n\
                   flag can come from the environment instead.\n\n\
                   Examples:\n  \
                     critic --event-path event.json --github-token $TOKEN --api-key $KEY\n  \
                     critic --exclude '**/*.lock,docs/**' --verbose"
)]
struct Cli {
    /// GitHub token used to read the pull request and post the review
    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// API key for the completion service
    #[arg(long, env = "INPUT_LAB45_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name sent with every completion request
    #[arg(long, env = "INPUT_LAB45_API_MODEL")]
    model: Option<String>,

    /// Comma-separated glob patterns of paths to skip
    #[arg(long, env = "INPUT_EXCLUDE")]
    exclude: Option<String>,

    /// Path to the pull_request event payload
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    event_path: Option<PathBuf>,

    /// Path to configuration file (default: .critic.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging, including raw model replies
    #[arg(long, short)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info,critic_ai=debug,critic_core=debug,critic_difflens=debug,critic_review=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<CriticConfig> {
    match path {
        Some(path) => CriticConfig::from_file(path)
            .into_diagnostic()
            .wrap_err(format!("loading {}", path.display())),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG);
            if default_path.exists() {
                CriticConfig::from_file(default_path)
                    .into_diagnostic()
                    .wrap_err(format!("loading {DEFAULT_CONFIG}"))
            } else {
                Ok(CriticConfig::default())
            }
        }
    }
}

/// Layer CLI flags and their environment fallbacks over the file config.
///
/// Empty values are treated as unset, which is how Actions passes
/// optional inputs.
fn apply_overrides(mut config: CriticConfig, cli: &Cli) -> CriticConfig {
    let given = |v: &Option<String>| v.clone().filter(|s| !is_blank(Some(s.as_str())));

    if let Some(token) = given(&cli.github_token) {
        config.github.token = Some(token);
    }
    if let Some(key) = given(&cli.api_key) {
        config.llm.api_key = Some(key);
    }
    if let Some(model) = given(&cli.model) {
        config.llm.model = model;
    }
    if let Some(exclude) = given(&cli.exclude) {
        config.review.exclude = split_patterns(&exclude);
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = apply_overrides(load_config(cli.config.as_deref())?, &cli);

    let Some(event_path) = cli.event_path.as_deref() else {
        tracing::error!("no event payload, set GITHUB_EVENT_PATH or pass --event-path");
        return Ok(());
    };
    let event = match PullRequestEvent::load(event_path) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("cannot read pull request event: {e}");
            return Ok(());
        }
    };

    if !event.is_supported() {
        tracing::info!(action = %event.action, "unsupported event action, nothing to review");
        return Ok(());
    }

    if is_blank(config.llm.api_key.as_deref()) {
        return Err(miette::miette!(
            help = "Pass --api-key or set INPUT_LAB45_API_KEY",
            "completion API key not set"
        ));
    }
    let host = GitHubClient::new(&config.github).into_diagnostic()?;
    let completion = LlmClient::new(&config.llm).into_diagnostic()?;
    tracing::info!(%event, model = completion.model(), "starting review");

    let outcome = run(&event, &host, &completion, &config)
        .await
        .into_diagnostic()
        .wrap_err(format!("reviewing {}/{}#{}", event.owner, event.repo, event.number))?;

    match outcome {
        RunOutcome::Unsupported(action) => {
            tracing::info!(%action, "unsupported event action, nothing to review");
        }
        RunOutcome::NoDiff => tracing::info!("no diff found, nothing to review"),
        RunOutcome::NothingToSubmit(result) => {
            tracing::info!(rejected = result.rejected.len(), "no comments to submit");
        }
        RunOutcome::Submitted(result) => {
            tracing::info!(comments = result.comments.len(), "review posted");
        }
    }

    Ok(())
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}
