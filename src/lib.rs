pub mod config;
pub mod health;
pub mod model;
pub mod remote;
pub mod state;
pub mod ui;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use config::ConsoleConfig;
use health::{HealthStatus, poll_once};
use model::types::{HistoryEntry, ResultSet, Scenario};
use remote::{AnalysisRequest, HttpRemote};
use state::{ResultCache, SessionError, SessionOrchestrator};
use ui::browser::ResultBrowser;
use ui::data::{format_probability, history_row};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "risk-console",
    version,
    about = "Terminal console for project delay-risk analyses"
)]
pub struct Cli {
    /// Backend base URL (overrides RISK_CONSOLE_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// API key sent as x-api-key (overrides RISK_CONSOLE_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch interactive TUI
    Tui {
        /// Render once and exit (headless-friendly)
        #[arg(long, default_value_t = false)]
        once: bool,
    },
    /// Run an analysis and print the results
    Analyze {
        /// What-if scenario: add_resource, reduce_dependencies or improve_process
        #[arg(long)]
        scenario: Option<Scenario>,

        /// Retrain the model before analyzing
        #[arg(long)]
        refresh: bool,

        /// Print raw records as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent analyses
    History {
        /// Number of entries (defaults to RISK_CONSOLE_HISTORY_LIMIT)
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },
    /// Print a stored analysis
    Show {
        id: i64,

        #[arg(long)]
        json: bool,
    },
    /// Check backend connectivity
    Health,
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate man page to stdout
    Man,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = ConsoleConfig::from_env()
        .with_api_url(cli.api_url)
        .with_api_key(cli.api_key);

    let tui = matches!(cli.command, Commands::Tui { once: false });
    let _log_guard = init_logging(tui);

    match cli.command {
        Commands::Tui { once } => ui::tui::run_tui(config, once).await,
        Commands::Analyze {
            scenario,
            refresh,
            json,
        } => {
            let session = headless_session(&config)?;
            let set = session
                .run_analysis(AnalysisRequest { scenario, refresh })
                .await
                .map_err(session_failure)?;
            print_results(&set, json)
        }
        Commands::History { limit, json } => {
            let session = headless_session(&config)?;
            let entries = session
                .fetch_history(limit.unwrap_or(config.history_limit))
                .await
                .map_err(session_failure)?;
            print_history(&entries, json)
        }
        Commands::Show { id, json } => {
            let session = headless_session(&config)?;
            let set = session
                .load_historical(id)
                .await
                .map_err(session_failure)?;
            print_results(&set, json)
        }
        Commands::Health => {
            let remote = HttpRemote::new(&config).context("creating backend client")?;
            match poll_once(&remote, config.health_attempts).await {
                HealthStatus::Disconnected => {
                    bail!("backend at {} is not reachable", config.api_url)
                }
                status => {
                    println!("{} {}", config.api_url, status.label());
                    Ok(())
                }
            }
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "risk-console", &mut std::io::stdout());
            Ok(())
        }
        Commands::Man => {
            let cmd = Cli::command();
            let man = clap_mangen::Man::new(cmd);
            let mut out = std::io::stdout();
            man.render(&mut out)?;
            Ok(())
        }
    }
}

/// Install the global subscriber.
///
/// The TUI owns the terminal, so it logs to a daily file under the data dir;
/// every other command logs to stderr. `RUST_LOG` overrides the `info` default.
fn init_logging(tui: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tui {
        let appender = tracing_appender::rolling::daily(default_data_dir().join("logs"), "console.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .try_init();
        Some(guard)
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
        None
    }
}

fn headless_session(config: &ConsoleConfig) -> Result<SessionOrchestrator<HttpRemote>> {
    let remote = HttpRemote::new(config).context("creating backend client")?;
    Ok(SessionOrchestrator::new(remote, Arc::new(ResultCache::new())))
}

fn session_failure(err: SessionError) -> anyhow::Error {
    anyhow!("{}", err.user_message())
}

fn print_results(set: &ResultSet, json: bool) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, set.records())?;
        writeln!(out)?;
        return Ok(());
    }

    let counts = set.counts();
    writeln!(
        out,
        "{} tasks: {} high, {} medium, {} low",
        set.len(),
        counts.high,
        counts.medium,
        counts.low
    )?;
    let browser = ResultBrowser::new(set.clone());
    for record in browser.visible() {
        writeln!(
            out,
            "{:<16} {:<6} {:>3}  delay {:>4}  {}",
            record.id,
            record.risk_level.label(),
            record.risk_score,
            format_probability(record.delay_probability),
            record.reasons.first().map(String::as_str).unwrap_or("-")
        )?;
    }
    Ok(())
}

fn print_history(entries: &[HistoryEntry], json: bool) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, entries)?;
        writeln!(out)?;
        return Ok(());
    }
    if entries.is_empty() {
        writeln!(out, "no analyses recorded")?;
    }
    for entry in entries {
        writeln!(out, "{}", history_row(entry))?;
    }
    Ok(())
}

pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "risk-console", "risk-console").map_or_else(
        || std::env::temp_dir().join("risk-console"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}
