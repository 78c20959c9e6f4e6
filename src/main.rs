//! MEDONE Session Gate - command-line driver
//!
//! Runs the session gate against file-backed tab and durable stores so a
//! login/check/logout sequence can be exercised across invocations.

use clap::{Parser, Subcommand};
use medone_gate::clock::SystemClock;
use medone_gate::config::GateConfig;
use medone_gate::lifecycle::PageState;
use medone_gate::page::{GuardedPage, LoginForm, LoginPage, Viewport};
use medone_gate::session::SessionGate;
use medone_gate::storage::{FileStorage, StoragePort};
use medone_gate::types::Page;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// MEDONE Session Gate - simulate the dashboard's session checks
#[derive(Parser, Debug)]
#[command(name = "medone-gate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Directory holding tab.json and durable.json
    #[arg(long, value_name = "DIR", default_value = ".medone")]
    state_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit the login form
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        /// Also persist the session in the durable store
        #[arg(long)]
        remember_me: bool,
    },

    /// Load a page once and report whether it stays
    Check {
        #[arg(long, default_value = "dashboard")]
        page: Page,
    },

    /// Log out from the dashboard
    Logout {
        /// Answer yes to the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Close the tab: wipe the tab-scoped store, keep the durable one
    CloseTab,

    /// Keep a page open, re-checking on the configured interval
    Watch {
        #[arg(long, default_value = "dashboard")]
        page: Page,
    },
}

/// Viewport that prints navigations and dialogs to the terminal.
struct ConsoleViewport {
    assume_yes: bool,
}

impl Viewport for ConsoleViewport {
    fn navigate(&self, url: &str) {
        println!("-> {}", url);
    }

    fn alert(&self, message: &str) {
        eprintln!("[alert] {}", message);
    }

    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{} [y/N] ", message);
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn show_error(&self, message: &str) {
        eprintln!("[error] {}", message);
    }

    // One-shot CLI: the password is re-entered on the next invocation.
    fn focus_password(&self) {}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => GateConfig::from_file(path)?,
        None => GateConfig::load()?,
    };

    let log_level = if cli.verbose {
        "medone_gate=trace".to_string()
    } else {
        config.log_level.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("MEDONE session gate v{}", env!("CARGO_PKG_VERSION"));
    info!("  State directory: {:?}", cli.state_dir);
    info!("  Session timeout: {}", humantime::format_duration(config.session_timeout));

    std::fs::create_dir_all(&cli.state_dir)?;
    let tab = Arc::new(FileStorage::open(cli.state_dir.join("tab.json"))?);
    let durable = Arc::new(FileStorage::open(cli.state_dir.join("durable.json"))?);
    let gate = Arc::new(SessionGate::new(
        &config,
        tab.clone(),
        durable.clone(),
        Arc::new(SystemClock),
    ));

    match cli.command {
        Command::Login {
            username,
            password,
            remember_me,
        } => {
            let mut page = LoginPage::new(gate, ConsoleViewport { assume_yes: false }, &config);
            if page.load() {
                return Ok(());
            }
            let mut form = LoginForm {
                username,
                password,
                remember_me,
            };
            if page.submit(&mut form).await.is_err() {
                std::process::exit(1);
            }
        }
        Command::Check { page } => {
            if !page.requires_session() {
                let login = LoginPage::new(gate, ConsoleViewport { assume_yes: false }, &config);
                if !login.load() {
                    println!("login page shown");
                }
                return Ok(());
            }
            let mut guarded =
                GuardedPage::new(page, gate, ConsoleViewport { assume_yes: false }, &config);
            if guarded.load() == PageState::Active {
                println!("{} page shown", page);
            } else {
                std::process::exit(1);
            }
        }
        Command::Logout { yes } => {
            let mut guarded = GuardedPage::new(
                Page::Dashboard,
                gate,
                ConsoleViewport { assume_yes: yes },
                &config,
            );
            if guarded.load() == PageState::Active {
                guarded.logout();
            }
        }
        Command::CloseTab => {
            tab.clear()?;
            info!("Tab store cleared ({:?})", tab.path());
        }
        Command::Watch { page } => {
            if !page.requires_session() {
                warn!("{} is not a gated page, nothing to watch", page);
                return Ok(());
            }
            let mut guarded =
                GuardedPage::new(page, gate, ConsoleViewport { assume_yes: false }, &config);
            let state = guarded.run_until(shutdown_signal()).await;
            info!("Stopped watching {} in state {}", page, state);
        }
    }

    Ok(())
}

/// Handle shutdown signals (SIGINT, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, closing page...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, closing page...");
        }
    }
}
