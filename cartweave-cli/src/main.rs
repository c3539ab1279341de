//! Cartweave CLI: an interactive shopping session against the mock gateways.
//!
//! Starts (or resumes) a session, prints the session's message log, and reads
//! feedback lines whenever the session parks for input. With `--db` the
//! session checkpoints into SQLite and can be resumed by id after a restart.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use cartweave::{
    MockCatalog, MockReasoning, OrchestratorConfig, SessionState, ShoppingSession, SqliteLog,
};

#[derive(Parser, Debug)]
#[command(name = "cartweave", about = "Shopping-cart orchestration demo")]
struct Cli {
    /// Free-text shopping request, e.g. "5kg basmati rice, 1l fabric conditioner".
    request: Option<String>,

    /// SQLite checkpoint database; sessions are persisted and resumable.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Resume a previous session by id (requires --db).
    #[arg(long)]
    resume: Option<String>,

    /// Orchestrator config TOML (vendors, thresholds, retry policy).
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Demo catalog: a handful of staples across the four default vendors.
fn demo_catalog() -> MockCatalog {
    MockCatalog::new()
        .with_offer("bigbasket", "basmati rice", "Daawat", 1.0, "kg", 310.0)
        .with_offer("blinkit", "basmati rice", "India Gate", 1.0, "kg", 320.0)
        .with_offer("zepto", "basmati rice", "Fortune", 1.0, "kg", 330.0)
        .with_offer("swiggy_instamart", "basmati rice", "Daawat", 1.0, "kg", 315.0)
        .with_offer("zepto", "fabric conditioner", "Comfort", 1.0, "l", 220.0)
        .with_offer("blinkit", "fabric conditioner", "Softouch", 1.0, "l", 240.0)
        .with_offer("zepto", "sugar", "Madhur", 1.0, "kg", 45.0)
        .with_offer("bigbasket", "sugar", "Fresho", 1.0, "kg", 44.0)
        .with_offer("blinkit", "tea", "Taj Mahal", 500.0, "g", 290.0)
        .with_offer("bigbasket", "tea", "Red Label", 500.0, "g", 260.0)
        .with_offer("swiggy_instamart", "milk", "Amul", 1.0, "l", 66.0)
        .with_offer("zepto", "milk", "Mother Dairy", 1.0, "l", 64.0)
}

/// Prints messages appended since the last call and returns the new offset.
fn print_new_messages(state: &SessionState, printed: usize) -> usize {
    for message in &state.messages[printed..] {
        println!("{message}\n");
    }
    state.messages.len()
}

fn read_line(prompt: &str) -> std::io::Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line)? == 0 {
        return Ok(None); // EOF
    }
    Ok(Some(line.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => OrchestratorConfig::load(path)?,
        None => OrchestratorConfig::default(),
    };

    let catalog = Arc::new(demo_catalog());
    let reasoning = Arc::new(MockReasoning::new());

    let session = match &cli.db {
        Some(path) => {
            let log: Arc<SqliteLog<SessionState>> = Arc::new(SqliteLog::new(path)?);
            ShoppingSession::with_checkpoint_log(catalog, reasoning, config, log)?
        }
        None => ShoppingSession::new(catalog, reasoning, config)?,
    };

    let mut state = match &cli.resume {
        Some(session_id) => match session.resume(session_id).await? {
            Some(state) => {
                println!("Resumed session {session_id}.\n");
                state
            }
            None => {
                eprintln!("No checkpoint found for session {session_id}.");
                return Ok(());
            }
        },
        None => {
            let request = match cli.request {
                Some(request) => request,
                None => match read_line("What do you need? ")? {
                    Some(line) if !line.is_empty() => line,
                    _ => return Ok(()),
                },
            };
            session.start(request).await?
        }
    };

    let mut printed = 0usize;
    printed = print_new_messages(&state, printed);

    while !state.is_terminal() {
        if !state.awaiting_input {
            // Parked without a prompt only on errors; nothing more to drive.
            break;
        }
        let input = match read_line("> ")? {
            Some(line) if !line.is_empty() => line,
            Some(_) => continue,
            None => break,
        };
        if input == "quit" || input == "exit" {
            println!("Session {} parked; resume it with --resume.", state.session_id);
            break;
        }
        state = session.submit(state, input).await?;
        printed = print_new_messages(&state, printed);
    }

    if state.is_terminal() {
        tracing::info!(session_id = %state.session_id, "session checked out");
    }
    Ok(())
}
