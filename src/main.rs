use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use so_assistant::{
    create_router, init_user_id, AppState, BackendClient, ChatSession, Config, HistoryMirror, Mode,
    SessionConfig, SpeechBackendFactory,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "so-assistant", version, about = "Summarize a page, then chat about it")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/so-assistant")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the session over the local HTTP API
    Serve,
    /// Chat on stdin/stdout
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("so_assistant=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let session = build_session(&cfg)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cfg, session).await,
        Command::Repl => repl(session).await,
    }
}

fn build_session(cfg: &Config) -> Result<ChatSession> {
    let state_path = cfg.storage.resolved_state_path();
    let user_id = init_user_id(&state_path)
        .with_context(|| format!("Failed to initialise user id from {:?}", state_path))?
        .clone();

    let client = Arc::new(BackendClient::new(&cfg.backend)?);
    let history = HistoryMirror::new(client.clone());

    // No speech engine is linked into this binary; with credentials alone the
    // factory still falls back to the disabled variant.
    let speech = SpeechBackendFactory::create(&cfg.speech, None);

    Ok(ChatSession::new(
        user_id,
        SessionConfig::from(&cfg.session),
        client,
        history,
        speech,
    ))
}

async fn serve(cfg: &Config, session: ChatSession) -> Result<()> {
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on {}", addr);

    let router = create_router(AppState::new(session.clone()));
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    session.shutdown();
    Ok(())
}

async fn repl(session: ChatSession) -> Result<()> {
    println!("Paste a URL to summarize. Commands: :reset :history :voice on|off :dictate :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();

        let result = match line {
            ":quit" | ":q" => break,
            ":reset" => {
                printed = 0;
                Ok(session.reset())
            }
            ":history" => {
                for entry in session.fetch_history().await {
                    println!("- {} ({} queries)", entry.url, entry.queries.len());
                    for query in &entry.queries {
                        println!("    {}", query);
                    }
                }
                continue;
            }
            ":voice on" => Ok(session.set_voice_enabled(true)),
            ":voice off" => Ok(session.set_voice_enabled(false)),
            ":dictate" => session.dictate().await,
            input => match session.snapshot().mode {
                Mode::CollectingUrl => session.submit_url(input).await,
                Mode::Chatting => session.submit_query(input).await,
            },
        };

        if let Err(e) = &result {
            println!("! {}", e);
        }

        // A failed query still leaves an "Error: ..." bot message to print
        let snapshot = session.snapshot();
        for message in snapshot.transcript.iter().skip(printed) {
            println!("[{:?}] {}", message.role, message.text);
        }
        printed = snapshot.transcript.len();
    }

    session.shutdown();
    Ok(())
}
