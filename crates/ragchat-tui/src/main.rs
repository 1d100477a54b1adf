use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;

use ragchat_core::ai::rag::DEFAULT_TIMEOUT;
use ragchat_core::config::DEFAULT_SERVER_URL;
use ragchat_core::{ChatSession, Config, RagClient};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(about = "Terminal chat client for a RAG question-answering server")]
struct Cli {
    /// Base URL of the answer server
    #[arg(short, long)]
    server: Option<String>,

    /// Bearer token for the Authorization header
    #[arg(short, long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat screen (default)
    Chat,
    /// Send a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// Store the bearer token in the config file
    Login {
        /// Token issued by the server
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Login { token } => {
            Config::save_token(&token)?;
            println!("{}", "Token saved.".green());
            Ok(())
        }
        Commands::Ask { question } => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .init();

            let (client, _) = build_client(cli.server, cli.token)?;
            run_ask(client, &question).await
        }
        Commands::Chat => {
            let (client, server_url) = build_client(cli.server, cli.token)?;
            run_chat(client, server_url).await
        }
    }
}

/// Resolve server, token, and timeout from flags, environment, and the
/// config file, in that order.
fn build_client(server: Option<String>, token: Option<String>) -> Result<(RagClient, String)> {
    let config = Config::load().unwrap_or_else(|_| Config::new());

    let server_url = server
        .or_else(|| config.server_url.clone())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

    let token = token
        .or_else(|| std::env::var("RAGCHAT_TOKEN").ok())
        .or_else(|| config.token.clone());

    let Some(token) = token else {
        bail!(
            "no bearer token configured; pass --token, set RAGCHAT_TOKEN, \
             or run `ragchat login <token>`"
        );
    };

    let timeout = config
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);

    let client = RagClient::with_timeout(&server_url, &token, timeout)?;

    Ok((client, server_url))
}

async fn run_ask(client: RagClient, question: &str) -> Result<()> {
    println!("🤖 Asking {}...\n", "the answer service".bold().magenta());

    let mut session = ChatSession::new(client);
    if !session.send_query(question).await {
        println!("{}", "Nothing to ask.".yellow());
        return Ok(());
    }

    // The reply is the last transcript entry; a failed exchange arrives as
    // a fallback message rather than an error.
    if let Some(reply) = session.conversation().messages().last() {
        println!("{}", "Answer:".bold().green());
        println!("{}", reply.text);
    }

    Ok(())
}

async fn run_chat(client: RagClient, server_label: String) -> Result<()> {
    tui::install_panic_hook();

    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new(tui::TICK_RATE);
    let mut app = App::new(client, server_label);

    let result = run_loop(&mut terminal, &mut events, &mut app).await;
    tui::restore()?;

    result
}

async fn run_loop(
    terminal: &mut tui::Tui,
    events: &mut tui::EventHandler,
    app: &mut App,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        let event = events.next().await?;
        handler::handle_event(app, event).await?;
    }

    Ok(())
}
