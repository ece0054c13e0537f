mod prompt;
mod session;

use std::io;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use coach::client::{ChatSession, HttpRelay, SendOutcome};
use coach::knowledge::DEFAULT_ASSISTANT_NAME;
use prompt::CliclackPrompt;
use session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the relay
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Ask a single question, print the reply and exit
    #[arg(short, long)]
    message: Option<String>,

    /// Skip the starter topic picker
    #[arg(long)]
    no_topics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let relay = HttpRelay::new(&cli.url).context("failed to build relay client")?;
    tracing::debug!(url = relay.chat_url(), "using relay");
    let chat = ChatSession::new(relay);

    let mut session = Session::new(
        chat,
        Box::new(CliclackPrompt::new()),
        Box::new(io::stdout()),
        !cli.no_topics,
    );

    if let Some(message) = cli.message {
        if session.ask(&message).await? == SendOutcome::Failed {
            bail!("the relay at {} did not answer", cli.url);
        }
        return Ok(());
    }

    cliclack::intro(style(format!(" {} ", DEFAULT_ASSISTANT_NAME)).on_cyan().black())?;
    println!(
        "{}",
        style("Ask anything about training. Type \"exit\" to end the session.").dim()
    );
    session.start().await
}
