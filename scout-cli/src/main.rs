mod chat;
mod serve;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scout", version, about = "Streaming web-search chat agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve(serve::ServeArgs),
    /// Chat with a running server from the terminal
    Chat {
        /// Server base URL
        #[arg(long, env = "SCOUT_URL", default_value = "http://127.0.0.1:8000")]
        url: String,
        /// Continue an existing conversation
        #[arg(long)]
        thread_id: Option<String>,
    },
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            init_tracing("info");
            serve::run(args).await
        }
        Command::Chat { url, thread_id } => {
            init_tracing("warn");
            chat::run_repl(url, thread_id).await
        }
    }
}
