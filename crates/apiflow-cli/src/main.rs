//! ApiFlow CLI — turn a natural-language request into live API calls.
//!
//! Reuses the same engine (apiflow-core) and server bootstrap
//! (apiflow-server) that power the HTTP API.

mod commands;

use clap::{Parser, Subcommand};

/// ApiFlow CLI — natural-language API workflows
#[derive(Parser)]
#[command(name = "apiflow", version, about = "ApiFlow CLI — natural-language API workflows")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ApiFlow HTTP server
    Server {
        /// Host to bind to
        #[arg(long, env = "APIFLOW_HOST", default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, env = "APIFLOW_PORT", default_value_t = 8000)]
        port: u16,
    },

    /// Plan and execute a workflow locally, printing events as they arrive.
    /// Example: apiflow run "Fetch all posts for user 1 from jsonplaceholder"
    Run {
        /// Natural-language description of the API calls to make
        prompt: String,
        /// Print raw events as newline-delimited JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a prompt would be accepted
    Validate {
        prompt: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "apiflow_core=info,apiflow_server=info,apiflow_cli=info,tower_http=info".into()
            }),
        )
        .init();

    let result = match cli.command {
        Some(Commands::Server { host, port }) => commands::server::run(host, port).await,
        Some(Commands::Run { prompt, json }) => commands::workflow::run(&prompt, json).await,
        Some(Commands::Validate { prompt }) => {
            commands::workflow::validate(&prompt).map(|()| println!("✅ Prompt is valid"))
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
