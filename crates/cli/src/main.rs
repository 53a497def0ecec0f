// CME Dashboard CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Logs go to stderr so stdout stays machine-readable.

mod commands;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cme_core::config::DEFAULT_API_URL;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cme")]
#[command(about = "CME dashboard - manage examination recording sessions")]
#[command(version)]
pub struct Cli {
    /// API base URL
    #[arg(long, env = "CME_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short)]
    pub quiet: bool,

    /// Disable coloured status badges
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage sessions
    Sessions {
        #[command(subcommand)]
        command: commands::sessions::SessionsCommand,
    },

    /// Upload a recording and start processing
    Upload {
        /// Session ID
        session: String,

        /// Recording file (audio or video)
        file: std::path::PathBuf,

        /// Override the content type inferred from the file extension
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Get the report download link for a completed session
    Report {
        /// Session ID
        session: String,

        /// Open the link in the default browser
        #[arg(long)]
        open: bool,
    },

    /// List the jurisdictions accepted when creating sessions
    Jurisdictions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cme_cli=info,cme_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = context::Context::new(&cli)?;

    match cli.command {
        Commands::Sessions { command } => commands::sessions::run(command, &ctx).await,
        Commands::Upload {
            session,
            file,
            content_type,
        } => commands::upload::run(&ctx, &session, &file, content_type.as_deref()).await,
        Commands::Report { session, open } => commands::report::run(&ctx, &session, open).await,
        Commands::Jurisdictions => commands::jurisdictions::run(&ctx),
    }
}
