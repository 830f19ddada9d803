//! # almanac CLI
//!
//! Command-line interface for the almanac diary publisher.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "almanac")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "almanac.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the diary pagination API and protected post payloads
    Build,

    /// Show how diary identifiers (file names) are interpreted
    Identify {
        /// Identifiers to parse
        #[arg(required = true)]
        ids: Vec<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Encrypt the body of a post
    Protect {
        /// Markdown post
        post: PathBuf,

        /// Password (defaults to the post's frontmatter `password`)
        #[arg(long, env = "ALMANAC_PASSWORD")]
        password: Option<String>,

        /// Write the payload here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Decrypt a protected payload and print the rendered HTML
    Unlock {
        /// Payload or protected post envelope (JSON)
        payload: PathBuf,

        /// Password
        #[arg(long, env = "ALMANAC_PASSWORD")]
        password: String,

        /// Document path used to resolve relative attachments
        #[arg(long)]
        document: Option<PathBuf>,
    },

    /// Build, then serve the output directory
    Serve {
        /// Server port
        #[arg(long, default_value = "4321")]
        port: u16,
    },

    /// Page through a published diary timeline
    Timeline {
        /// Site serving the pagination API
        #[arg(long, default_value = "http://127.0.0.1:4321")]
        base_url: String,

        /// Number of pages to load, including the first
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Build => commands::build_site(&cli.config),
        Commands::Identify { ids, json } => commands::identify(&ids, json),
        Commands::Protect {
            post,
            password,
            output,
        } => commands::protect_post(&post, password.as_deref(), output.as_deref()),
        Commands::Unlock {
            payload,
            password,
            document,
        } => commands::unlock_payload(&cli.config, &payload, &password, document.as_deref()),
        Commands::Serve { port } => commands::serve_site(&cli.config, port).await,
        Commands::Timeline { base_url, pages } => {
            commands::show_timeline(&cli.config, &base_url, pages).await
        }
    }
}
