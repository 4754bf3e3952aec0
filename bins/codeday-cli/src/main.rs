mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codeday_common::config::Config;
use codeday_common::redis::RedisStore;
use codeday_common::seed::default_challenges;
use codeday_common::store::{ChallengeStore, MemoryStore};
use codeday_grader::Grader;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "codeday")]
#[command(about = "codeday - list coding challenges and grade submissions", long_about = None)]
struct Cli {
    /// JSON config file (interpreter, timeout, scratch dir, redis url)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List challenges ordered by day
    List,

    /// Show one challenge
    Show {
        #[arg(short, long)]
        day: u32,
    },

    /// Grade a solution and record it on success
    Submit {
        #[arg(short, long)]
        day: u32,

        /// Learner name credited on a pass
        #[arg(short, long)]
        name: String,

        /// Source file; read from stdin if omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Completion statistics
    Stats,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("CODEDAY_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // stdout belongs to command output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_store(config: &Config) -> Result<Box<dyn ChallengeStore>> {
    let store: Box<dyn ChallengeStore> = match &config.redis_url {
        Some(url) => {
            let store = RedisStore::connect(url)
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", url))?;
            info!("Connected to Redis: {}", url);
            Box::new(store)
        }
        None => {
            warn!("REDIS_URL not set, using in-memory challenge store; progress is not kept");
            Box::new(MemoryStore::new())
        }
    };

    // Insert-or-ignore: existing progress is never reset
    let inserted = store
        .seed(&default_challenges())
        .await
        .context("Failed to seed challenges")?;
    if inserted > 0 {
        info!(inserted, "Seeded challenges");
    }

    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env(cli.config.as_deref()).context("Failed to load configuration")?;
    let store = open_store(&config).await?;

    match cli.command {
        Commands::List => {
            commands::list(store.as_ref()).await?;
        }
        Commands::Show { day } => {
            commands::show(store.as_ref(), day).await?;
        }
        Commands::Submit { day, name, file } => {
            let grader = Grader::from_config(&config).context("Failed to set up grader")?;
            let code = commands::read_source(file.as_deref()).await?;
            let verdict = commands::submit(&grader, store.as_ref(), day, &name, &code).await?;
            if !verdict.is_pass() {
                std::process::exit(1);
            }
        }
        Commands::Stats => {
            commands::stats(store.as_ref()).await?;
        }
    }

    Ok(())
}
