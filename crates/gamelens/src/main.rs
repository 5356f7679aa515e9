mod app;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gamelens_common::{logger, AppConfig, GameLensError};
use gamelens_embed::OllamaEmbedder;
use gamelens_vector::{HnswConfig, MatchType};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::app::AppState;
use crate::output::ErrorResponse;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "gamelens")]
#[command(about = "GameLens - semantic video game search over descriptions and reviews", long_about = None)]
struct Cli {
    /// Data directory (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Ranking strategy: index or exhaustive (overrides RANKING_STRATEGY)
    #[arg(long, global = true)]
    strategy: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank games against a free-text description
    Query {
        text: String,

        /// Match type: all, description or review
        #[arg(long = "type", default_value = "all")]
        match_type: MatchType,

        #[arg(short = 'n', long)]
        num_results: Option<usize>,

        /// Instruction prepended to the query before embedding
        #[arg(long)]
        instruction: Option<String>,
    },

    /// Find games similar to an appid
    Similar {
        appid: u64,

        #[arg(long = "type", default_value = "all")]
        match_type: MatchType,

        #[arg(short = 'n', long)]
        num_results: Option<usize>,
    },

    /// Numeric input is treated as an appid, anything else as text
    Search {
        query: String,

        #[arg(short = 'n', long)]
        num_results: Option<usize>,
    },

    /// Show catalog, index and embedding backend status
    Status,

    /// Build HNSW snapshots from the catalog
    BuildIndex {
        #[arg(long, default_value_t = 16)]
        m: usize,

        #[arg(long, default_value_t = 200)]
        ef_construction: usize,

        #[arg(long, default_value_t = 64)]
        ef_search: usize,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Cancel `token` when Ctrl-C arrives
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling search");
            token.cancel();
        }
    });
}

async fn run(command: Commands, config: AppConfig) -> Result<(), GameLensError> {
    if let Commands::BuildIndex {
        m,
        ef_construction,
        ef_search,
    } = command
    {
        let hnsw = HnswConfig {
            m,
            m_max0: m * 2,
            ef_construction,
            ef_search,
            ..HnswConfig::default()
        };
        let (description, review) = app::build_indexes(&config, hnsw)?;
        tracing::info!(
            "Index build complete - {} description vectors, {} review vectors",
            description,
            review
        );
        return Ok(());
    }

    let state = AppState::new(config)?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let response = match command {
        Commands::Query {
            text,
            match_type,
            num_results,
            instruction,
        } => {
            state
                .query_text(&text, match_type, num_results, instruction.as_deref(), &cancel)
                .await?
        }
        Commands::Similar {
            appid,
            match_type,
            num_results,
        } => state.similar(appid, match_type, num_results, &cancel).await?,
        Commands::Search { query, num_results } => {
            state.search(&query, num_results, &cancel).await?
        }
        Commands::Status => {
            let embedder = OllamaEmbedder::new(
                state.config.ollama_base_url.as_str(),
                state.config.embedding_model.as_str(),
                state.config.max_query_tokens,
            )?;
            let reachable = embedder.test_connection().await.unwrap_or(false);
            let status = state.status(reachable)?;
            print_json(&status).map_err(GameLensError::Other)?;
            return Ok(());
        }
        Commands::BuildIndex { .. } => return Ok(()),
    };

    print_json(&response).map_err(GameLensError::Other)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env early so CLI overrides below win over it
    load_dotenv_from_project_root();

    if let Some(data_dir) = &cli.data_dir {
        std::env::set_var("DATA_DIR", data_dir);
    }
    if let Some(strategy) = &cli.strategy {
        std::env::set_var("RANKING_STRATEGY", strategy);
    }

    let config = AppConfig::from_env()?;
    logger::setup_logging(&config)?;

    tracing::info!("GameLens starting...");
    tracing::info!("  Catalog: {}", config.catalog_path.display());
    tracing::info!("  Strategy: {}", config.ranking_strategy);

    if let Err(e) = run(cli.command, config).await {
        tracing::error!("{}", e);
        print_json(&ErrorResponse {
            error: e.to_string(),
            status: e.status_code(),
        })?;
        std::process::exit(1);
    }

    Ok(())
}
