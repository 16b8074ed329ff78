use std::path::PathBuf;

use ragserve::cli::{resolve_mode, Cli, Commands, ConfigAction};
use ragserve::config::Config;
use ragserve::error::{RagError, Result};
use ragserve::retrieval::{DocumentAssembler, QuerySpec};
use ragserve::store::{StoreBackend, VectorStoreGateway, WeaviateBackend};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Files => {
            let gateway = connect_gateway(cli.config).await?;
            cmd_files(&gateway).await?;
        }
        Commands::Pages { name } => {
            let gateway = connect_gateway(cli.config).await?;
            cmd_pages(&gateway, &name).await?;
        }
        Commands::Search {
            query,
            mode,
            limit,
            alpha,
            file,
        } => {
            let gateway = connect_gateway(cli.config).await?;
            cmd_search(&gateway, &query, &mode, limit, alpha, file).await?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose {
        "ragserve=debug"
    } else {
        "ragserve=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn connect_gateway(
    config_path: Option<PathBuf>,
) -> Result<VectorStoreGateway<WeaviateBackend>> {
    let config = Config::load_or_default(config_path)?;
    VectorStoreGateway::connect(&config).await
}

async fn cmd_files<S: StoreBackend>(gateway: &VectorStoreGateway<S>) -> Result<()> {
    let assembler = DocumentAssembler::new(gateway);
    let files = assembler.list_documents().await?;
    print_json(&serde_json::json!({ "files": files }))
}

async fn cmd_pages<S: StoreBackend>(gateway: &VectorStoreGateway<S>, name: &str) -> Result<()> {
    let assembler = DocumentAssembler::new(gateway);
    let pages = assembler.get_all_pages(name).await?;
    print_json(&pages)
}

async fn cmd_search<S: StoreBackend>(
    gateway: &VectorStoreGateway<S>,
    query: &str,
    mode: &str,
    limit: usize,
    alpha: f32,
    file: Option<String>,
) -> Result<()> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(anyhow::anyhow!("alpha must be within [0,1], got {}", alpha).into());
    }

    let spec = QuerySpec {
        query: query.to_string(),
        mode: resolve_mode(mode, file.as_deref()),
        topk: limit,
        alpha,
        file_pattern: file,
    };
    let results = spec.execute(gateway).await?;
    print_json(&results)
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load_or_default(config_path)?;
            let rendered = toml::to_string_pretty(&config)?;
            println!("{}", rendered);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(p) => p,
                None => Config::default_path()?,
            };
            if path.exists() && !force {
                return Err(RagError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| RagError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }
            Config::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| RagError::Json {
        source: e,
        context: "rendering results".to_string(),
    })?;
    println!("{}", rendered);
    Ok(())
}
