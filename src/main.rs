//! opencode-mcp - MCP server for opencode configuration
//!
//! Serves the opencode config tools over stdio, or runs single tool calls
//! from the command line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;

use opencode_mcp::config::{read_document, ConfigValidator, Located};
use opencode_mcp::schema::SchemaCache;
use opencode_mcp::settings::{DEFAULT_MODELS_URL, DEFAULT_REGISTRY_URL, DEFAULT_SCHEMA_URL};
use opencode_mcp::{HttpSource, McpServer, RemoteSource, Scope, ServerSettings, ToolRegistry};

#[derive(Parser)]
#[command(name = "opencode-mcp")]
#[command(version)]
#[command(about = "MCP server for managing opencode configuration, models and MCP services", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory holding opencode.json(c)
    #[arg(short, long, global = true, env = "OPENCODE_MCP_PROJECT", default_value = ".")]
    project: PathBuf,

    /// Global config directory (defaults to ~/.config/opencode)
    #[arg(long, global = true, env = "OPENCODE_MCP_GLOBAL_DIR")]
    global_dir: Option<PathBuf>,

    /// Directory for cached schema and catalogs
    #[arg(long, global = true, env = "OPENCODE_MCP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Config JSON Schema URL
    #[arg(long, global = true, default_value = DEFAULT_SCHEMA_URL)]
    schema_url: String,

    /// Models catalog URL
    #[arg(long, global = true, default_value = DEFAULT_MODELS_URL)]
    models_url: String,

    /// MCP registry listing URL
    #[arg(long, global = true, default_value = DEFAULT_REGISTRY_URL)]
    registry_url: String,

    /// Backups kept per config file
    #[arg(long, global = true, default_value = "5")]
    backup_retention: usize,

    /// Catalog cache freshness in hours
    #[arg(long, global = true, default_value = "24")]
    cache_ttl_hours: u64,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tools over stdio (default)
    Serve,

    /// Print tool definitions as JSON
    Tools,

    /// Invoke one tool and print its result
    Call {
        /// Tool name
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Validate a config file
    Validate {
        /// Scope to validate: project, global or auto
        #[arg(short, long, default_value = "auto")]
        scope: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn settings(&self) -> ServerSettings {
        let project = self.project.canonicalize().unwrap_or(self.project.clone());
        let mut settings = ServerSettings::default()
            .with_project_dir(project)
            .with_schema_url(&self.schema_url)
            .with_models_url(&self.models_url)
            .with_registry_url(&self.registry_url)
            .with_backup_retention(self.backup_retention)
            .with_catalog_ttl(ttl_from_hours(self.cache_ttl_hours));
        if let Some(dir) = &self.global_dir {
            settings = settings.with_global_dir(dir);
        }
        if let Some(dir) = &self.data_dir {
            settings = settings.with_data_dir(dir);
        }
        settings
    }
}

fn ttl_from_hours(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(60 * 60))
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        "opencode_mcp=debug,info"
    } else {
        "opencode_mcp=info,warn"
    };

    // stdout carries protocol frames
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let settings = cli.settings();
    let source: Arc<dyn RemoteSource> = Arc::new(HttpSource::new()?);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!("Project directory: {}", settings.project_dir.display());
            let tools = ToolRegistry::new(&settings, source);
            McpServer::new(tools).serve_stdio().await?;
        }

        Commands::Tools => {
            let tools = ToolRegistry::new(&settings, source);
            println!("{}", serde_json::to_string_pretty(&tools.definitions())?);
        }

        Commands::Call { tool, args } => {
            let arguments: Value =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            let tools = ToolRegistry::new(&settings, source);
            let result = tools.call(&tool, arguments).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Validate { scope, json } => {
            let scope: Scope = scope.parse()?;
            let path = match settings.locations().locate(scope).await {
                Located::Found { path, .. } => path,
                Located::NotFound { searched } => {
                    let searched: Vec<String> =
                        searched.iter().map(|p| p.display().to_string()).collect();
                    anyhow::bail!(
                        "No {} configuration file found (searched: {})",
                        scope,
                        searched.join(", ")
                    );
                }
            };

            let schema = SchemaCache::new(source, settings.schema_url.clone(), &settings.data_dir)
                .get()
                .await?;
            let document = read_document(&path).await?;
            let report = ConfigValidator::new(&schema)
                .validate(&document)
                .with_path(path);

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.verbose_report());
            }
            std::process::exit(report.exit_code());
        }
    }

    Ok(())
}
