//! Querydesk - Main Entry Point
//!
//! One free-text query per invocation: classify, dispatch, compose, print.
//! The exit status reflects whether a final response was produced.

use clap::{Parser, Subcommand};
use querydesk::config::AppConfig;
use querydesk::connectors::{
    relational::SqlGatewayConfig, report::ReportServiceConfig, search::VectorSearchConfig,
    workorder::WorkOrderClientConfig, HttpWorkOrderClient, ReportServiceClient, SqlGatewayClient,
    VectorSearchClient,
};
use querydesk::graph::ExecutionGraph;
use querydesk::handlers::{RelationalHandler, ReportHandler, SearchHandler, WorkOrderHandler};
use querydesk::llm::classifier::RouteClassifier;
use querydesk::llm::provider::TextGenerator;
use querydesk::logging::init_default_logging;
use querydesk::routing::{ComposeHandler, RoutingHandler};
use querydesk::state::RequestState;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Multi-agent query router CLI
#[derive(Parser)]
#[command(name = "querydesk")]
#[command(about = "Route natural-language questions to specialized backends")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one free-text question
    Ask {
        /// The question to route
        query: String,

        /// Print the state trace after every node instead of only the answer
        #[arg(long)]
        stream: bool,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    init_default_logging();

    let cli = Cli::parse();

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Ask { query, stream } => run_query(config, &query, stream).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(config_path: &Option<PathBuf>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(AppConfig::load_from_file(path)?)
        }
        None => {
            let default_paths = ["querydesk.toml", "config/querydesk.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(AppConfig::load_from_file(&path)?);
                }
            }

            Err("No configuration file found. Provide one with -c/--config or create querydesk.toml".into())
        }
    }
}

async fn run_query(
    config: AppConfig,
    query: &str,
    stream: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let graph = build_graph(&config)?;
    let state = RequestState::new(query, config.orchestrator.max_retries);

    info!(request_id = %state.request_id, "Processing query");

    let final_state = if stream {
        let mut walk = graph.walk(state);
        while let Some(intermediate) = walk.advance().await? {
            if let Some(record) = intermediate.trace.last() {
                println!("[{}] {}", record.step_name, record.output_summary);
            }
        }
        walk.into_state()
    } else {
        graph.run(state).await?
    };

    match final_state.final_response {
        Some(text) => {
            println!("{text}");
            Ok(())
        }
        None => Err("No final response was produced".into()),
    }
}

/// Oracle factory: select the provider implementation from configuration
fn build_generator(config: &AppConfig) -> Result<Arc<dyn TextGenerator>, Box<dyn std::error::Error>> {
    use querydesk::llm::providers::{
        AnthropicConfig, AnthropicProvider, OpenAiConfig, OpenAiProvider,
    };

    let api_key = config.get_llm_api_key()?;

    match config.llm.provider.as_str() {
        "openai" => {
            let provider = OpenAiProvider::new(OpenAiConfig {
                api_key,
                ..Default::default()
            })?;
            Ok(Arc::new(provider))
        }
        "anthropic" => {
            let provider = AnthropicProvider::new(AnthropicConfig {
                api_key,
                ..Default::default()
            })?;
            Ok(Arc::new(provider))
        }
        provider => Err(format!("Unsupported LLM provider: {provider}").into()),
    }
}

/// Bootstrap: build the graph with injected collaborators
fn build_graph(config: &AppConfig) -> Result<ExecutionGraph, Box<dyn std::error::Error>> {
    let generator = build_generator(config)?;

    let workorder_system = Arc::new(HttpWorkOrderClient::new(WorkOrderClientConfig {
        base_url: config.workorder.base_url.clone(),
        api_key: AppConfig::resolve_optional_key(config.workorder.api_key_env.as_ref()),
        timeout: Duration::from_secs(config.workorder.timeout_secs),
    })?);

    let relational_store = Arc::new(SqlGatewayClient::new(SqlGatewayConfig {
        base_url: config.relational.base_url.clone(),
        api_key: AppConfig::resolve_optional_key(config.relational.api_key_env.as_ref()),
        timeout: Duration::from_secs(config.relational.timeout_secs),
    })?);

    let search_index = Arc::new(VectorSearchClient::new(VectorSearchConfig {
        base_url: config.search.base_url.clone(),
        api_key: AppConfig::resolve_optional_key(config.search.api_key_env.as_ref()),
        timeout: Duration::from_secs(config.search.timeout_secs),
    })?);

    let report_renderer = Arc::new(ReportServiceClient::new(ReportServiceConfig {
        base_url: config.report.base_url.clone(),
        api_key: AppConfig::resolve_optional_key(config.report.api_key_env.as_ref()),
        timeout: Duration::from_secs(config.report.timeout_secs),
    })?);

    let mut classifier = RouteClassifier::new(generator.clone(), &config.llm.classifier.model);
    if let Some(temperature) = config.llm.classifier.temperature {
        classifier = classifier.with_temperature(temperature);
    }

    Ok(ExecutionGraph::new(
        RoutingHandler::new(classifier),
        WorkOrderHandler::new(
            generator.clone(),
            workorder_system,
            config.llm.query_generator.clone(),
        ),
        RelationalHandler::new(
            generator.clone(),
            relational_store,
            config.llm.query_generator.clone(),
            &config.relational.schema_context,
        ),
        SearchHandler::new(search_index, config.search.top_k),
        ReportHandler::new(
            generator.clone(),
            report_renderer,
            config.llm.query_generator.clone(),
            &config.relational.schema_context,
            config.report.chart_type.clone(),
        ),
        ComposeHandler::new(generator, config.llm.composer.clone()),
    ))
}

fn handle_config_command(config: AppConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
