use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::SwitchboardConfig;
use switchboard_a2a::{AgentCard, AgentServer, RemoteAgent};
use switchboard_core::{
    AgentEndpoint, Envelope, Generator, GoogleGenerator, GraphResearchPipeline,
    GREETING_AGENT, GreetingResponder, IMAGE_AGENT, ImageResponder, ManagerAgent,
    RetryingGenerator, SpecialistRegistry,
};
use switchboard_gateway::GatewayServer;
use switchboard_gateway::auth::GatewayAuth;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(version)]
#[command(about = "Switchboard: a router agent in front of specialist agents")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration (secrets masked)
    Config,

    /// Run a single agent server
    Serve {
        #[arg(value_enum)]
        agent: AgentKind,
    },

    /// Run the front-door HTTP gateway
    Gateway,

    /// Run every agent and the gateway in one process
    Up,

    /// Send a one-shot request to the manager agent
    Ask {
        /// The request text
        text: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AgentKind {
    Manager,
    Greeting,
    Image,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Serve { agent } => cmd_serve(&cli.config, agent).await,
        Commands::Gateway => cmd_gateway(&cli.config).await,
        Commands::Up => cmd_up(&cli.config).await,
        Commands::Ask { text } => cmd_ask(&cli.config, &text).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    println!("Switchboard initialized at {}", config_dir.display());
    println!(
        "Set {} in your environment or a .env file, then run `switchboard up`.",
        config::API_KEY_ENV
    );
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.redacted())?);
    Ok(())
}

async fn cmd_serve(config_path: &Option<PathBuf>, kind: AgentKind) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    let mut servers = JoinSet::new();
    servers.spawn(build_agent_server(&cfg, kind)?.run());
    wait_for_shutdown(servers).await
}

async fn cmd_gateway(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    let mut servers = JoinSet::new();
    servers.spawn(build_gateway(&cfg)?.run());
    wait_for_shutdown(servers).await
}

async fn cmd_up(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    info!("Starting agent network...");

    // Specialists first so the manager's first dispatch finds them listening
    let mut servers = JoinSet::new();
    for kind in [AgentKind::Greeting, AgentKind::Image, AgentKind::Manager] {
        servers.spawn(build_agent_server(&cfg, kind)?.run());
    }
    servers.spawn(build_gateway(&cfg)?.run());

    wait_for_shutdown(servers).await
}

async fn cmd_ask(config_path: &Option<PathBuf>, text: &str) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    let manager = RemoteAgent::new("manager_agent", cfg.manager_url(), cfg.transport.timeout())?;

    let reply = manager
        .call(Envelope::user_text(text))
        .await
        .with_context(|| format!("Manager at {} did not answer", manager.base_url()))?;
    println!("{}", reply.text());
    Ok(())
}

/// Wait for Ctrl+C or for any server to exit, then stop the rest
async fn wait_for_shutdown(mut servers: JoinSet<Result<()>>) -> Result<()> {
    let outcome = tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            info!("Received Ctrl+C, shutting down...");
            Ok(())
        }
        Some(joined) = servers.join_next() => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Server exited: {:#}", e);
                Err(e)
            }
            Err(e) => Err(anyhow::anyhow!("Server task failed: {}", e)),
        },
    };

    servers.shutdown().await;
    println!("Switchboard stopped.");
    outcome
}

/// Extra generation attempts for an agent's model calls. Classification and
/// image synthesis are single-shot; only text answers are retried.
fn generator_retries(cfg: &SwitchboardConfig, kind: AgentKind) -> u32 {
    match kind {
        AgentKind::Greeting => cfg.providers.google.max_retries,
        AgentKind::Manager | AgentKind::Image => 0,
    }
}

fn build_generator(
    cfg: &SwitchboardConfig,
    model: &str,
    retries: u32,
) -> Result<Arc<dyn Generator>> {
    let google = &cfg.providers.google;
    let api_key = google.resolved_api_key().with_context(|| {
        format!(
            "{} not found. Set it in the environment, a .env file, or the config file.",
            config::API_KEY_ENV
        )
    })?;

    let mut provider = GoogleGenerator::new(
        api_key,
        model.to_string(),
        google.max_tokens,
        cfg.transport.timeout(),
    )?;
    if let Some(base_url) = &google.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    info!(
        "Google generator initialized (model: {}, retries: {})",
        model, retries
    );

    if retries == 0 {
        return Ok(Arc::new(provider));
    }
    Ok(Arc::new(
        RetryingGenerator::new(Arc::new(provider)).with_max_retries(retries),
    ))
}

fn build_agent(cfg: &SwitchboardConfig, kind: AgentKind) -> Result<Arc<dyn AgentEndpoint>> {
    let google = &cfg.providers.google;
    let retries = generator_retries(cfg, kind);
    let agent: Arc<dyn AgentEndpoint> = match kind {
        AgentKind::Greeting => {
            let generator = build_generator(cfg, &google.text_model, retries)?;
            let mut responder = GreetingResponder::new(generator.clone()).with_research_limits(
                cfg.greeting.max_research_loops,
                cfg.greeting.initial_search_query_count,
            );
            if cfg.greeting.research_enabled {
                let pipeline = GraphResearchPipeline::new(generator);
                responder = responder.with_research(Arc::new(pipeline));
                info!("Research pipeline enabled");
            }
            Arc::new(responder)
        }
        AgentKind::Image => Arc::new(ImageResponder::new(
            build_generator(cfg, &google.image_model, retries)?,
            cfg.image.output_path.clone(),
        )),
        AgentKind::Manager => {
            let timeout = cfg.transport.timeout();
            let greeting = RemoteAgent::new(
                GREETING_AGENT,
                cfg.agents.url(cfg.agents.greeting_port),
                timeout,
            )?;
            let image =
                RemoteAgent::new(IMAGE_AGENT, cfg.agents.url(cfg.agents.image_port), timeout)?;
            let registry = SpecialistRegistry::new()
                .with(GREETING_AGENT, Arc::new(greeting))
                .with(IMAGE_AGENT, Arc::new(image));
            Arc::new(ManagerAgent::new(
                build_generator(cfg, &google.classifier_model, retries)?,
                registry,
            ))
        }
    };
    Ok(agent)
}

fn build_agent_server(cfg: &SwitchboardConfig, kind: AgentKind) -> Result<AgentServer> {
    let port = match kind {
        AgentKind::Manager => cfg.agents.manager_port,
        AgentKind::Greeting => cfg.agents.greeting_port,
        AgentKind::Image => cfg.agents.image_port,
    };
    let bind: SocketAddr = cfg.agents.addr(port)?;
    let agent = build_agent(cfg, kind)?;

    let mut card = AgentCard::new(agent.name(), agent.description(), cfg.agents.url(port));
    if kind == AgentKind::Image {
        card = card.with_capability("envelope/image_status");
    }
    Ok(AgentServer::new(agent, card, bind))
}

fn build_gateway(cfg: &SwitchboardConfig) -> Result<GatewayServer> {
    // The gateway never calls the model itself, but refuses to start without a key
    cfg.providers.google.resolved_api_key().with_context(|| {
        format!("FATAL: {} not found.", config::API_KEY_ENV)
    })?;

    let manager = RemoteAgent::new("manager_agent", cfg.manager_url(), cfg.transport.timeout())?;
    let auth = GatewayAuth::new(cfg.gateway.auth_token.clone());
    if auth.is_enabled() {
        info!("Gateway bearer-token auth enabled");
    }
    Ok(GatewayServer::new(Arc::new(manager), cfg.gateway.addr()?, auth))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_text_answers_are_retried() {
        let mut cfg = SwitchboardConfig::default();
        cfg.providers.google.max_retries = 3;
        assert_eq!(generator_retries(&cfg, AgentKind::Greeting), 3);
        assert_eq!(generator_retries(&cfg, AgentKind::Manager), 0);
        assert_eq!(generator_retries(&cfg, AgentKind::Image), 0);
    }

    #[test]
    fn test_generator_requires_api_key() {
        let mut cfg = SwitchboardConfig::default();
        cfg.providers.google.api_key = "test-key".to_string();
        assert!(build_generator(&cfg, "gemini-2.0-flash", 0).is_ok());
        assert!(build_generator(&cfg, "gemini-2.0-flash", 2).is_ok());
    }
}
