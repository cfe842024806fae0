use anyhow::{Context, Result};
use clap::Parser;
use simple_agent::agent::Agent;
use simple_agent::cli::Args;
use simple_agent::config::{self, AgentConfig};
use simple_agent::llm::AnthropicClient;
use simple_agent::logging::setup_logging;
use simple_agent::repl::Repl;
use std::time::Duration;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine, the key may come from the environment
    dotenv::dotenv().ok();

    let args = Args::parse();
    setup_logging(args.verbose);

    let mut config = AgentConfig::load().context("Failed to load configuration")?;
    args.apply_overrides(&mut config);
    config.validate()?;
    debug!("Using configuration: {:?}", config);

    let api_key = config::api_key_from_env()
        .context("Please set your ANTHROPIC_API_KEY in a .env file")?;

    let llm_client = AnthropicClient::new(api_key, config.model.clone(), config.base_url.clone())
        .with_timeout(Duration::from_secs(config.request_timeout_secs))?
        .with_max_retries(config.max_retries);

    info!(
        "Starting session with {} ({:?} tool syntax)",
        config.model, args.tool_syntax
    );
    let mut agent = Agent::new(Box::new(llm_client), args.tool_syntax, &config);

    let mut repl = Repl::new()?;
    repl.run(&mut agent).await
}
