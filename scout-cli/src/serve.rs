use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use clap::Args;
use scout_core::{AgentConfig, InMemorySessionStore, SearchConfig, ToolAgent, ToolSet, WebSearch};
use scout_http::{start_server, ServerConfig};
use scout_llm::{LlmClient, LlmConfig};
use tracing::info;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "SCOUT_ADDRESS", default_value = "127.0.0.1:8000")]
    pub address: String,

    /// API key of the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_BASE_URL", default_value = scout_llm::client::DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    #[arg(long, env = "SCOUT_MODEL", default_value = scout_llm::client::DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    /// Tavily API key for web search
    #[arg(long, env = "TAVILY_API_KEY", hide_env_values = true)]
    pub tavily_api_key: String,

    /// Results requested per search
    #[arg(long, default_value_t = 5)]
    pub max_results: usize,

    /// Model turns allowed per run
    #[arg(long, default_value_t = 10)]
    pub max_steps: usize,

    #[arg(long, env = "SCOUT_SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    /// Refuse new conversations beyond this many threads
    #[arg(long)]
    pub max_threads: Option<usize>,

    /// Abort runs after this many seconds (0 disables)
    #[arg(long, default_value_t = 300)]
    pub run_timeout: u64,
}

pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let llm = LlmClient::new(
        LlmConfig::new(args.openai_api_key)
            .with_base_url(args.openai_base_url)
            .with_model(args.model)
            .with_temperature(Some(args.temperature)),
    )?;
    info!("Using model {}", llm.model());

    let search = WebSearch::new(SearchConfig::new(args.tavily_api_key).with_max_results(args.max_results))?;
    let store = Arc::new(InMemorySessionStore::new());

    let engine = ToolAgent::new(Arc::new(llm), ToolSet::new().with(Arc::new(search)), store.clone())
        .with_config(AgentConfig {
            max_steps: args.max_steps,
            system_prompt: args.system_prompt,
        });

    let run_timeout = (args.run_timeout > 0).then(|| Duration::from_secs(args.run_timeout));
    let config = ServerConfig::new(args.address)
        .with_max_threads(args.max_threads)
        .with_run_timeout(run_timeout);

    start_server(config, Arc::new(engine), store)
        .await
        .map_err(|e| anyhow!("server failed: {}", e))
}
