//! Environment-sourced configuration: broker credentials/endpoints, the LLM
//! endpoint, the storage DSN, and the default polling/timeout values. Loaded
//! once at startup via `dotenvy` + `clap`'s `env` attribute, never read ad
//! hoc from `std::env::var` inside business logic.

use clap::Parser;

fn default_timeout_secs() -> u64 {
    10
}

/// Worker-wide configuration shared by both binaries (`run-worker`,
/// `run-streaming-worker`). Broker-specific fields are optional because a
/// deployment may only configure the brokers it actually trades.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct WorkerConfig {
    /// Postgres connection string for the Diagnostics & Status Store.
    #[arg(long, env = "FIONA_DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "FIONA_IG_API_KEY")]
    pub ig_api_key: Option<String>,
    #[arg(long, env = "FIONA_IG_IDENTIFIER")]
    pub ig_identifier: Option<String>,
    #[arg(long, env = "FIONA_IG_PASSWORD")]
    pub ig_password: Option<String>,
    #[arg(long, env = "FIONA_IG_BASE_URL", default_value = "https://demo-api.ig.com/gateway/deal")]
    pub ig_base_url: String,

    #[arg(long, env = "FIONA_MEXC_CLIENT_ID")]
    pub mexc_client_id: Option<String>,
    #[arg(long, env = "FIONA_MEXC_CLIENT_SECRET")]
    pub mexc_client_secret: Option<String>,
    #[arg(long, env = "FIONA_MEXC_REFRESH_TOKEN")]
    pub mexc_refresh_token: Option<String>,
    #[arg(long, env = "FIONA_MEXC_BASE_URL", default_value = "https://api.mexc.com")]
    pub mexc_base_url: String,

    #[arg(long, env = "FIONA_KRAKEN_API_KEY")]
    pub kraken_api_key: Option<String>,
    #[arg(long, env = "FIONA_KRAKEN_API_SECRET")]
    pub kraken_api_secret: Option<String>,
    #[arg(long, env = "FIONA_KRAKEN_BASE_URL", default_value = "https://api.kraken.com")]
    pub kraken_base_url: String,

    /// Local LLM endpoint used for the KI Orchestrator's first stage.
    #[arg(long, env = "FIONA_LOCAL_LLM_URL")]
    pub local_llm_url: Option<String>,
    /// Reflection-stage LLM endpoint (may be the same provider as above).
    #[arg(long, env = "FIONA_REFLECTION_LLM_URL")]
    pub reflection_llm_url: Option<String>,
    #[arg(long, env = "FIONA_LLM_API_KEY")]
    pub llm_api_key: Option<String>,

    /// Per-call network timeout applied to every broker and LLM request.
    #[arg(long, env = "FIONA_TIMEOUT_SECS", default_value_t = default_timeout_secs())]
    pub timeout_secs: u64,
}

impl WorkerConfig {
    /// Loads a `.env` file (if present) then parses `WorkerConfig` from the
    /// combined environment and process args.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }
}
