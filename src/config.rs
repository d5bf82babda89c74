use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// studywatch monitoring server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(
    name = "studywatch-server",
    version,
    about = "Real-time monitoring fan-out server for UX-research studies"
)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "STUDYWATCH_PORT", default_value = "8640")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "STUDYWATCH_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./studywatch.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "STUDYWATCH_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Data directory for persistent state (connection registry DB)
    #[arg(long, env = "STUDYWATCH_DATA_DIR", default_value = "./data")]
    pub data_dir: String,

    /// TTL in seconds for connection registrations (default: 86400 = 24 hours)
    #[arg(
        long,
        env = "STUDYWATCH_CONNECTION_TTL_SECS",
        default_value = "86400"
    )]
    pub connection_ttl_secs: i64,

    /// Interval in seconds between expired-registration sweeps (default: 3600 = 1 hour)
    #[arg(
        long,
        env = "STUDYWATCH_SWEEP_INTERVAL_SECS",
        default_value = "3600"
    )]
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8640,
            bind_address: "0.0.0.0".to_string(),
            config: "./studywatch.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            connection_ttl_secs: 86400,
            sweep_interval_secs: 3600,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (STUDYWATCH_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("STUDYWATCH_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# studywatch Monitoring Server Configuration
# Place this file at ./studywatch.toml or specify with --config <path>
# All settings can be overridden via environment variables (STUDYWATCH_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 8640)
# port = 8640

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite connection registry
# data_dir = "./data"

# How long a connection registration stays valid without activity.
# Registrations are refreshed on every inbound message from the connection.
# connection_ttl_secs = 86400

# Interval between background sweeps of expired registrations
# sweep_interval_secs = 3600
"#
    .to_string()
}
