use crate::RunMode;

/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Dashboard
    pub dashboard_token: String,
    pub dashboard_port: u16,

    // Polling
    pub run_mode: RunMode,
    /// Missing key disables the smart-money wallet poller.
    pub dune_api_key: Option<String>,

    // Database
    pub database_url: String,

    // Strategy config file path
    pub signal_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let run_mode = match required_env("RUN_MODE").to_lowercase().as_str() {
            "live" => RunMode::Live,
            "replay" => RunMode::Replay,
            other => panic!("ERROR: RUN_MODE must be 'live' or 'replay', got: '{other}'"),
        };

        Config {
            dashboard_token: required_env("DASHBOARD_TOKEN"),
            dashboard_port: optional_env("DASHBOARD_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            run_mode,
            dune_api_key: optional_env("DUNE_API_KEY"),
            database_url: required_env("DATABASE_URL"),
            signal_config_path: optional_env("SIGNAL_CONFIG_PATH")
                .unwrap_or_else(|| "config/signals.toml".to_string()),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
