/// Configuration management using figment
///
/// Loads configuration with this precedence (highest wins):
/// 1. Defaults (hardcoded)
/// 2. TOML file: veritext.toml (in working directory)
/// 3. Environment variables: PORT, ONTOLOGY_DIR, CORS_ORIGINS
/// 4. Environment variables: prefixed VERITEXT_ (e.g., VERITEXT_LOG_LEVEL=debug)

use figment::{
    Figment,
    providers::{Env, Format, Toml, Serialized},
};
use serde::{Deserialize, Serialize};
use crate::errors::VeritextError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Port the HTTP server binds to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory searched for `<name>.json` ontology overrides
    #[serde(default = "default_ontology_dir")]
    pub ontology_dir: String,

    /// Comma-separated list of allowed CORS origins; `*` allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_ontology_dir() -> String {
    "./ontologies".to_string()
}

fn default_cors_origins() -> String {
    "*".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: default_log_level(),
            port: default_port(),
            ontology_dir: default_ontology_dir(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, TOML file, and environment variables
    ///
    /// The bare PORT / ONTOLOGY_DIR / CORS_ORIGINS env vars are checked first
    /// (deployment convention), then VERITEXT_-prefixed vars, then
    /// veritext.toml.
    pub fn load() -> Result<Config, VeritextError> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file("veritext.toml"))
            .merge(Env::raw().only(&["PORT", "ONTOLOGY_DIR", "CORS_ORIGINS"]))
            .merge(Env::prefixed("VERITEXT_"))
            .extract()
            .map_err(|e| VeritextError::Config(format!("Failed to load config: {}", e)))
    }
}
