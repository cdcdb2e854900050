use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::oracle::OracleConfig;
use crate::screen::screen_model::DetectionConfig;
use crate::session::controller::{AutofillSettings, SessionOptions};

pub const DEFAULT_CONFIG_FILE: &str = "form-autofill.yaml";
pub const DEFAULT_STORE_FILE: &str = "form-autofill-profiles.json";
pub const API_KEY_ENV: &str = "FORM_AUTOFILL_API_KEY";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "form-autofill",
    version,
    about = "Detect forms in HTML pages and fill them from a personal profile"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: form-autofill.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Mapping oracle provider: ollama, openai, anthropic
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Oracle API endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Oracle model name
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Oracle API key (falls back to FORM_AUTOFILL_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Profile store file
    #[arg(long, global = true)]
    pub store: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the form regions detected in an HTML page
    Detect {
        /// HTML file to scan
        #[arg(long)]
        page: String,

        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print the sanitized field descriptors sent to the mapping oracle
    Describe {
        /// HTML file to scan
        #[arg(long)]
        page: String,

        /// Only describe the region at this position
        #[arg(long)]
        region: Option<usize>,
    },

    /// Fill detected regions and write the resulting HTML
    Fill {
        /// HTML file to fill
        #[arg(long)]
        page: String,

        /// Profile JSON file (categorized or legacy); default: active stored profile
        #[arg(long)]
        profile: Option<String>,

        /// Use this selector→key mapping file instead of calling the oracle
        #[arg(long)]
        mapping: Option<String>,

        /// Only fill the region at this position
        #[arg(long)]
        region: Option<usize>,

        /// Output HTML path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Manage stored profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// List stored profiles
    List,

    /// Create a profile with the default categories
    Create { name: String },

    /// Make a profile active
    Use { id: String },

    /// Delete a profile
    Delete { id: String },

    /// Set a field value on the active profile
    Set { key: String, value: String },

    /// Import a profile from an export file, a raw profile, or a flat map
    Import { file: String },

    /// Export a profile (default: the active one)
    Export {
        #[arg(long)]
        id: Option<String>,

        #[arg(short, long)]
        output: Option<String>,
    },

    /// Turn autofill on
    Enable,

    /// Turn autofill off
    Disable,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `form-autofill.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub autofill: AutofillSettings,
    #[serde(default)]
    pub detection: DetectionSection,
    #[serde(default)]
    pub fill: FillSection,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub store: StoreSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSection {
    #[serde(flatten)]
    pub rules: DetectionConfig,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self {
            rules: DetectionConfig::default(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillSection {
    #[serde(default = "default_field_delay_ms")]
    pub field_delay_ms: u64,

    #[serde(default = "default_trigger_revert_ms")]
    pub trigger_revert_ms: u64,

    /// JSONL file receiving one event per mapping entry
    pub trace_file: Option<String>,
}

impl Default for FillSection {
    fn default() -> Self {
        Self {
            field_delay_ms: default_field_delay_ms(),
            trigger_revert_ms: default_trigger_revert_ms(),
            trace_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSection {
    pub path: Option<String>,
}

// Serde default helpers
fn default_debounce_ms() -> u64 { 100 }
fn default_field_delay_ms() -> u64 { 50 }
fn default_trigger_revert_ms() -> u64 { 2000 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "malformed config, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Oracle settings: CLI > config > env > defaults.
pub fn resolve_oracle_config(cli: &Cli, config: &AppConfig) -> OracleConfig {
    let file = &config.oracle;
    OracleConfig {
        provider: cli
            .provider
            .clone()
            .unwrap_or_else(|| file.provider.clone()),
        endpoint: cli.endpoint.clone().or_else(|| file.endpoint.clone()),
        model: cli.model.clone().or_else(|| file.model.clone()),
        api_key: cli
            .api_key
            .clone()
            .or_else(|| file.api_key.clone())
            .or_else(|| std::env::var(API_KEY_ENV).ok()),
    }
}

pub fn resolve_store_path(cli: &Cli, config: &AppConfig) -> String {
    cli.store
        .clone()
        .or_else(|| config.store.path.clone())
        .unwrap_or_else(|| DEFAULT_STORE_FILE.to_string())
}

pub fn build_session_options(config: &AppConfig) -> SessionOptions {
    SessionOptions {
        settings: config.autofill.clone(),
        detection: config.detection.rules.clone(),
        debounce: Duration::from_millis(config.detection.debounce_ms),
        field_delay: Duration::from_millis(config.fill.field_delay_ms),
        revert_after: Duration::from_millis(config.fill.trigger_revert_ms),
    }
}
