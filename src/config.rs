use clap::Parser;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// "duckdb" or "postgres"
    pub backend: String,
    pub connection_string: String,
    pub pool_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "remote" or "ollama"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub backend: String, // "remote" or "ollama"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RagConfig {
    pub examples_path: String,
    pub index_path: String,
    pub top_k: usize,
    pub similarity_threshold: f32,
}

/// Every analytics policy constant lives here rather than at the call sites.
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Stock cover below this many days is "Critical".
    pub critical_days: f64,
    /// Below this, "Warning".
    pub warning_days: f64,
    /// Below this, "Healthy".
    pub healthy_days: f64,
    /// At or above this, "Overstock". Cover between healthy_days and
    /// overstock_days is labelled "Good" - the gap is intentional.
    pub overstock_days: f64,
    /// Restock recommendations top inventory up to this many days of cover.
    pub target_cover_days: f64,
    /// Overstock reduction is measured against this many days of cover.
    pub overstock_target_days: f64,
    /// Trailing window for average daily sales.
    pub sales_period_days: u32,
    /// Trailing window for turnover calculations.
    pub turnover_period_days: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Rows of a result table persisted per chat message.
    pub persist_row_cap: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub analytics: AnalyticsConfig,
    pub session: SessionConfig,
    pub data_dir: String,
    pub schema_path: String,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory for data storage
    #[arg(long)]
    pub data_dir: Option<String>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config_builder = Config::builder();
        let mut have_file = false;

        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
            have_file = true;
        } else {
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/stocksense/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    have_file = true;
                    break;
                }
            }
        }

        let mut config: AppConfig = if have_file {
            config_builder.build()?.try_deserialize()?
        } else {
            AppConfig::default()
        };

        // Command line args win over the file
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }
        if let Some(data_dir) = &args.data_dir {
            config.data_dir = data_dir.clone();
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                backend: "duckdb".to_string(),
                connection_string: "data/inventory.duckdb".to_string(),
                pool_size: 5,
            },
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            llm: LlmConfig {
                backend: "ollama".to_string(),
                model: "llama3".to_string(),
                api_key: None,
                api_url: None,
            },
            embedding: EmbeddingConfig {
                backend: "ollama".to_string(),
                model: "nomic-embed-text".to_string(),
                api_key: None,
                api_url: None,
            },
            rag: RagConfig {
                examples_path: "data/examples.jsonl".to_string(),
                index_path: "data/examples_index.json".to_string(),
                top_k: 3,
                similarity_threshold: 0.3,
            },
            analytics: AnalyticsConfig::default(),
            session: SessionConfig {
                persist_row_cap: 500,
            },
            data_dir: "data".to_string(),
            schema_path: "data/schema.yaml".to_string(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            critical_days: 15.0,
            warning_days: 30.0,
            healthy_days: 60.0,
            overstock_days: 90.0,
            target_cover_days: 45.0,
            overstock_target_days: 60.0,
            sales_period_days: 30,
            turnover_period_days: 90,
        }
    }
}
