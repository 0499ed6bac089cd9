//! Command-line interface for cyclestats.
//!
//! The binary validates configuration files, constructs the processing
//! stages they describe and prints the sample configuration. Metric
//! delivery is left to the embedding host.

use crate::core::config::ConfigBuilder;
use crate::core::{Config, CycleStatsError, Result};
use clap::Parser;
use std::path::PathBuf;

/// Cycle telemetry post-processing
#[derive(Parser, Debug)]
#[command(name = "cyclestats")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (default: ~/.config/cyclestats/config.yaml)
    #[arg(short, long, env = "CYCLESTATS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "CYCLESTATS_DEBUG")]
    pub debug: bool,

    /// Only validate the configuration, without constructing the stages
    #[arg(long)]
    pub check_config: bool,

    /// Print a commented sample configuration and exit
    #[arg(long)]
    pub sample_config: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        let config_path = if let Some(path) = &self.config {
            path.clone()
        } else {
            let default_path = dirs::config_dir()
                .map(|d| d.join("cyclestats").join("config.yaml"))
                .unwrap_or_else(|| PathBuf::from("~/.config/cyclestats/config.yaml"));

            if default_path.exists() {
                default_path
            } else {
                return builder.debug(self.debug).build();
            }
        };

        match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => {
                builder = builder.from_yaml(&content)?;
                tracing::info!("Loaded configuration from: {:?}", config_path);
            },
            Err(e) if self.config.is_some() => {
                return Err(CycleStatsError::config(format!(
                    "Failed to read config file {:?}: {}",
                    config_path, e
                )));
            },
            Err(_) => {
                tracing::debug!("No config file found at {:?}, using defaults", config_path);
            },
        }

        builder.debug(self.debug).build()
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self, config: Option<&Config>) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let configured = config.map_or("info", |c| c.logging.level.as_str());
        let env_log_level =
            std::env::var("CYCLESTATS_LOG_LEVEL").unwrap_or_else(|_| configured.to_string());
        let log_level = if self.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let structured = config.is_some_and(|c| c.logging.structured);
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(structured)
            .with_line_number(structured)
            .with_writer(std::io::stderr)
            .compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| CycleStatsError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Render a validated configuration for the terminal
pub fn summary(config: &Config) -> String {
    let mut out = String::from("Configuration is valid!\n");
    out.push_str(&format!("  Grouping patterns: {}\n", config.grouping.group_by.join(", ")));
    out.push_str(&format!("  Control measurement: {}\n", config.grouping.control_measurement));
    match config.grouping.max_group_age {
        Some(age) => out.push_str(&format!("  Max group age: {:?}\n", age)),
        None => out.push_str("  Max group age: unbounded\n"),
    }
    out.push_str("  Required fields:\n");
    for (measurement, fields) in &config.grouping.required_fields {
        out.push_str(&format!("    {} ({}): {}\n", measurement, fields.len(), fields.join(", ")));
    }
    if config.metadata.enabled {
        let tags: Vec<&str> = config.metadata.portal_tags.iter().map(|t| t.as_str()).collect();
        out.push_str(&format!(
            "  Metadata: {} (tags: {})\n",
            config.metadata.api_url,
            tags.join(", ")
        ));
    } else {
        out.push_str("  Metadata: disabled\n");
    }
    if config.min.enabled {
        out.push_str(&format!("  Min aggregator: every {:?}\n", config.min.period));
    } else {
        out.push_str("  Min aggregator: disabled\n");
    }
    out
}

/// Execute the command line.
pub async fn execute(cli: Cli) -> Result<()> {
    if cli.sample_config {
        print!("{}", Config::sample());
        return Ok(());
    }

    let config = cli.load_config().await?;
    cli.init_logging(Some(&config))?;

    // Build every stage once so construction errors surface as well
    if !cli.check_config {
        crate::pipeline::Pipeline::from_config(&config)?;
        tracing::debug!("All processing stages constructed");
    }

    print!("{}", summary(&config));
    Ok(())
}
