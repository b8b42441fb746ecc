use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub famtree: FamtreeConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Storage and process settings
#[derive(Debug, Clone, Deserialize)]
pub struct FamtreeConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Bounds applied to family traversals
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TraversalConfig {
    /// Deepest descendant level expanded by the tree builder (root = 0).
    #[serde(default = "default_max_tree_depth")]
    pub max_tree_depth: usize,
    /// People visited by one tree build, counted across all branches.
    #[serde(default = "default_max_tree_nodes")]
    pub max_tree_nodes: usize,
    /// Number of generations the classifier walks, founders included.
    #[serde(default = "default_generation_depth")]
    pub generation_depth: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_tree_depth: default_max_tree_depth(),
            max_tree_nodes: default_max_tree_nodes(),
            generation_depth: default_generation_depth(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_http_port(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_tree_depth() -> usize {
    64
}

fn default_max_tree_nodes() -> usize {
    10_000
}

fn default_generation_depth() -> usize {
    3
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in FAMTREE_CONFIG environment variable
    /// 2. ./config.toml in current directory
    ///
    /// A `PORT` environment variable overrides `http_server.port`.
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config_path = std::env::var("FAMTREE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config = Self::from_toml(&config_str)?;

        if let Ok(port) = std::env::var("PORT") {
            config.http_server.port = port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {}", port))?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from a TOML string without touching the environment
    pub fn from_toml(config_str: &str) -> Result<Self> {
        toml::from_str(config_str).context("Failed to parse config.toml")
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.famtree.db_path.as_os_str().is_empty() {
            anyhow::bail!("famtree.db_path must not be empty");
        }

        if self.traversal.max_tree_depth == 0 {
            anyhow::bail!("traversal.max_tree_depth must be greater than 0");
        }

        if self.traversal.max_tree_nodes == 0 {
            anyhow::bail!("traversal.max_tree_nodes must be greater than 0");
        }

        if self.traversal.generation_depth == 0 {
            anyhow::bail!("traversal.generation_depth must be greater than 0");
        }

        if self.http_server.port == 0 {
            anyhow::bail!("http_server.port must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.famtree.db_path
    }

    /// Get the directory holding the SQL migration files
    pub fn migrations_dir(&self) -> &Path {
        &self.famtree.migrations_dir
    }
}
