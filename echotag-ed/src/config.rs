//! Service configuration
//!
//! Resolution order for every setting:
//! 1. Command-line argument
//! 2. Environment variable (`ECHOTAG_*`)
//! 3. `echotag-ed.toml`
//! 4. Compiled default

use clap::Parser;
use echotag_common::config::{load_toml_config, locate_config_file};
use echotag_common::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classifier::{DEFAULT_MODEL_NAME, DEFAULT_SAMPLE_RATE};
use crate::services::StageTimeouts;

/// Config file name searched in the user and system config directories
pub const CONFIG_FILE_NAME: &str = "echotag-ed.toml";

/// Environment variable holding an explicit config file path
pub const CONFIG_ENV_VAR: &str = "ECHOTAG_CONFIG";

/// Environment variable holding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "ECHOTAG_ROOT_FOLDER";

/// Command-line arguments for echotag-ed
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "echotag-ed")]
#[command(about = "Audio event detection service")]
#[command(version)]
pub struct Args {
    /// Path to echotag-ed.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Folder holding the service database
    #[arg(short, long)]
    pub root_folder: Option<String>,

    /// Address to listen on (host:port)
    #[arg(long, env = "ECHOTAG_BIND_ADDR")]
    pub bind_addr: Option<String>,

    /// Inference endpoint URL
    #[arg(long, env = "ECHOTAG_CLASSIFIER_ENDPOINT")]
    pub classifier_endpoint: Option<String>,

    /// Model config.json holding the id2label table
    #[arg(long, env = "ECHOTAG_LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    /// Root directory for the local storage backend
    #[arg(long, env = "ECHOTAG_STORAGE_ROOT")]
    pub storage_root: Option<PathBuf>,

    /// Object store endpoint; selects the http storage backend
    #[arg(long, env = "ECHOTAG_STORAGE_ENDPOINT")]
    pub storage_endpoint: Option<String>,

    /// Object store bucket
    #[arg(long, env = "ECHOTAG_STORAGE_BUCKET")]
    pub storage_bucket: Option<String>,

    /// Bearer token for the object store
    #[arg(long, env = "ECHOTAG_STORAGE_TOKEN", hide_env_values = true)]
    pub storage_token: Option<String>,
}

/// Contents of `echotag-ed.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub root_folder: Option<String>,
    pub server: ServerConfig,
    pub classifier: ClassifierConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Largest accepted upload body
    pub max_upload_mb: usize,
    /// Progress events buffered for slow SSE clients
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8018".to_string(),
            max_upload_mb: 100,
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Inference endpoint; without one the service starts with no model loaded
    pub endpoint: Option<String>,
    pub model_name: String,
    pub labels_path: Option<PathBuf>,
    pub sample_rate: u32,
    pub request_timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            labels_path: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Http,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Local backend: directory batch paths are relative to
    pub root: PathBuf,
    /// Http backend: object store base URL
    pub endpoint: Option<String>,
    pub bucket: String,
    pub token: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            root: PathBuf::from("."),
            endpoint: None,
            bucket: "watchme-vault".to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fetch_timeout_secs: u64,
    pub decode_timeout_secs: u64,
    pub classify_timeout_secs: u64,
    pub persist_timeout_secs: u64,
    /// Longest a write retries on "database is locked"
    pub db_max_lock_wait_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 60,
            decode_timeout_secs: 120,
            classify_timeout_secs: 30,
            persist_timeout_secs: 30,
            db_max_lock_wait_ms: 5000,
        }
    }
}

impl PipelineConfig {
    pub fn stage_timeouts(&self) -> StageTimeouts {
        StageTimeouts {
            fetch: Duration::from_secs(self.fetch_timeout_secs),
            decode: Duration::from_secs(self.decode_timeout_secs),
            classify: Duration::from_secs(self.classify_timeout_secs),
            persist: Duration::from_secs(self.persist_timeout_secs),
        }
    }
}

impl ServiceConfig {
    /// Locate and load the TOML file, then apply environment and CLI overrides
    ///
    /// Clap has already folded the `ECHOTAG_*` variables into `args`, with
    /// command-line values taking precedence.
    pub fn load(args: &Args) -> Result<Self> {
        let path = locate_config_file(args.config.as_deref(), CONFIG_ENV_VAR, CONFIG_FILE_NAME);
        match &path {
            Some(p) => tracing::info!(path = %p.display(), "Loading configuration"),
            None => tracing::info!("No configuration file found, using defaults"),
        }

        let mut config: ServiceConfig = load_toml_config(path.as_deref())?;
        config.apply_overrides(args);
        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &Args) {
        if let Some(bind_addr) = &args.bind_addr {
            self.server.bind_addr = bind_addr.clone();
        }
        if let Some(endpoint) = &args.classifier_endpoint {
            self.classifier.endpoint = Some(endpoint.clone());
        }
        if let Some(labels_path) = &args.labels_path {
            self.classifier.labels_path = Some(labels_path.clone());
        }
        if let Some(root) = &args.storage_root {
            self.storage.root = root.clone();
        }
        if let Some(endpoint) = &args.storage_endpoint {
            self.storage.endpoint = Some(endpoint.clone());
            self.storage.backend = StorageBackend::Http;
        }
        if let Some(bucket) = &args.storage_bucket {
            self.storage.bucket = bucket.clone();
        }
        if let Some(token) = &args.storage_token {
            self.storage.token = Some(token.clone());
        }
    }

    /// Root folder after CLI → env → TOML → OS default resolution
    pub fn resolve_root_folder(&self, args: &Args) -> PathBuf {
        echotag_common::config::resolve_root_folder(
            args.root_folder.as_deref(),
            ROOT_FOLDER_ENV_VAR,
            self.root_folder.as_deref(),
        )
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn labels_path(&self) -> Option<&Path> {
        self.classifier.labels_path.as_deref()
    }
}
