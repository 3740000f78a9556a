//! microbiomeMASST dashboard - web front end for microbiome-restricted MASST searches
//!
//! This crate provides:
//! - A search form model with the widget bounds and defaults of the dashboard
//! - Shareable deep links encoded in the page's URL fragment
//! - Dispatch of the external MASST client as a subprocess, one directory per task
//! - Resolution of a task's HTML report from the files the client left behind
//! - Mirror plot links for a selected match
//! - REST/HTML endpoints tying it together

pub mod api;
pub mod deep_link;
pub mod dispatch;
pub mod mirror;
pub mod page;
pub mod params;
pub mod resolve;

pub use deep_link::DeepLinkState;
pub use dispatch::{Dispatcher, SearchEvent, Task, TaskId};
pub use params::SearchParameters;
pub use resolve::{ResultOutcome, ResultResolver};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading the dashboard configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Configuration for the dashboard server
#[derive(Debug, Clone, serde::Deserialize)]
pub struct DashboardConfig {
    /// Address to bind the HTTP listener to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root directory holding one subdirectory per task
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Directory with replacement no-match / error documents (None = built-in)
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// External search client settings
    #[serde(default)]
    pub client: ClientConfig,
}

fn default_bind_address() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8050 }
fn default_output_root() -> PathBuf { PathBuf::from("temp/microbemasst") }

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            output_root: default_output_root(),
            static_dir: None,
            client: ClientConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load a configuration file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Configuration for the external MASST client
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClientConfig {
    /// Interpreter or executable used to launch the client scripts
    #[serde(default = "default_program")]
    pub program: String,

    /// Working directory the client scripts are run from
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Script for single USI / library id queries
    #[serde(default = "default_single_script")]
    pub single_script: String,

    /// Script for batch queries read from an MGF file
    #[serde(default = "default_batch_script")]
    pub batch_script: String,

    /// Reference database name passed to the client
    #[serde(default = "default_database")]
    pub database: String,

    /// Seconds before a running search is killed
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,

    /// Searches allowed to run at the same time
    #[serde(default = "default_max_concurrent_searches")]
    pub max_concurrent_searches: usize,
}

fn default_program() -> String { "python".to_string() }
fn default_working_dir() -> PathBuf { PathBuf::from("microbe_masst/code") }
fn default_single_script() -> String { "masst_client.py".to_string() }
fn default_batch_script() -> String { "masst_batch_client.py".to_string() }
fn default_database() -> String { "metabolomicspanrepo_index_nightly".to_string() }
fn default_search_timeout_secs() -> u64 { 1800 }
fn default_max_concurrent_searches() -> usize { 4 }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            working_dir: default_working_dir(),
            single_script: default_single_script(),
            batch_script: default_batch_script(),
            database: default_database(),
            search_timeout_secs: default_search_timeout_secs(),
            max_concurrent_searches: default_max_concurrent_searches(),
        }
    }
}
