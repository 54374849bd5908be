//! `factorn.toml`: storage, logging, indexer and consensus overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use factorn_types::{Amount, ConsensusParams, NetworkId};

use crate::{LogFormat, NodeError};

/// Configuration for a deadpool node. Every field has a default, so an
/// empty file is a valid regtest configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network's consensus parameters to use.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// `human` or `json`.
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Default `tracing` filter; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to run the bounty indexer.
    #[serde(default = "default_true")]
    pub enable_index: bool,

    /// Bound on chain events queued for the indexer.
    #[serde(default = "default_index_channel_capacity")]
    pub index_channel_capacity: usize,

    /// LMDB map size in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Per-field overrides of the network's deadpool parameters.
    #[serde(default)]
    pub consensus: ConsensusOverrides,
}

/// Optional replacements for [`ConsensusParams`] fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce_maturity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce_expiry: Option<u32>,
    /// Minimum announcement burn in base units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_announce_burn: Option<Amount>,
}

fn default_network() -> NetworkId {
    NetworkId::Regtest
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./factorn_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_index_channel_capacity() -> usize {
    1024
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

impl NodeConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// The network's parameters with any overrides applied.
    pub fn consensus_params(&self) -> ConsensusParams {
        let mut params = self.network.consensus_params();
        let o = &self.consensus;
        if let Some(v) = o.activation_height {
            params.activation_height = v;
        }
        if let Some(v) = o.announce_maturity {
            params.announce_maturity = v;
        }
        if let Some(v) = o.announce_expiry {
            params.announce_expiry = v;
        }
        if let Some(v) = o.min_announce_burn {
            params.min_announce_burn = v;
        }
        params
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            data_dir: default_data_dir(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_index: default_true(),
            index_channel_capacity: default_index_channel_capacity(),
            lmdb_map_size: default_lmdb_map_size(),
            consensus: ConsensusOverrides::default(),
        }
    }
}
