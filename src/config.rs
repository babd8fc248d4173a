//! mizu configuration
//!
//! Network, gas, actor keys and the collection parameters the flows submit.
//! Loaded from TOML at startup, falls back to defaults if no config file exists.
//! A file that exists but does not parse is an error, never a silent default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MizuConfig {
    pub network: NetworkConfig,
    pub gas: GasConfig,
    /// Who signs and where each actor's snapshot lives.
    pub actors: ActorsConfig,
    pub contracts: ContractsConfig,
    /// Arguments for `buy_water_cooler`.
    pub collection: CollectionConfig,
    pub mint: MintConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Sui full-node JSON-RPC endpoint.
    pub rpc_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Gas budget per transaction, in MIST.
    pub budget: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorsConfig {
    /// Publishes the package and owns the deployment snapshot.
    pub admin: ActorConfig,
    /// Runs every flow after deploy. Reads fall through to the admin snapshot.
    pub user: ActorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    pub name: String,
    /// Environment variable holding the base64 private key.
    pub key_env: String,
    pub snapshot: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// Move package directory passed to `sui move build --path`.
    pub path: PathBuf,
    pub sui_bin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub placeholder_image_url: String,
    pub supply: u64,
    /// Receives mint proceeds.
    pub treasury: String,
    /// Coin split off for `buy_water_cooler`, in MIST.
    pub cooler_price: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MintConfig {
    /// Mint price in MIST. Also the coin split off for `public_mint`.
    pub price: u64,
    pub status: u8,
    pub public_phase: u8,
    pub whitelist_phase: u8,
    /// Attribute key passed to `reveal_mint`.
    pub reveal_key: String,
}

// ============================================================
// Defaults
// ============================================================

impl Default for MizuConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            gas: GasConfig::default(),
            actors: ActorsConfig::default(),
            contracts: ContractsConfig::default(),
            collection: CollectionConfig::default(),
            mint: MintConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: mizu_chain::sui::TESTNET_URL.into(),
            timeout_secs: 60,
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            budget: mizu_chain::sui::DEFAULT_GAS_BUDGET,
        }
    }
}

impl Default for ActorsConfig {
    fn default() -> Self {
        Self {
            admin: ActorConfig {
                name: "admin".into(),
                key_env: "PRIVATE_KEY".into(),
                snapshot: "deployed_objects.json".into(),
            },
            user: ActorConfig {
                name: "user1".into(),
                key_env: "USER1_PRIVATE_KEY".into(),
                snapshot: "user_objects.json".into(),
            },
        }
    }
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self { path: "contracts".into(), sui_bin: "sui".into() }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            name: "Mizu".into(),
            description: "Mizu water cooler collection".into(),
            image_url: "https://mizu.example/cooler.png".into(),
            placeholder_image_url: "https://mizu.example/placeholder.png".into(),
            supply: 25,
            treasury: "0xa7f5dc1b23c3b8999f209186c0b4943587123b9293d84aea75a034dc2fb0d3d0".into(),
            cooler_price: 100_000_000,
        }
    }
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            price: 100_000_000,
            status: 1,
            public_phase: 3,
            whitelist_phase: 2,
            reveal_key: "image".into(),
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl MizuConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Current config as TOML (for generating a config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_secs)
    }

    /// Actor config by its configured name.
    pub fn actor(&self, name: &str) -> Option<&ActorConfig> {
        [&self.actors.admin, &self.actors.user]
            .into_iter()
            .find(|a| a.name == name)
    }
}
