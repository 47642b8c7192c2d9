//! Persistent client settings.
//!
//! A flat string map stored as JSON at `~/.config/solana/ingl/config.json`.
//! [`InglConfig`] gives typed access to the keys the client uses.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ingl_sol::Address;

use crate::error::ClientError;

pub const PROGRAM_ID_KEY: &str = "program_id";
pub const NETWORK_KEY: &str = "network";
pub const KEYPAIR_PATH_KEY: &str = "keypair_path";

/// The program id of the public deployment
/// (`HD8kYhgqmZCJ881vyBQ3fR6a62YL7cZBnYj1P7oLw8An`).
pub const DEFAULT_PROGRAM_ID: Address = Address::new([
    0xf0, 0xd6, 0xb9, 0x71, 0xb8, 0xa8, 0x7d, 0xad, 0xc2, 0x48, 0xa6, 0xa5, 0x74, 0x40, 0x32, 0x96,
    0x25, 0xd5, 0xf7, 0x94, 0xbe, 0xe7, 0x54, 0x3f, 0x62, 0x7f, 0xf7, 0x10, 0xd5, 0x8d, 0x72, 0x13,
]);

/// Fee recipient of the Ingl team (`Team111111111111111111111111111111111111111`).
pub const TEAM_ACCOUNT: Address = Address::new([
    0x06, 0xd3, 0x98, 0x5e, 0x5d, 0xc1, 0xd9, 0x88, 0x50, 0xce, 0xce, 0x90, 0x85, 0x2d, 0x0d, 0xdb,
    0xba, 0xf7, 0x8b, 0xe5, 0xfd, 0xc4, 0x28, 0xad, 0x63, 0xfe, 0xd9, 0x00, 0x00, 0x00, 0x00, 0x00,
]);

pub const DEVNET_URL: &str = "https://api.devnet.solana.com";
pub const TESTNET_URL: &str = "https://api.testnet.solana.com";
pub const MAINNET_URL: &str = "https://api.mainnet-beta.solana.com";

pub trait ConfigStore {
    /// The stored value, or an empty string when the key is unset.
    fn get(&self, key: &str) -> String;

    fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError>;
}

/// In-memory store, for callers that do not persist settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryConfigStore {
    values: BTreeMap<String, String>,
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> String {
        self.values.get(key).cloned().unwrap_or_default()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON file store. The file is re-read on every `get` so concurrent
/// invocations observe each other's writes.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/solana/ingl/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|mut path| {
            path.extend([".config", "solana", "ingl", "config.json"]);
            path
        })
    }

    /// Store at [`Self::default_path`].
    pub fn open_default() -> Result<Self, ClientError> {
        Self::default_path()
            .map(Self::new)
            .ok_or_else(|| ClientError::Config("cannot locate the home directory".into()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> BTreeMap<String, String> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "config file not readable");
                return BTreeMap::new();
            }
        };
        match serde_json::from_str(&text) {
            Ok(values) => values,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "config file is not a string map");
                BTreeMap::new()
            }
        }
    }
}

impl ConfigStore for JsonConfigStore {
    fn get(&self, key: &str) -> String {
        self.load().remove(key).unwrap_or_default()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut values = self.load();
        values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::Config(format!("create {}: {e}", parent.display())))?;
        }
        let text = serde_json::to_string_pretty(&values)
            .map_err(|e| ClientError::Config(format!("encode config: {e}")))?;
        std::fs::write(&self.path, text)
            .map_err(|e| ClientError::Config(format!("write {}: {e}", self.path.display())))?;
        tracing::debug!(path = %self.path.display(), key, "config value written");
        Ok(())
    }
}

/// Known clusters, recognised by moniker or endpoint URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster {
    Devnet,
    Testnet,
    Mainnet,
}

impl Cluster {
    pub fn url(&self) -> &'static str {
        match self {
            Cluster::Devnet => DEVNET_URL,
            Cluster::Testnet => TESTNET_URL,
            Cluster::Mainnet => MAINNET_URL,
        }
    }

    /// Query string that points a block explorer at this cluster.
    pub fn explorer_suffix(&self) -> &'static str {
        match self {
            Cluster::Devnet => "?cluster=devnet",
            Cluster::Testnet => "?cluster=testnet",
            Cluster::Mainnet => "",
        }
    }

    pub fn from_url(url: &str) -> Option<Self> {
        [Cluster::Devnet, Cluster::Testnet, Cluster::Mainnet]
            .into_iter()
            .find(|c| c.url() == url.trim_end_matches('/'))
    }
}

impl FromStr for Cluster {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::Mainnet),
            other => Err(ClientError::Config(format!("unknown cluster {other:?}"))),
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Mainnet => "mainnet",
        })
    }
}

/// Typed view over a [`ConfigStore`].
#[derive(Debug, Clone)]
pub struct InglConfig<S> {
    store: S,
}

impl<S: ConfigStore> InglConfig<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The configured program id, or the public deployment when unset or
    /// unparsable.
    pub fn program_id(&self) -> Address {
        let raw = self.store.get(PROGRAM_ID_KEY);
        if raw.is_empty() {
            return DEFAULT_PROGRAM_ID;
        }
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!(value = %raw, "configured program id is invalid; using the default");
            DEFAULT_PROGRAM_ID
        })
    }

    pub fn set_program_id(&mut self, program_id: &Address) -> Result<(), ClientError> {
        self.store.set(PROGRAM_ID_KEY, &program_id.to_string())
    }

    /// The RPC endpoint, devnet by default.
    pub fn network(&self) -> String {
        let raw = self.store.get(NETWORK_KEY);
        if raw.is_empty() {
            DEVNET_URL.to_string()
        } else {
            raw
        }
    }

    /// Store `network`. A cluster moniker is stored as its endpoint URL,
    /// anything else verbatim.
    pub fn set_network(&mut self, network: &str) -> Result<(), ClientError> {
        let value = match network.parse::<Cluster>() {
            Ok(cluster) => cluster.url(),
            Err(_) => network,
        };
        self.store.set(NETWORK_KEY, value)
    }

    /// The cluster behind the configured endpoint, if it is a known one.
    pub fn cluster(&self) -> Option<Cluster> {
        Cluster::from_url(&self.network())
    }

    /// Default signer reference, `~/.config/solana/ingl/id.json` when unset.
    pub fn keypair_path(&self) -> String {
        let raw = self.store.get(KEYPAIR_PATH_KEY);
        if !raw.is_empty() {
            return raw;
        }
        dirs_next::home_dir()
            .map(|mut path| {
                path.extend([".config", "solana", "ingl", "id.json"]);
                path.to_string_lossy().into_owned()
            })
            .unwrap_or_default()
    }

    pub fn set_keypair_path(&mut self, path: &str) -> Result<(), ClientError> {
        self.store.set(KEYPAIR_PATH_KEY, path)
    }
}
