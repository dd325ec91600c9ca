//! Saving and loading networks as RON files

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::network::Network;
use crate::snapshot::{NetworkSnapshot, SnapshotError};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize network")]
    Serialize(#[from] ron::Error),

    #[error("failed to parse network snapshot")]
    Deserialize(#[from] ron::error::SpannedError),

    #[error("invalid network snapshot")]
    Snapshot(#[from] SnapshotError),
}

pub fn to_ron_string(network: &Network) -> Result<String, PersistenceError> {
    let ron = ron::ser::to_string_pretty(&network.snapshot(), ron::ser::PrettyConfig::default())?;
    Ok(ron)
}

pub fn from_ron_str(source: &str) -> Result<Network, PersistenceError> {
    let snapshot: NetworkSnapshot = ron::from_str(source)?;
    Ok(Network::from_snapshot(&snapshot)?)
}

/// Write the network's snapshot to `path`
pub fn save_network(path: impl AsRef<Path>, network: &Network) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    let ron = to_ron_string(network)?;
    std::fs::write(path, ron).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Saved network {} to {}", network.summary(), path.display());
    Ok(())
}

pub fn load_network(path: impl AsRef<Path>) -> Result<Network, PersistenceError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let network = from_ron_str(&contents)?;
    log::info!("Loaded network {} from {}", network.summary(), path.display());
    Ok(network)
}
