//! Network configuration loading
//!
//! Network declarations live one per file in a configuration directory,
//! filtered by the `.conf` extension. Each file is JSON of the form
//! `{"name": ..., "type": ..., plugin-specific fields}`. The `type` field
//! selects the plugin binary; everything else is forwarded to the plugin
//! verbatim and never inspected here.

use crate::error::{NetplugError, NetplugResult};
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Default network configuration directory
pub const DEFAULT_CONF_DIR: &str = "/etc/cni/net.d";

const CONF_EXTENSION: &str = "conf";

/// A named network declaration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub name: String,
    /// Plugin binary name, from the declaration's "type" field
    pub plugin_type: String,
    /// Verbatim file contents, forwarded to the plugin untouched
    pub bytes: Vec<u8>,
}

/// The fields the driver itself needs from a declaration
#[derive(Debug, Deserialize)]
struct NetConfHeader {
    name: String,
    #[serde(rename = "type")]
    plugin_type: String,
}

/// Per-invocation execution context, constructed fresh by the caller
#[derive(Debug, Clone)]
pub struct RuntimeConf {
    pub container_id: String,
    /// Path identifying the target network namespace, passed through unexamined
    pub netns: String,
    /// Interface name to create inside the namespace
    pub ifname: String,
    /// Ordered KEY=VALUE pairs serialized into CNI_ARGS
    pub args: Vec<(String, String)>,
}

/// Load a single network declaration file.
pub async fn load_network_file(path: &Path) -> NetplugResult<NetworkConfig> {
    let bytes = fs::read(path).await.map_err(|e| NetplugError::ConfigReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_network(path, bytes)
}

fn parse_network(path: &Path, bytes: Vec<u8>) -> NetplugResult<NetworkConfig> {
    let header: NetConfHeader =
        serde_json::from_slice(&bytes).map_err(|e| NetplugError::ConfigParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if header.plugin_type.is_empty() {
        return Err(NetplugError::ConfigParseError {
            path: path.to_path_buf(),
            reason: "\"type\" must be non-empty".to_string(),
        });
    }

    Ok(NetworkConfig {
        name: header.name,
        plugin_type: header.plugin_type,
        bytes,
    })
}

/// Resolve a network declaration by name.
///
/// Candidate files are ordered lexicographically by filename. When two files
/// declare the same name the first one wins; the tie-break is deterministic
/// but a true duplicate usually indicates an operator mistake.
pub async fn load_network(dir: &Path, name: &str) -> NetplugResult<NetworkConfig> {
    let files = list_conf_files(dir).await?;

    for path in &files {
        let conf = load_network_file(path).await?;
        if conf.name == name {
            debug!("Loaded network '{}' from {}", name, path.display());
            return Ok(conf);
        }
    }

    Err(NetplugError::ConfigNotFound {
        name: name.to_string(),
        dir: dir.to_path_buf(),
    })
}

/// List declaration files in a directory, sorted lexicographically.
///
/// A missing directory is treated as empty.
async fn list_conf_files(dir: &Path) -> NetplugResult<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(NetplugError::ConfigReadError {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| NetplugError::ConfigReadError {
        path: dir.to_path_buf(),
        source: e,
    })? {
        let path = entry.path();
        if let Ok(file_type) = entry.file_type().await {
            if file_type.is_dir() {
                continue;
            }
        }
        if path.extension().map_or(false, |ext| ext == CONF_EXTENSION) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
