//! Error types for netplug

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum NetplugError {
    /// IO error
    Io(io::Error),
    /// No network configuration matched the requested name
    ConfigNotFound { name: String, dir: PathBuf },
    /// Reading a configuration file or directory failed
    ConfigReadError { path: PathBuf, source: io::Error },
    /// A configuration file is not a valid network declaration
    ConfigParseError { path: PathBuf, reason: String },
    /// No directory on the search path contains an executable for the plugin type
    PluginNotFound { plugin_type: String, search_path: Vec<PathBuf> },
    /// The plugin could not be started, or failed without a parsable payload
    PluginExecError { plugin: String, code: Option<i32>, output: String },
    /// The plugin exited non-zero with a well-formed error payload
    PluginReportedError { code: Option<i64>, msg: String, details: Option<String> },
    /// The plugin reported success but its output did not decode
    ResultDecodeError { output: String, reason: String },
    /// Invalid parameter
    InvalidParameter(String),
}

impl fmt::Display for NetplugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetplugError::Io(e) => write!(f, "IO error: {}", e),
            NetplugError::ConfigNotFound { name, dir } => {
                write!(f, "no net configuration with name \"{}\" in {}", name, dir.display())
            }
            NetplugError::ConfigReadError { path, source } => {
                write!(f, "error reading {}: {}", path.display(), source)
            }
            NetplugError::ConfigParseError { path, reason } => {
                write!(f, "error parsing {}: {}", path.display(), reason)
            }
            NetplugError::PluginNotFound { plugin_type, search_path } => {
                let dirs: Vec<String> = search_path.iter().map(|p| p.display().to_string()).collect();
                write!(f, "could not find plugin \"{}\" in [{}]", plugin_type, dirs.join(", "))
            }
            NetplugError::PluginExecError { plugin, code, output } => {
                if let Some(code) = code {
                    write!(f, "plugin \"{}\" failed with code {}: {}", plugin, code, output)
                } else {
                    write!(f, "plugin \"{}\" failed: {}", plugin, output)
                }
            }
            NetplugError::PluginReportedError { msg, details, .. } => {
                if let Some(details) = details {
                    write!(f, "{}; {}", msg, details)
                } else {
                    write!(f, "{}", msg)
                }
            }
            NetplugError::ResultDecodeError { output, reason } => {
                write!(f, "plugin reported success but its output \"{}\" did not decode: {}", output, reason)
            }
            NetplugError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for NetplugError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetplugError::Io(e) => Some(e),
            NetplugError::ConfigReadError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for NetplugError {
    fn from(error: io::Error) -> Self {
        NetplugError::Io(error)
    }
}

pub type NetplugResult<T> = Result<T, NetplugError>;
