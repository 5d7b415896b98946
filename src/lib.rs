//! netplug - Container Network Plugin Driver
//!
//! Attaches and detaches network interfaces in network namespaces by
//! delegating to external plugin executables:
//! - Network declaration lookup in a configuration directory
//! - Plugin discovery along an ordered search path
//! - Exec-based invocation (environment variables, stdin declaration,
//!   stdout payload)
//! - Structured result and error payload decoding
//!
//! The driver itself configures nothing; the plugin does all namespace
//! work and reports back over the calling convention.

pub mod config;
pub mod driver;
pub mod error;
pub mod invoke;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::{load_network, load_network_file, NetworkConfig, RuntimeConf, DEFAULT_CONF_DIR};
pub use driver::{FakeDriver, NetworkDriver, PluginDriver};
pub use error::{NetplugError, NetplugResult};
pub use invoke::{find_plugin, PluginCommand};
pub use types::{AttachResult, DnsConfig, Interface, IpConfig, PluginError, Route};
