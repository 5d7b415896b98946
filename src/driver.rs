//! Network driver facade
//!
//! Composes configuration, plugin location, and invocation into two
//! operations: add a network interface to a namespace, or delete it. The
//! trait is the seam callers program against; [`PluginDriver`] is the
//! single production variant and [`FakeDriver`] is an in-memory stand-in
//! so tests never need subprocess machinery.
//!
//! Every call is one linear locate / invoke / decode sequence. The driver
//! holds no state across calls, performs no retries, and imposes no
//! serialization on concurrent invocations.

use crate::config::{NetworkConfig, RuntimeConf};
use crate::error::{NetplugError, NetplugResult};
use crate::invoke::{self, PluginCommand, PluginOutput};
use crate::types::{AttachResult, PluginError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Attach and detach operations against a named network
#[async_trait]
pub trait NetworkDriver: Send + Sync {
    /// Attach the network inside the namespace described by `rt`.
    async fn add_network(
        &self,
        net: &NetworkConfig,
        rt: &RuntimeConf,
    ) -> NetplugResult<AttachResult>;

    /// Detach the network. DEL has no success payload contract, so a zero
    /// exit means success regardless of what the plugin printed.
    async fn del_network(&self, net: &NetworkConfig, rt: &RuntimeConf) -> NetplugResult<()>;
}

/// Production driver that delegates to plugin executables
pub struct PluginDriver {
    search_path: Vec<PathBuf>,
    base_env: Vec<(String, String)>,
}

impl PluginDriver {
    /// Create a driver that hands plugins the current process environment
    /// (snapshotted here, not at invocation time) plus the protocol
    /// variables.
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self::with_base_env(search_path, std::env::vars().collect())
    }

    /// Create a driver with an explicit base environment.
    pub fn with_base_env(search_path: Vec<PathBuf>, base_env: Vec<(String, String)>) -> Self {
        Self {
            search_path,
            base_env,
        }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    async fn exec(
        &self,
        command: PluginCommand,
        net: &NetworkConfig,
        rt: &RuntimeConf,
    ) -> NetplugResult<PluginOutput> {
        let plugin_path = invoke::find_plugin(&self.search_path, &net.plugin_type).ok_or_else(
            || NetplugError::PluginNotFound {
                plugin_type: net.plugin_type.clone(),
                search_path: self.search_path.clone(),
            },
        )?;

        debug!(
            "Running {} {} for network '{}' in {}",
            plugin_path.display(),
            command.as_str(),
            net.name,
            rt.netns
        );

        let proto_env = invoke::protocol_env(command, rt, &self.search_path);
        let output = invoke::exec_plugin(&plugin_path, &net.bytes, &self.base_env, &proto_env).await?;

        if !output.status.success() {
            return Err(invoke::decode_plugin_error(
                &net.plugin_type,
                output.status,
                &output.stdout,
            ));
        }
        Ok(output)
    }
}

#[async_trait]
impl NetworkDriver for PluginDriver {
    async fn add_network(
        &self,
        net: &NetworkConfig,
        rt: &RuntimeConf,
    ) -> NetplugResult<AttachResult> {
        let output = self.exec(PluginCommand::Add, net, rt).await?;
        let result = invoke::decode_attach_result(&output.stdout)?;
        info!("Attached network '{}' ({})", net.name, net.plugin_type);
        Ok(result)
    }

    async fn del_network(&self, net: &NetworkConfig, rt: &RuntimeConf) -> NetplugResult<()> {
        self.exec(PluginCommand::Del, net, rt).await?;
        info!("Detached network '{}' ({})", net.name, net.plugin_type);
        Ok(())
    }
}

/// In-memory driver returning scripted outcomes, keyed by network name.
///
/// Networks registered with [`FakeDriver::with_result`] succeed; networks
/// registered with [`FakeDriver::with_failure`] report the given payload;
/// anything else behaves as a missing plugin.
#[derive(Default)]
pub struct FakeDriver {
    results: HashMap<String, AttachResult>,
    failures: HashMap<String, PluginError>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, name: &str, result: AttachResult) -> Self {
        self.results.insert(name.to_string(), result);
        self
    }

    pub fn with_failure(mut self, name: &str, failure: PluginError) -> Self {
        self.failures.insert(name.to_string(), failure);
        self
    }

    fn scripted_failure(&self, name: &str) -> Option<NetplugError> {
        self.failures.get(name).map(|e| NetplugError::PluginReportedError {
            code: e.code,
            msg: e.msg.clone(),
            details: e.details.clone(),
        })
    }
}

#[async_trait]
impl NetworkDriver for FakeDriver {
    async fn add_network(
        &self,
        net: &NetworkConfig,
        _rt: &RuntimeConf,
    ) -> NetplugResult<AttachResult> {
        if let Some(err) = self.scripted_failure(&net.name) {
            return Err(err);
        }
        self.results
            .get(&net.name)
            .cloned()
            .ok_or_else(|| NetplugError::PluginNotFound {
                plugin_type: net.plugin_type.clone(),
                search_path: Vec::new(),
            })
    }

    async fn del_network(&self, net: &NetworkConfig, _rt: &RuntimeConf) -> NetplugResult<()> {
        if let Some(err) = self.scripted_failure(&net.name) {
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(name: &str) -> NetworkConfig {
        NetworkConfig {
            name: name.to_string(),
            plugin_type: "bridge".to_string(),
            bytes: format!(r#"{{"name": "{}", "type": "bridge"}}"#, name).into_bytes(),
        }
    }

    fn runtime_conf() -> RuntimeConf {
        RuntimeConf {
            container_id: "ctr".to_string(),
            netns: "/var/run/netns/x".to_string(),
            ifname: "eth0".to_string(),
            args: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_fake_driver_returns_scripted_result() {
        let result = AttachResult {
            cni_version: Some("0.1.0".to_string()),
            ..Default::default()
        };
        let driver = FakeDriver::new().with_result("lan", result.clone());

        let got = driver.add_network(&network("lan"), &runtime_conf()).await.unwrap();
        assert_eq!(got, result);
        driver.del_network(&network("lan"), &runtime_conf()).await.unwrap();
    }

    #[tokio::test]
    async fn test_fake_driver_reports_scripted_failure() {
        let driver = FakeDriver::new().with_failure(
            "lan",
            PluginError {
                code: Some(11),
                msg: "bridge exists".to_string(),
                details: Some("br0 already configured".to_string()),
            },
        );

        let err = driver.add_network(&network("lan"), &runtime_conf()).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("bridge exists"));
        assert!(text.contains("br0 already configured"));

        assert!(driver.del_network(&network("lan"), &runtime_conf()).await.is_err());
    }

    #[tokio::test]
    async fn test_fake_driver_unknown_network_is_plugin_not_found() {
        let driver = FakeDriver::new();
        let err = driver.add_network(&network("lan"), &runtime_conf()).await.unwrap_err();
        assert!(matches!(err, NetplugError::PluginNotFound { .. }));
    }
}
