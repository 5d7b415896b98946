//! Plugin location and exec-based invocation
//!
//! The driver's only coupling to a plugin binary is a calling convention:
//! six `CNI_*` environment variables, the network declaration on stdin,
//! and a JSON payload on stdout interpreted by exit status. Exit zero
//! selects the result decoder, non-zero the error decoder. The plugin's
//! stderr is inherited so its diagnostics reach the operator directly.

use crate::config::RuntimeConf;
use crate::error::{NetplugError, NetplugResult};
use crate::types::{AttachResult, PluginError};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

/// Operation selected by CNI_COMMAND
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginCommand {
    Add,
    Del,
}

impl PluginCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginCommand::Add => "ADD",
            PluginCommand::Del => "DEL",
        }
    }
}

/// Raw outcome of one plugin execution
#[derive(Debug)]
pub struct PluginOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
}

/// Find the executable implementing a plugin type.
///
/// Directories are scanned in caller order; the first regular executable
/// file named exactly `plugin_type` wins and later directories are not
/// consulted.
pub fn find_plugin(search_path: &[PathBuf], plugin_type: &str) -> Option<PathBuf> {
    for dir in search_path {
        let candidate = dir.join(plugin_type);
        if let Ok(meta) = std::fs::metadata(&candidate) {
            if meta.is_file() && is_executable(&meta) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    true
}

/// Build the six protocol variables for one invocation.
pub fn protocol_env(
    command: PluginCommand,
    rt: &RuntimeConf,
    search_path: &[PathBuf],
) -> Vec<(String, String)> {
    let args = rt
        .args
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(";");
    let path = search_path
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(":");

    vec![
        ("CNI_COMMAND".to_string(), command.as_str().to_string()),
        ("CNI_CONTAINERID".to_string(), rt.container_id.clone()),
        ("CNI_NETNS".to_string(), rt.netns.clone()),
        ("CNI_IFNAME".to_string(), rt.ifname.clone()),
        ("CNI_ARGS".to_string(), args),
        ("CNI_PATH".to_string(), path),
    ]
}

/// Run a plugin binary and capture its stdout.
///
/// The subprocess environment is exactly `base_env` plus `proto_env`; the
/// base environment is an explicit parameter rather than whatever the
/// process happens to inherit. stdin receives the verbatim network
/// declaration, then EOF. The call blocks until the subprocess exits and
/// there is no timeout: a plugin that never terminates blocks the
/// invocation.
pub async fn exec_plugin(
    plugin_path: &Path,
    payload: &[u8],
    base_env: &[(String, String)],
    proto_env: &[(String, String)],
) -> NetplugResult<PluginOutput> {
    trace!("Executing {} with {} payload bytes", plugin_path.display(), payload.len());

    let mut child = Command::new(plugin_path)
        .env_clear()
        .envs(base_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .envs(proto_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| NetplugError::PluginExecError {
            plugin: plugin_path.display().to_string(),
            code: None,
            output: format!("failed to start: {}", e),
        })?;

    let mut stdin = child.stdin.take().ok_or_else(|| NetplugError::PluginExecError {
        plugin: plugin_path.display().to_string(),
        code: None,
        output: "stdin pipe unavailable".to_string(),
    })?;

    // Feed the declaration concurrently with collecting output. A plugin
    // may exit without draining stdin; the broken pipe is ignored and its
    // exit status still decides the outcome.
    let declaration = payload.to_vec();
    let writer = tokio::spawn(async move {
        let _ = stdin.write_all(&declaration).await;
        let _ = stdin.shutdown().await;
    });

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| NetplugError::PluginExecError {
            plugin: plugin_path.display().to_string(),
            code: None,
            output: format!("wait failed: {}", e),
        })?;
    let _ = writer.await;

    debug!(
        "Plugin {} exited with {} ({} stdout bytes)",
        plugin_path.display(),
        output.status,
        output.stdout.len()
    );

    Ok(PluginOutput {
        status: output.status,
        stdout: output.stdout,
    })
}

/// Decode a zero-exit invocation's stdout as an attachment result.
///
/// A plugin that reports success but produces an unparsable payload is
/// always an error, never silently ignored.
pub fn decode_attach_result(stdout: &[u8]) -> NetplugResult<AttachResult> {
    serde_json::from_slice(stdout).map_err(|e| NetplugError::ResultDecodeError {
        output: String::from_utf8_lossy(stdout).into_owned(),
        reason: e.to_string(),
    })
}

/// Decode a non-zero-exit invocation's stdout as a structured failure.
///
/// When the payload itself does not parse, the process failure is still
/// surfaced together with the raw captured text so the operator keeps the
/// full diagnostic context.
pub fn decode_plugin_error(plugin: &str, status: ExitStatus, stdout: &[u8]) -> NetplugError {
    match serde_json::from_slice::<PluginError>(stdout) {
        Ok(payload) => NetplugError::PluginReportedError {
            code: payload.code,
            msg: payload.msg,
            details: payload.details,
        },
        Err(_) => NetplugError::PluginExecError {
            plugin: plugin.to_string(),
            code: status.code(),
            output: String::from_utf8_lossy(stdout).into_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime_conf() -> RuntimeConf {
        RuntimeConf {
            container_id: "ctr-1".to_string(),
            netns: "/var/run/netns/test".to_string(),
            ifname: "eth0".to_string(),
            args: vec![
                ("K8S_POD_NAME".to_string(), "web".to_string()),
                ("IgnoreUnknown".to_string(), "1".to_string()),
            ],
        }
    }

    #[test]
    fn test_protocol_env_contents() {
        let search_path = vec![PathBuf::from("/opt/plugins"), PathBuf::from("/usr/lib/plugins")];
        let env = protocol_env(PluginCommand::Add, &runtime_conf(), &search_path);

        let get = |key: &str| {
            env.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(env.len(), 6);
        assert_eq!(get("CNI_COMMAND"), "ADD");
        assert_eq!(get("CNI_CONTAINERID"), "ctr-1");
        assert_eq!(get("CNI_NETNS"), "/var/run/netns/test");
        assert_eq!(get("CNI_IFNAME"), "eth0");
        assert_eq!(get("CNI_ARGS"), "K8S_POD_NAME=web;IgnoreUnknown=1");
        assert_eq!(get("CNI_PATH"), "/opt/plugins:/usr/lib/plugins");
    }

    #[test]
    fn test_protocol_env_del_command() {
        let env = protocol_env(PluginCommand::Del, &runtime_conf(), &[]);
        assert!(env.contains(&("CNI_COMMAND".to_string(), "DEL".to_string())));
        assert!(env.contains(&("CNI_PATH".to_string(), String::new())));
    }

    #[cfg(unix)]
    mod locator {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn write_binary(dir: &Path, name: &str, mode: u32) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, "#!/bin/sh\n").unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
            path
        }

        #[test]
        fn test_first_directory_wins() {
            let a = TempDir::new().unwrap();
            let b = TempDir::new().unwrap();
            let expected = write_binary(a.path(), "bridge", 0o755);
            write_binary(b.path(), "bridge", 0o755);

            let search_path = vec![a.path().to_path_buf(), b.path().to_path_buf()];
            assert_eq!(find_plugin(&search_path, "bridge").unwrap(), expected);
        }

        #[test]
        fn test_non_executable_is_skipped() {
            let a = TempDir::new().unwrap();
            let b = TempDir::new().unwrap();
            write_binary(a.path(), "bridge", 0o644);
            let expected = write_binary(b.path(), "bridge", 0o755);

            let search_path = vec![a.path().to_path_buf(), b.path().to_path_buf()];
            assert_eq!(find_plugin(&search_path, "bridge").unwrap(), expected);
        }

        #[test]
        fn test_missing_plugin_is_none() {
            let a = TempDir::new().unwrap();
            assert!(find_plugin(&[a.path().to_path_buf()], "bridge").is_none());
        }
    }

    #[test]
    fn test_decode_attach_result_rejects_garbage() {
        let err = decode_attach_result(b"not json at all").unwrap_err();
        match err {
            NetplugError::ResultDecodeError { output, .. } => {
                assert_eq!(output, "not json at all");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
