//! Plugin result and error payload schemas
//!
//! A plugin reports success by writing a JSON attachment result to stdout
//! and failure by writing a JSON error payload. Beyond decodability the
//! driver treats the result as opaque: fields it does not model are kept
//! in a flattened passthrough map and survive re-encoding.

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

/// An interface the plugin created or moved into the namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
}

/// An address assignment reported by the plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpConfig {
    /// Index into the result's interface list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<usize>,
    pub address: IpNetwork,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub dst: IpNetwork,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gw: Option<IpAddr>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nameservers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Success payload of an add operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachResult {
    #[serde(rename = "cniVersion", skip_serializing_if = "Option::is_none")]
    pub cni_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<Interface>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<IpConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsConfig>,
    /// Plugin-specific fields passed through untouched
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Failure payload of a non-zero exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}; {}", self.msg, details),
            None => write!(f, "{}", self.msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_attach_result() {
        let json = r#"{
            "cniVersion": "0.1.0",
            "ips": [
                {"address": "10.1.2.3/24", "gateway": "10.1.2.1"}
            ],
            "routes": [
                {"dst": "0.0.0.0/0", "gw": "10.1.2.1"}
            ],
            "dns": {"nameservers": ["8.8.8.8"]},
            "vendorField": {"key": "value"}
        }"#;

        let result: AttachResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.cni_version.as_deref(), Some("0.1.0"));
        assert_eq!(result.ips.len(), 1);
        assert_eq!(result.ips[0].address.to_string(), "10.1.2.3/24");
        assert_eq!(result.ips[0].gateway.unwrap().to_string(), "10.1.2.1");
        assert_eq!(result.routes[0].dst.to_string(), "0.0.0.0/0");
        assert_eq!(result.dns.as_ref().unwrap().nameservers, vec!["8.8.8.8"]);
        assert!(result.extra.contains_key("vendorField"));
    }

    #[test]
    fn test_passthrough_fields_survive_reencoding() {
        let json = r#"{"ips": [], "vendorField": 42}"#;
        let result: AttachResult = serde_json::from_str(json).unwrap();
        let reencoded = serde_json::to_string(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&reencoded).unwrap();
        assert_eq!(value["vendorField"], 42);
    }

    #[test]
    fn test_decode_plugin_error() {
        let err: PluginError = serde_json::from_str(r#"{"code": 7, "msg": "no address", "details": "pool exhausted"}"#).unwrap();
        assert_eq!(err.code, Some(7));
        assert_eq!(err.msg, "no address");
        assert_eq!(format!("{}", err), "no address; pool exhausted");

        let err: PluginError = serde_json::from_str(r#"{"msg": "no address"}"#).unwrap();
        assert_eq!(err.code, None);
        assert_eq!(format!("{}", err), "no address");
    }

    #[test]
    fn test_error_payload_without_msg_is_rejected() {
        assert!(serde_json::from_str::<PluginError>(r#"{"details": "d"}"#).is_err());
    }
}
