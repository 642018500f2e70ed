//! Wire types exchanged with the plugin caller.

use std::io::Write;
use std::path::Path;

use nsloop_common::constants::{
    DEFAULT_CNI_VERSION, LOOPBACK_DEVICE, LOOPBACK_IPV4_CIDR, SUPPORTED_CNI_VERSIONS,
};
use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// The parts of the network configuration the plugin looks at.
///
/// Parsing is lenient: input that is not a JSON object yields the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetConf {
    /// Requested protocol version.
    pub cni_version: Option<String>,
    /// Network name.
    pub name: Option<String>,
    /// Plugin type.
    #[serde(rename = "type")]
    pub plugin_type: Option<String>,
}

impl NetConf {
    /// Parses the configuration from raw stdin bytes, ignoring anything
    /// that is not a JSON object.
    #[must_use]
    pub fn parse_lenient(input: &[u8]) -> Self {
        serde_json::from_slice(input).unwrap_or_default()
    }

    /// Returns the protocol version to answer with.
    pub fn version(&self) -> &str {
        self.cni_version.as_deref().unwrap_or(DEFAULT_CNI_VERSION)
    }

    /// Returns `true` if the requested version is one we speak.
    pub fn version_supported(&self) -> bool {
        SUPPORTED_CNI_VERSIONS.contains(&self.version())
    }
}

/// An interface entry in an ADD result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    /// Device name.
    pub name: String,
    /// Namespace path the device lives in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
}

/// An address entry in an ADD result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpConfig {
    /// Address family, `"4"` or `"6"`. Only emitted for results older than 1.0.0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Address in CIDR notation.
    pub address: String,
    /// Index into the result's `interfaces`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<usize>,
}

/// Successful ADD result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddResult {
    /// Protocol version of this result.
    pub cni_version: String,
    /// Interfaces the plugin configured.
    pub interfaces: Vec<Interface>,
    /// Addresses on those interfaces.
    pub ips: Vec<IpConfig>,
}

impl AddResult {
    /// Describes a loopback device brought up in `netns`.
    #[must_use]
    pub fn loopback(cni_version: &str, netns: &Path) -> Self {
        Self {
            cni_version: cni_version.to_string(),
            interfaces: vec![Interface {
                name: LOOPBACK_DEVICE.to_string(),
                sandbox: Some(netns.display().to_string()),
            }],
            ips: vec![IpConfig {
                version: cni_version.starts_with("0.").then(|| "4".to_string()),
                address: LOOPBACK_IPV4_CIDR.to_string(),
                interface: Some(0),
            }],
        }
    }
}

/// VERSION result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResult {
    /// Protocol version of this result.
    pub cni_version: String,
    /// Versions the plugin can speak.
    pub supported_versions: Vec<String>,
}

impl VersionResult {
    /// Lists [`SUPPORTED_CNI_VERSIONS`].
    #[must_use]
    pub fn supported(cni_version: &str) -> Self {
        Self {
            cni_version: cni_version.to_string(),
            supported_versions: SUPPORTED_CNI_VERSIONS
                .iter()
                .map(|v| (*v).to_string())
                .collect(),
        }
    }
}

/// Error object written to stdout on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResult {
    /// Protocol version of this result.
    pub cni_version: String,
    /// Protocol error code.
    pub code: u32,
    /// Short message.
    pub msg: String,
    /// Longer explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResult {
    /// Builds the error object for `err`.
    #[must_use]
    pub fn from_error(cni_version: &str, err: &PluginError) -> Self {
        Self {
            cni_version: cni_version.to_string(),
            code: err.code(),
            msg: err.to_string(),
            details: err.details(),
        }
    }

    /// Writes the error object as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to(&self, out: impl Write) -> serde_json::Result<()> {
        serde_json::to_writer(out, self)
    }
}

/// What a successful command prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// ADD prints the configured interfaces.
    Add(AddResult),
    /// VERSION prints the supported versions.
    Version(VersionResult),
    /// DEL and CHECK print nothing.
    Empty,
}

impl Reply {
    /// Writes the reply as JSON; [`Reply::Empty`] writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to(&self, out: impl Write) -> serde_json::Result<()> {
        match self {
            Self::Add(result) => serde_json::to_writer(out, result),
            Self::Version(result) => serde_json::to_writer(out, result),
            Self::Empty => Ok(()),
        }
    }
}
