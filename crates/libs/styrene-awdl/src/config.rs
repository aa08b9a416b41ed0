use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::link::LinkKind;

pub const DEFAULT_MTU: usize = 65535;
pub const MIN_MTU: usize = 1280;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AwdlConfig {
    /// Link kind handed to the link layer.
    pub kind: String,
    pub mtu: usize,
    /// How often a polling link checks an idle pipe.
    pub poll_interval_ms: u64,
    pub interfaces: Vec<InterfaceConfig>,
}

/// An interface to bring up at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    pub local: String,
    pub remote: String,
    pub enabled: Option<bool>,
}

impl Default for AwdlConfig {
    fn default() -> Self {
        Self {
            kind: LinkKind::AWDL.as_str().to_owned(),
            mtu: DEFAULT_MTU,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            interfaces: Vec::new(),
        }
    }
}

impl AwdlConfig {
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }

    pub fn link_kind(&self) -> LinkKind {
        if self.kind.trim().is_empty() {
            return LinkKind::AWDL;
        }
        LinkKind::new(self.kind.trim())
    }

    pub fn effective_mtu(&self) -> usize {
        self.mtu.max(MIN_MTU)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn enabled_interfaces(&self) -> Vec<&InterfaceConfig> {
        self.interfaces.iter().filter(|iface| iface.enabled.unwrap_or(false)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AwdlConfig::from_toml("").expect("parse");
        assert_eq!(config, AwdlConfig::default());
        assert_eq!(config.link_kind(), LinkKind::AWDL);
        assert_eq!(config.effective_mtu(), DEFAULT_MTU);
        assert_eq!(config.poll_interval(), Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
    }

    #[test]
    fn parses_interfaces_and_filters_enabled() {
        let config = AwdlConfig::from_toml(
            r#"
kind = "awdl"
mtu = 512
poll_interval_ms = 0

[[interfaces]]
name = "awdl0"
local = "aa:bb"
remote = "cc:dd"
enabled = true

[[interfaces]]
name = "awdl1"
local = "aa:bb"
remote = "ee:ff"
"#,
        )
        .expect("parse");

        assert_eq!(config.interfaces.len(), 2);
        let enabled = config.enabled_interfaces();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "awdl0");
        assert_eq!(enabled[0].remote, "cc:dd");
        assert_eq!(config.effective_mtu(), MIN_MTU);
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn blank_kind_falls_back_to_awdl() {
        let config = AwdlConfig::from_toml("kind = \"  \"").expect("parse");
        assert_eq!(config.link_kind(), LinkKind::AWDL);
    }

    #[test]
    fn from_path_reports_invalid_data() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "mtu = \"large\"").expect("write");

        let err = AwdlConfig::from_path(file.path()).expect_err("bad mtu type");
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "kind = \"wifi-aware\"\nmtu = 9000").expect("write");

        let config = AwdlConfig::from_path(file.path()).expect("load");
        assert_eq!(config.link_kind().as_str(), "wifi-aware");
        assert_eq!(config.effective_mtu(), 9000);
    }
}
