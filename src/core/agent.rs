//! Agent configuration: where a machine agent finds its state store.
//!
//! Each agent keeps an `agent.conf` under `<data-dir>/agents/<tag>/`:
//!
//! ```toml
//! tag = "machine-0"
//! environment = "prod"
//! upgraded_to_version = "1.20.14"
//!
//! [state]
//! path = "/var/lib/juju/db/state.db"
//! password = "..."
//! ```

use crate::core::error::UpgradeError;
use crate::core::names::MachineTag;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default agent data directory.
pub const DEFAULT_DATA_DIR: &str = "/var/lib/juju";

const AGENTS_DIR: &str = "agents";
const CONFIG_FILE: &str = "agent.conf";

/// The `[state]` table of an agent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StateSection {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Connection parameters for the state store, as the agent logs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInfo {
    pub path: PathBuf,
    pub tag: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    pub tag: String,
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgraded_to_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<StateSection>,
}

impl AgentConfig {
    pub fn new(tag: &MachineTag, environment: &str, state: Option<StateSection>) -> Self {
        Self {
            tag: tag.to_string(),
            environment: environment.to_string(),
            upgraded_to_version: None,
            state,
        }
    }

    /// State connection info, if this agent is configured with one.
    pub fn state_info(&self) -> Option<StateInfo> {
        self.state.as_ref().map(|section| StateInfo {
            path: section.path.clone(),
            tag: self.tag.clone(),
            password: section.password.clone(),
        })
    }

    /// Name of the environment (cluster) the agent belongs to.
    pub fn environment(&self) -> &str {
        &self.environment
    }
}

/// Path of the agent configuration for `tag` under `data_dir`.
pub fn config_path(data_dir: &Path, tag: &MachineTag) -> PathBuf {
    data_dir
        .join(AGENTS_DIR)
        .join(tag.to_string())
        .join(CONFIG_FILE)
}

/// Reads and parses the agent configuration at `path`.
pub fn read_config(path: &Path) -> Result<AgentConfig, UpgradeError> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            UpgradeError::ConfigError(format!("{} does not exist", path.display()))
        }
        _ => UpgradeError::ConfigError(format!("{}: {}", path.display(), e)),
    })?;
    let config: AgentConfig = toml::from_str(&content)
        .map_err(|e| UpgradeError::ConfigError(format!("{}: {}", path.display(), e)))?;
    if config.tag.is_empty() {
        return Err(UpgradeError::ConfigError(format!(
            "{}: tag not set",
            path.display()
        )));
    }
    Ok(config)
}

/// Reads the configuration for `tag` and checks it was written for that agent.
pub fn read_agent_config(data_dir: &Path, tag: &MachineTag) -> Result<AgentConfig, UpgradeError> {
    let path = config_path(data_dir, tag);
    let config = read_config(&path)?;
    let expected = tag.to_string();
    if config.tag != expected {
        return Err(UpgradeError::ConfigError(format!(
            "{}: configured for {:?}, expected {:?}",
            path.display(),
            config.tag,
            expected
        )));
    }
    Ok(config)
}

/// Writes `config` for `tag` under `data_dir`, creating directories as needed.
pub fn write_config(
    data_dir: &Path,
    tag: &MachineTag,
    config: &AgentConfig,
) -> Result<PathBuf, UpgradeError> {
    let path = config_path(data_dir, tag);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content =
        toml::to_string(config).map_err(|e| UpgradeError::ConfigError(e.to_string()))?;
    fs::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_path_layout() {
        let tag = MachineTag::new("1/lxc/0").unwrap();
        let path = config_path(Path::new("/var/lib/juju"), &tag);
        assert_eq!(
            path,
            PathBuf::from("/var/lib/juju/agents/machine-1-lxc-0/agent.conf")
        );
    }

    #[test]
    fn test_read_config_with_state() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("agent.conf");
        fs::write(
            &path,
            "tag = \"machine-0\"\nenvironment = \"prod\"\n\n[state]\npath = \"/tmp/state.db\"\n",
        )
        .unwrap();

        let config = read_config(&path).unwrap();
        assert_eq!(config.environment(), "prod");
        let info = config.state_info().expect("state info");
        assert_eq!(info.path, PathBuf::from("/tmp/state.db"));
        assert_eq!(info.tag, "machine-0");
        assert!(info.password.is_none());
    }

    #[test]
    fn test_read_config_without_state() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("agent.conf");
        fs::write(&path, "tag = \"machine-3\"\nenvironment = \"prod\"\n").unwrap();

        let config = read_config(&path).unwrap();
        assert!(config.state_info().is_none());
    }

    #[test]
    fn test_missing_and_malformed_configs_are_config_errors() {
        let tmp = tempdir().unwrap();
        let missing = read_config(&tmp.path().join("nope.conf")).unwrap_err();
        assert!(matches!(missing, UpgradeError::ConfigError(_)));
        assert!(missing.to_string().contains("does not exist"));

        let path = tmp.path().join("agent.conf");
        fs::write(&path, "tag = [").unwrap();
        let malformed = read_config(&path).unwrap_err();
        assert!(matches!(malformed, UpgradeError::ConfigError(_)));
    }

    #[test]
    fn test_tag_mismatch_is_rejected() {
        let tmp = tempdir().unwrap();
        let tag = MachineTag::new("0").unwrap();
        let other = MachineTag::new("1").unwrap();
        let config = AgentConfig::new(&other, "prod", None);
        let written = write_config(tmp.path(), &other, &config).unwrap();
        fs::create_dir_all(config_path(tmp.path(), &tag).parent().unwrap()).unwrap();
        fs::copy(&written, config_path(tmp.path(), &tag)).unwrap();

        let err = read_agent_config(tmp.path(), &tag).unwrap_err();
        assert!(err.to_string().contains("expected \"machine-0\""));
    }
}
