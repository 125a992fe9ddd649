use serde::{Deserialize, Serialize};

/// Lease agent configuration file (YAML).
///
/// Example `agent-config.yaml`:
/// ```yaml
/// node-name: worker-1
/// data-dir: /var/lib/nodelease/data
/// lease-duration-seconds: 40
/// node-status-update-frequency-seconds: 10
/// register-node: true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfigFile {
    #[serde(default, alias = "node-name")]
    pub node_name: Option<String>,
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
    #[serde(default, alias = "lease-duration-seconds")]
    pub lease_duration_seconds: Option<i32>,
    #[serde(default, alias = "node-status-update-frequency-seconds")]
    pub node_status_update_frequency_seconds: Option<u64>,
    #[serde(default, alias = "register-node")]
    pub register_node: Option<bool>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}
