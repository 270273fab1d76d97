use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

use crate::bundle::MODEL_FILE_NAME;
use crate::http::PredictRequest;

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_LOG_FILTER: &str = "price_server=info,tower_http=info";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            model_path: default_model_path(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// `best_model.json` in the directory holding the running executable.
pub fn default_model_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(MODEL_FILE_NAME)
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Reads `CONFIG_PATH` (if set) and applies environment overrides.
    pub fn from_env() -> Result<Self> {
        let base = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `HOST`, `PORT`, `MODEL_PATH` and `RUST_LOG` from `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value '{}'", port))?;
        }
        if let Some(path) = lookup("MODEL_PATH") {
            self.model_path = PathBuf::from(path);
        }
        if let Some(filter) = lookup("RUST_LOG") {
            self.log_filter = filter;
        }
        Ok(self)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    #[serde(default)]
    pub warmup: WarmupConfig,
    pub scenarios: Vec<ScenarioConfig>,
    /// Request bodies to cycle through; a built-in set is used when empty.
    #[serde(default)]
    pub payloads: Vec<PredictRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmupConfig {
    pub enabled: bool,
    pub num_requests: usize,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_requests: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub concurrency: usize,
    pub num_requests: usize,
    #[serde(default)]
    pub description: String,
}

impl BenchmarkConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BenchmarkConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:10000");
        assert!(config.model_path.ends_with(MODEL_FILE_NAME));
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::default()
            .with_overrides(lookup(&[
                ("PORT", "8080"),
                ("MODEL_PATH", "/models/house.json"),
                ("RUST_LOG", "debug"),
            ]))
            .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.model_path, PathBuf::from("/models/house.json"));
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_invalid_port() {
        let err = ServerConfig::default()
            .with_overrides(lookup(&[("PORT", "ten thousand")]))
            .unwrap_err();
        assert!(err.to_string().contains("Invalid PORT"));
    }

    #[test]
    fn test_load_yaml_with_partial_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: 9000\nmodel_path: /srv/best_model.json").unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_benchmark_config() {
        let yaml = r#"
scenarios:
  - name: single
    concurrency: 1
    num_requests: 100
  - name: parallel
    concurrency: 8
    num_requests: 1000
    description: eight workers
payloads:
  - "Size (sqm)": 120.0
    Location: Suburb
"#;
        let config: BenchmarkConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.warmup.enabled);
        assert_eq!(config.scenarios.len(), 2);
        assert_eq!(config.scenarios[1].concurrency, 8);
        assert_eq!(config.payloads[0].size_sqm, Some(120.0));
        assert_eq!(config.payloads[0].location.as_deref(), Some("Suburb"));
    }
}
