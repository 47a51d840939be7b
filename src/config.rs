//! Configuration for the mock server.
//!
//! Values are layered: built-in defaults, an optional YAML file, environment
//! variables, then the positional data file argument.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockServerConfig {
    /// Expected `X-API-Key` value
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Catalog JSON document (relative paths resolve against the executable's directory)
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Listen address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Latency simulation, skipped for `/ping`
    #[serde(default)]
    pub delay: DelayConfig,

    /// Reject every new purchase
    #[serde(default)]
    pub fail_purchase: bool,
}

fn default_api_key() -> String {
    "test-api-key".to_string()
}

fn default_data_file() -> PathBuf {
    PathBuf::from("examples/golf.json")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8099
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            data_file: default_data_file(),
            host: default_host(),
            port: default_port(),
            delay: DelayConfig::default(),
            fail_purchase: false,
        }
    }
}

impl MockServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(self) -> anyhow::Result<Self> {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    ///
    /// Recognised variables: `API_KEY`, `DATA_FILE`, `PORT`,
    /// `RESPONSE_DELAY_MS` and `FAIL_PURCHASE`.
    pub fn apply_lookup<F>(mut self, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup("API_KEY") {
            self.api_key = api_key;
        }
        if let Some(data_file) = lookup("DATA_FILE") {
            self.data_file = PathBuf::from(data_file);
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT {:?}: {}", port, e))?;
        }
        if let Some(delay) = lookup("RESPONSE_DELAY_MS") {
            self.delay.fixed_ms = delay
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid RESPONSE_DELAY_MS {:?}: {}", delay, e))?;
        }
        if let Some(flag) = lookup("FAIL_PURCHASE") {
            self.fail_purchase = flag.eq_ignore_ascii_case("true");
        }
        Ok(self)
    }

    /// Resolve `data_file` against `base_dir` when it is relative.
    pub fn resolve_data_file(mut self, base_dir: &Path) -> Self {
        if self.data_file.is_relative() {
            self.data_file = base_dir.join(&self.data_file);
        }
        self
    }

    /// Validate the configuration.
    ///
    /// Port 0 is allowed and binds an ephemeral port; the bound address is logged.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.delay.validate()?;
        Ok(())
    }
}

/// Directory containing the running executable, used to resolve relative data paths.
pub fn program_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("Executable {} has no parent directory", exe.display()))
}

/// Delay/latency simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayConfig {
    /// Fixed delay in milliseconds
    #[serde(default)]
    pub fixed_ms: u64,

    /// Minimum delay for random range (ms)
    #[serde(default)]
    pub min_ms: u64,

    /// Maximum delay for random range (ms)
    #[serde(default)]
    pub max_ms: u64,
}

impl DelayConfig {
    /// A fixed delay.
    pub fn fixed(ms: u64) -> Self {
        Self {
            fixed_ms: ms,
            ..Self::default()
        }
    }

    /// Calculate the actual delay to apply.
    pub fn calculate(&self) -> u64 {
        if self.fixed_ms > 0 {
            return self.fixed_ms;
        }
        if self.max_ms > self.min_ms {
            use rand::Rng;
            let mut rng = rand::thread_rng();
            return rng.gen_range(self.min_ms..=self.max_ms);
        }
        self.min_ms
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.max_ms != 0 && self.min_ms > self.max_ms {
            anyhow::bail!(
                "delay.min_ms ({}) exceeds delay.max_ms ({})",
                self.min_ms,
                self.max_ms
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MockServerConfig::default();
        assert_eq!(config.api_key, "test-api-key");
        assert_eq!(config.data_file, PathBuf::from("examples/golf.json"));
        assert_eq!(config.port, 8099);
        assert_eq!(config.delay.calculate(), 0);
        assert!(!config.fail_purchase);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = MockServerConfig::default()
            .apply_lookup(lookup_from(&[
                ("API_KEY", "secret"),
                ("DATA_FILE", "/data/catalog.json"),
                ("PORT", "9000"),
                ("RESPONSE_DELAY_MS", "250"),
                ("FAIL_PURCHASE", "TRUE"),
            ]))
            .unwrap();

        assert_eq!(config.api_key, "secret");
        assert_eq!(config.data_file, PathBuf::from("/data/catalog.json"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.delay.fixed_ms, 250);
        assert!(config.fail_purchase);
    }

    #[test]
    fn test_fail_purchase_only_true_enables() {
        for value in ["false", "1", "yes", ""] {
            let config = MockServerConfig::default()
                .apply_lookup(lookup_from(&[("FAIL_PURCHASE", value)]))
                .unwrap();
            assert!(!config.fail_purchase, "{value:?} should not enable");
        }
        let config = MockServerConfig::default()
            .apply_lookup(lookup_from(&[("FAIL_PURCHASE", "True")]))
            .unwrap();
        assert!(config.fail_purchase);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result =
            MockServerConfig::default().apply_lookup(lookup_from(&[("PORT", "not-a-port")]));
        assert!(result.is_err());

        let result =
            MockServerConfig::default().apply_lookup(lookup_from(&[("RESPONSE_DELAY_MS", "-5")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_relative_data_file() {
        let config = MockServerConfig::default().resolve_data_file(Path::new("/opt/mock"));
        assert_eq!(config.data_file, PathBuf::from("/opt/mock/examples/golf.json"));

        let mut absolute = MockServerConfig::default();
        absolute.data_file = PathBuf::from("/srv/catalog.json");
        let absolute = absolute.resolve_data_file(Path::new("/opt/mock"));
        assert_eq!(absolute.data_file, PathBuf::from("/srv/catalog.json"));
    }

    #[test]
    fn test_default_data_file_resolves_next_to_executable() {
        let dir = program_dir().unwrap();
        let config = MockServerConfig::default().resolve_data_file(&dir);
        assert_eq!(config.data_file, dir.join("examples").join("golf.json"));
    }

    #[test]
    fn test_parse_yaml_file() {
        let yaml = r#"
api_key: yaml-key
data_file: catalogs/golf.json
port: 8100
fail_purchase: true
delay:
  min_ms: 10
  max_ms: 20
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = MockServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api_key, "yaml-key");
        assert_eq!(config.port, 8100);
        assert_eq!(config.host, "0.0.0.0");
        assert!(config.fail_purchase);
        assert_eq!(config.delay.min_ms, 10);
    }

    #[test]
    fn test_env_overrides_yaml_values() {
        let config: MockServerConfig = serde_yaml::from_str("port: 8100\n").unwrap();
        let config = config
            .apply_lookup(lookup_from(&[("PORT", "8200")]))
            .unwrap();
        assert_eq!(config.port, 8200);
    }

    #[test]
    fn test_unknown_yaml_field_rejected() {
        let result: Result<MockServerConfig, _> = serde_yaml::from_str("stubs: []\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_ephemeral_port_and_empty_key_accepted() {
        let config = MockServerConfig::default()
            .apply_lookup(lookup_from(&[("PORT", "0"), ("API_KEY", "")]))
            .unwrap();
        assert_eq!(config.port, 0);
        assert!(config.api_key.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_delay_range() {
        let mut config = MockServerConfig::default();
        config.delay = DelayConfig {
            fixed_ms: 0,
            min_ms: 50,
            max_ms: 10,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_config_parses() {
        let config: MockServerConfig =
            serde_yaml::from_str(include_str!("../demos/default-config.yaml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 8099);
    }

    #[test]
    fn test_delay_calculation() {
        assert_eq!(DelayConfig::fixed(100).calculate(), 100);

        let range = DelayConfig {
            fixed_ms: 0,
            min_ms: 50,
            max_ms: 150,
        };
        let delay = range.calculate();
        assert!((50..=150).contains(&delay));

        let fixed_wins = DelayConfig {
            fixed_ms: 7,
            min_ms: 50,
            max_ms: 150,
        };
        assert_eq!(fixed_wins.calculate(), 7);
    }
}
