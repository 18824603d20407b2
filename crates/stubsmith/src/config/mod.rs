//! Configuration for the stub server.

mod listen;
mod scripting;

use crate::delay::{DelayDistribution, GlobalSettings};
use crate::model::ResponseDefinition;
use crate::server::StubMapping;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

pub use listen::{FilesConfig, ListenConfig};
pub use scripting::{JournalConfig, ProxyConfig, ScriptingConfig};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub files: FilesConfig,
    /// Global delay settings; replaceable at runtime via the admin API
    #[serde(default)]
    pub settings: GlobalSettings,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub scripting: ScriptingConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub stubs: Vec<StubMapping>,
}

impl Config {
    /// Load and validate configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.scripting.engine.as_str() {
            "rhai" => {}
            "javascript" | "js" => {
                if !cfg!(feature = "javascript") {
                    anyhow::bail!(
                        "Script engine 'javascript' requires the 'javascript' feature. \
                         Rebuild with --features javascript or use 'rhai'"
                    );
                }
            }
            other => anyhow::bail!(
                "Unsupported script engine: '{}'. Supported: rhai, javascript",
                other
            ),
        }

        if let Some(distribution) = &self.settings.delay_distribution {
            validate_distribution(distribution).context("Invalid global delay settings")?;
        }

        let mut seen = HashSet::new();
        for stub in &self.stubs {
            let label = stub.name.clone().unwrap_or_else(|| stub.id.to_string());
            if !seen.insert(stub.id) {
                anyhow::bail!("Duplicate stub id: {}", stub.id);
            }
            if stub.request.url.is_some() && stub.request.url_path.is_some() {
                anyhow::bail!("Stub '{}' sets both 'url' and 'urlPath'", label);
            }
            validate_response(&stub.response).with_context(|| format!("Invalid stub '{label}'"))?;
        }

        Ok(())
    }
}

fn validate_distribution(distribution: &DelayDistribution) -> Result<(), anyhow::Error> {
    distribution.validate().map_err(anyhow::Error::msg)
}

fn validate_response(response: &ResponseDefinition) -> Result<(), anyhow::Error> {
    if let Some(distribution) = &response.delay_distribution {
        validate_distribution(distribution)?;
    }
    if let Some(dribble) = &response.chunked_dribble_delay {
        if dribble.number_of_chunks == 0 {
            anyhow::bail!("chunkedDribbleDelay.numberOfChunks must be at least 1");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResponseBodySpec;
    use crate::scripting::create_evaluator;
    use std::io::Write;

    const FULL: &str = r#"
listen:
  host: 0.0.0.0
  port: 9999
files:
  root: /srv/stubs
settings:
  fixedDelay: 25
journal:
  maxEntries: 100
scripting:
  engine: rhai
  maxOperations: 50000
proxy:
  timeoutMs: 5000
stubs:
  - id: 1b4e28ba-2fa1-11d2-883f-0016d3cca427
    name: greet
    request:
      method: GET
      url: /greet
    response:
      status: 200
      body: hello
      headers:
        Content-Type: text/plain
  - request:
      urlPath: /report
    response:
      bodyFileName: report.rhai
      bodyFileIsScript: true
"#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_yaml(FULL).unwrap();

        assert_eq!(config.listen.host, "0.0.0.0");
        assert_eq!(config.listen.port, 9999);
        assert_eq!(config.files.root, Path::new("/srv/stubs"));
        assert_eq!(config.settings.fixed_delay, Some(25));
        assert_eq!(config.journal.max_entries, Some(100));
        assert!(!config.journal.disabled);
        assert_eq!(config.scripting.max_operations, 50000);
        assert_eq!(config.proxy.timeout_ms, 5000);
        assert_eq!(config.stubs.len(), 2);
        assert_eq!(config.stubs[0].name.as_deref(), Some("greet"));
        assert_eq!(
            config.stubs[1].response.body(),
            &ResponseBodySpec::Script {
                name: "report.rhai".to_string()
            }
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.listen.port, 8080);
        assert_eq!(config.listen.host, "127.0.0.1");
        assert_eq!(config.files.root, Path::new("./__files"));
        let engine = if cfg!(feature = "javascript") { "javascript" } else { "rhai" };
        assert_eq!(config.scripting.engine, engine);
        assert!(create_evaluator(&config.scripting.engine, 0).is_ok());
        assert_eq!(config.proxy.timeout_ms, 30_000);
        assert!(config.stubs.is_empty());
    }

    #[test]
    fn test_unknown_engine_is_rejected() {
        let err = Config::from_yaml("scripting:\n  engine: lua\n").unwrap_err();
        assert!(err.to_string().contains("Unsupported script engine"));
    }

    #[test]
    fn test_inverted_uniform_bounds_are_rejected() {
        let yaml = r#"
settings:
  delayDistribution:
    type: uniform
    lower: 500
    upper: 100
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_zero_chunk_dribble_is_rejected() {
        let yaml = r#"
stubs:
  - request: { url: /slow }
    response:
      body: slow
      chunkedDribbleDelay: { numberOfChunks: 0, totalDuration: 100 }
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("numberOfChunks"));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let yaml = r#"
stubs:
  - id: 1b4e28ba-2fa1-11d2-883f-0016d3cca427
    request: { url: /a }
    response: { status: 200 }
  - id: 1b4e28ba-2fa1-11d2-883f-0016d3cca427
    request: { url: /b }
    response: { status: 200 }
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate stub id"));
    }

    #[test]
    fn test_body_and_proxy_together_are_rejected() {
        let yaml = r#"
stubs:
  - request: { url: /a }
    response:
      body: local
      proxyBaseUrl: http://example.com
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"listen:\n  port: 7070\n").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.listen.port, 7070);

        assert!(Config::from_file("/definitely/not/here.yaml").is_err());
    }
}
