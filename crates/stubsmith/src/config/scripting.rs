//! Script engine, journal and proxy client configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptingConfig {
    /// "rhai" or "javascript"; javascript when that engine is compiled in
    #[serde(default = "default_engine_type")]
    pub engine: String,
    /// Rhai operation budget per evaluation (0 = unlimited)
    #[serde(default)]
    pub max_operations: u64,
}

fn default_engine_type() -> String {
    if cfg!(feature = "javascript") {
        "javascript".to_string()
    } else {
        "rhai".to_string()
    }
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            engine: default_engine_type(),
            max_operations: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalConfig {
    #[serde(default)]
    pub disabled: bool,
    /// Oldest entries are evicted past this size
    #[serde(default)]
    pub max_entries: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_proxy_timeout_ms() -> u64 {
    30_000
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_proxy_timeout_ms(),
        }
    }
}
