//! Listener and file-root configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Directory holding body files and scripts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesConfig {
    #[serde(default = "default_files_root")]
    pub root: PathBuf,
}

fn default_files_root() -> PathBuf {
    PathBuf::from("./__files")
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: default_files_root(),
        }
    }
}
