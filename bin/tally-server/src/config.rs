// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tally::AnalyzerConfig;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = "config/tally";
pub const ENV_PREFIX: &str = "TALLY";
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_addr: String,
    pub body_limit_bytes: usize,
    pub ping_message: String,
    pub analyzer: AnalyzerConfig,
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8080".to_string(),
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            ping_message: "ping".to_string(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

/// Layers defaults, an optional TOML file and `TALLY__*` environment variables.
pub fn load_server_config(path: Option<&Path>) -> Result<ServerConfig> {
    let file = match path {
        Some(p) => ::config::File::from(p).required(true),
        None => ::config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };
    let settings = ::config::Config::builder()
        .add_source(file)
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to read server configuration")?;
    let mut cfg: ServerConfig = settings
        .try_deserialize()
        .context("invalid server configuration")?;
    apply_process_env(&mut cfg);
    cfg.analyzer
        .validate()
        .context("invalid analyzer configuration")?;
    info!(addr = %cfg.http_addr, provider = %cfg.analyzer.provider, "server configuration loaded");
    Ok(cfg)
}

/// `PING_MESSAGE` and `OPENAI_API_KEY` are read directly from the process environment.
pub fn apply_process_env(cfg: &mut ServerConfig) {
    if let Ok(message) = std::env::var("PING_MESSAGE") {
        cfg.ping_message = message;
    }
    let key_present = std::env::var("OPENAI_API_KEY")
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false);
    if key_present {
        debug!("OPENAI_API_KEY present, tagging provider");
    }
    cfg.analyzer.apply_openai_key(key_present);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.body_limit_bytes, 50 * 1024 * 1024);
        assert_eq!(cfg.analyzer.default_limit, 10);
        assert_eq!(cfg.ping_message, "ping");
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "http_addr = \"0.0.0.0:9000\"\n[analyzer]\ndefault_limit = 5\n[analyzer.classifier]\nmin_valid_values = 2"
        )
        .unwrap();
        let cfg = load_server_config(Some(file.path())).unwrap();
        assert_eq!(cfg.http_addr, "0.0.0.0:9000");
        assert_eq!(cfg.analyzer.default_limit, 5);
        assert_eq!(cfg.analyzer.classifier.min_valid_values, 2);
        assert_eq!(cfg.analyzer.max_limit, 1000);
    }

    #[test]
    fn invalid_analyzer_section_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[analyzer]\ndefault_limit = 50\nmax_limit = 5").unwrap();
        assert!(load_server_config(Some(file.path())).is_err());
    }
}
