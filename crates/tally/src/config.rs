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

use crate::error::{ConfigError, ConfigResult};
use crate::schema::ClassifierConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROVIDER: &str = "heuristic";
pub const OPENAI_OPTIONAL_PROVIDER: &str = "heuristic+openai-optional";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub classifier: ClassifierConfig,
    /// Informational tag echoed in every response.
    pub provider: String,
    pub entity_fallback_min_len: usize,
}
impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 1000,
            classifier: ClassifierConfig::default(),
            provider: DEFAULT_PROVIDER.to_string(),
            entity_fallback_min_len: 0,
        }
    }
}
impl AnalyzerConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.classifier.validate()?;
        if self.default_limit > self.max_limit {
            return Err(ConfigError::ConflictingOptions {
                details: format!(
                    "default_limit ({}) exceeds max_limit ({})",
                    self.default_limit, self.max_limit
                ),
            });
        }
        if self.provider.trim().is_empty() {
            return Err(ConfigError::MissingRequiredConfig {
                field: "provider".to_string(),
            });
        }
        Ok(())
    }
    /// Switches the default tag when an optional LLM key is configured. Explicit tags are kept.
    pub fn apply_openai_key(&mut self, key_present: bool) {
        if key_present && self.provider == DEFAULT_PROVIDER {
            self.provider = OPENAI_OPTIONAL_PROVIDER.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.max_limit, 1000);
    }

    #[test]
    fn rejects_default_above_max() {
        let config = AnalyzerConfig {
            default_limit: 20,
            max_limit: 5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConflictingOptions { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        let mut config = AnalyzerConfig::default();
        config.classifier.valid_ratio = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidClassifierConfig { .. })
        ));
    }

    #[test]
    fn openai_key_only_replaces_default_tag() {
        let mut config = AnalyzerConfig::default();
        config.apply_openai_key(true);
        assert_eq!(config.provider, OPENAI_OPTIONAL_PROVIDER);
        let mut custom = AnalyzerConfig {
            provider: "custom".into(),
            ..Default::default()
        };
        custom.apply_openai_key(true);
        assert_eq!(custom.provider, "custom");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AnalyzerConfig = serde_json::from_str(r#"{"default_limit": 5}"#).unwrap();
        assert_eq!(config.default_limit, 5);
        assert_eq!(config.classifier.min_valid_values, 3);
    }
}
