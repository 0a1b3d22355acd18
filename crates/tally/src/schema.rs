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

use crate::dataset::{Dataset, TemporalParser, DEFAULT_TEMPORAL_FORMATS};
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use tracing::debug;
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub min_valid_values: usize,
    pub valid_ratio: f64,
    pub temporal_formats: Vec<String>,
}
impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_valid_values: 3,
            valid_ratio: 0.5,
            temporal_formats: DEFAULT_TEMPORAL_FORMATS
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}
impl ClassifierConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.valid_ratio > 0.0 && self.valid_ratio <= 1.0) {
            return Err(ConfigError::InvalidClassifierConfig {
                field: "valid_ratio".to_string(),
                value: self.valid_ratio.to_string(),
            });
        }
        if self.temporal_formats.is_empty() {
            return Err(ConfigError::MissingRequiredConfig {
                field: "temporal_formats".to_string(),
            });
        }
        Ok(())
    }
}
/// Role sets for one dataset snapshot. `date` may overlap `categorical`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnRoles {
    pub numeric: Vec<String>,
    pub date: Vec<String>,
    pub categorical: Vec<String>,
}
impl ColumnRoles {
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric.iter().any(|c| c == column)
    }
    pub fn is_date(&self, column: &str) -> bool {
        self.date.iter().any(|c| c == column)
    }
    pub fn is_categorical(&self, column: &str) -> bool {
        self.categorical.iter().any(|c| c == column)
    }
}
#[derive(Debug, Clone)]
pub struct SchemaClassifier {
    config: ClassifierConfig,
    temporal: TemporalParser,
}
impl SchemaClassifier {
    pub fn new() -> Self {
        Self::with_config(ClassifierConfig::default())
    }
    pub fn with_config(config: ClassifierConfig) -> Self {
        let temporal = TemporalParser::new(config.temporal_formats.clone());
        Self { config, temporal }
    }
    pub fn temporal(&self) -> &TemporalParser {
        &self.temporal
    }
    /// Minimum count of valid values a column needs to take a role.
    pub fn threshold(&self, row_count: usize) -> usize {
        let share = (row_count as f64 * self.config.valid_ratio).floor() as usize;
        self.config.min_valid_values.max(share)
    }
    pub fn classify(&self, dataset: &Dataset) -> ColumnRoles {
        let threshold = self.threshold(dataset.row_count());
        let numeric: Vec<String> = dataset
            .columns
            .iter()
            .filter(|c| self.count_numeric(dataset, c) >= threshold)
            .cloned()
            .collect();
        let date: Vec<String> = dataset
            .columns
            .iter()
            .filter(|c| self.count_dates(dataset, c) >= threshold)
            .cloned()
            .collect();
        let categorical: Vec<String> = dataset
            .columns
            .iter()
            .filter(|c| !numeric.contains(c))
            .cloned()
            .collect();
        debug!(
            threshold,
            numeric = ?numeric,
            date = ?date,
            categorical = ?categorical,
            "classified dataset columns"
        );
        ColumnRoles {
            numeric,
            date,
            categorical,
        }
    }
    fn count_numeric(&self, dataset: &Dataset, column: &str) -> usize {
        dataset
            .column_values(column)
            .filter(|v| !v.is_empty() && v.as_number().is_some())
            .count()
    }
    fn count_dates(&self, dataset: &Dataset, column: &str) -> usize {
        dataset
            .column_values(column)
            .filter(|v| !v.is_empty() && self.temporal.parse(v).is_some())
            .count()
    }
}
impl Default for SchemaClassifier {
    fn default() -> Self {
        Self::new()
    }
}
