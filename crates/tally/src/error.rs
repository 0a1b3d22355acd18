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

use thiserror::Error;
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No data loaded. Upload a file first.")]
    NoDataLoaded,
    #[error("Question is required")]
    InvalidQuestion,
    #[error("Analysis failed: {reason}")]
    Internal { reason: String },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid classifier configuration: {field} = {value}")]
    InvalidClassifierConfig { field: String, value: String },
    #[error("Conflicting configuration options: {details}")]
    ConflictingOptions { details: String },
    #[error("Missing required configuration: {field}")]
    MissingRequiredConfig { field: String },
}
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid JSON format: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported JSON shape: {details}")]
    JsonShape { details: String },
    #[error("Unsupported data format: {format}")]
    UnsupportedFormat { format: String },
    #[error("SQLite parsing not yet implemented. Please use CSV or JSON files.")]
    SqliteNotImplemented,
    #[error("Row index out of bounds: {index} (rows: {len})")]
    RowOutOfBounds { index: usize, len: usize },
    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },
}
pub type Result<T> = std::result::Result<T, AnalysisError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type DatasetResult<T> = std::result::Result<T, DatasetError>;
impl AnalysisError {
    pub fn internal(reason: impl Into<String>) -> Self {
        AnalysisError::Internal {
            reason: reason.into(),
        }
    }
    /// Errors caused by the caller's input rather than by the analysis itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::NoDataLoaded | AnalysisError::InvalidQuestion
        )
    }
    pub fn category(&self) -> &'static str {
        match self {
            AnalysisError::NoDataLoaded => "Data",
            AnalysisError::InvalidQuestion => "Question",
            AnalysisError::Internal { .. } => "Internal",
            AnalysisError::Config(_) => "Configuration",
        }
    }
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AnalysisError::NoDataLoaded | AnalysisError::InvalidQuestion => ErrorSeverity::Warning,
            AnalysisError::Config(_) => ErrorSeverity::Error,
            AnalysisError::Internal { .. } => ErrorSeverity::Critical,
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Internal { .. } => "Failed to analyze question".to_string(),
            _ => self.to_string(),
        }
    }
}
impl DatasetError {
    pub fn user_message(&self) -> String {
        match self {
            DatasetError::Json(_) | DatasetError::JsonShape { .. } => {
                "Invalid JSON format".to_string()
            }
            _ => self.to_string(),
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}
impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_flagged() {
        assert!(AnalysisError::NoDataLoaded.is_client_error());
        assert!(AnalysisError::InvalidQuestion.is_client_error());
        assert!(!AnalysisError::internal("boom").is_client_error());
    }

    #[test]
    fn internal_error_hides_reason_from_users() {
        let err = AnalysisError::internal("row 7 exploded");
        assert_eq!(err.user_message(), "Failed to analyze question");
        assert!(err.to_string().contains("row 7 exploded"));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn no_data_message_matches_upload_hint() {
        assert_eq!(
            AnalysisError::NoDataLoaded.user_message(),
            "No data loaded. Upload a file first."
        );
        assert_eq!(AnalysisError::NoDataLoaded.category(), "Data");
    }
}
