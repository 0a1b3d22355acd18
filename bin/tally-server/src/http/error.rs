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

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tally::{AnalysisError, DatasetError};
use tracing::{error, warn};
use uuid::Uuid;

pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: String,
    #[serde(rename = "error")]
    pub message: String,
    pub request_id: String,
    #[serde(skip)]
    status: StatusCode,
}
impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &str,
        message: impl Into<String>,
        request_id: String,
    ) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            request_id,
            status,
        }
    }
    pub fn bad_request(code: &str, message: impl Into<String>, request_id: String) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message, request_id)
    }
    pub fn not_found(code: &str, message: impl Into<String>, request_id: String) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message, request_id)
    }
    pub fn status(&self) -> StatusCode {
        self.status
    }
    pub fn from_analysis_error(e: AnalysisError, request_id: String) -> Self {
        let (status, code) = match &e {
            AnalysisError::NoDataLoaded => (StatusCode::BAD_REQUEST, "NO_DATA_LOADED"),
            AnalysisError::InvalidQuestion => (StatusCode::BAD_REQUEST, "INVALID_QUESTION"),
            AnalysisError::Internal { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ANALYSIS_FAILED")
            }
            AnalysisError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
        };
        if e.is_client_error() {
            warn!(%request_id, category = e.category(), error = %e, "analysis rejected");
        } else {
            error!(%request_id, severity = e.severity().as_str(), error = %e, "analysis failed");
        }
        Self::new(status, code, e.user_message(), request_id)
    }
    pub fn from_dataset_error(e: DatasetError, request_id: String) -> Self {
        let (status, code) = match &e {
            DatasetError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            DatasetError::UnsupportedFormat { .. } => {
                (StatusCode::BAD_REQUEST, "UNSUPPORTED_FILE_TYPE")
            }
            DatasetError::SqliteNotImplemented => (StatusCode::BAD_REQUEST, "NOT_IMPLEMENTED"),
            DatasetError::RowOutOfBounds { .. } => {
                (StatusCode::BAD_REQUEST, "ROW_OUT_OF_BOUNDS")
            }
            DatasetError::ColumnNotFound { .. } => (StatusCode::BAD_REQUEST, "COLUMN_NOT_FOUND"),
            DatasetError::Csv(_) | DatasetError::Json(_) | DatasetError::JsonShape { .. } => {
                (StatusCode::BAD_REQUEST, "PARSE_ERROR")
            }
        };
        warn!(%request_id, error = %e, "dataset operation rejected");
        Self::new(status, code, e.user_message(), request_id)
    }
}
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(self);
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_errors_map_to_status_codes() {
        let e = ApiError::from_analysis_error(AnalysisError::NoDataLoaded, "r1".into());
        assert_eq!(e.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.message, "No data loaded. Upload a file first.");
        let e = ApiError::from_analysis_error(AnalysisError::internal("boom"), "r2".into());
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message, "Failed to analyze question");
    }

    #[test]
    fn body_carries_error_and_request_id() {
        let e = ApiError::bad_request("X", "nope", "abc".into());
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["error"], "nope");
        assert_eq!(v["requestId"], "abc");
        assert!(v.get("status").is_none());
    }
}
