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

use super::error::{new_request_id, ApiError};
use crate::share::{iso_now, ShareRequest, SharedDesign};
use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tally::dataset::records_to_json_pretty;
use tally::{AnalysisError, AnalysisResponse, DataFormat, Dataset, Row, Scalar};
use tracing::{error, info};

pub fn build_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/upload", post(upload))
        .route("/api/fetch-data", get(fetch_data))
        .route("/api/update-row", post(update_row))
        .route("/api/ai/analyze", post(analyze))
        .route("/api/export", post(export))
        .route("/api/share-design", post(share_design))
        .route("/api/shared/{share_id}", get(get_shared_design))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn ping(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "message": &*state.ping_message }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse<'a> {
    message: &'static str,
    data: &'a [Row],
    columns: &'a [String],
    row_count: usize,
    file_name: String,
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let request_id = new_request_id();
    let invalid = |e: axum::extract::multipart::MultipartError, request_id: &str| {
        ApiError::bad_request("INVALID_MULTIPART", e.body_text(), request_id.to_string())
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| invalid(e, &request_id))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let format = DataFormat::from_path(std::path::Path::new(&file_name))
            .map_err(|e| ApiError::from_dataset_error(e, request_id.clone()))?;
        let bytes = field.bytes().await.map_err(|e| invalid(e, &request_id))?;
        let dataset = Dataset::from_bytes(format, &bytes)
            .map_err(|e| ApiError::from_dataset_error(e, request_id.clone()))?;
        info!(
            %request_id,
            file = %file_name,
            rows = dataset.row_count(),
            columns = dataset.columns.len(),
            "dataset uploaded"
        );
        let response = Json(UploadResponse {
            message: "File uploaded successfully",
            data: &dataset.rows,
            columns: &dataset.columns,
            row_count: dataset.row_count(),
            file_name,
        })
        .into_response();
        state.replace_dataset(dataset).await;
        return Ok(response);
    }
    Err(ApiError::bad_request("NO_FILE", "No file uploaded", request_id))
}

async fn fetch_data(State(state): State<AppState>) -> Json<Value> {
    let dataset = state.dataset.read().await;
    Json(json!({
        "data": dataset.rows,
        "columns": dataset.columns,
        "rowCount": dataset.row_count(),
        "timestamp": iso_now(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRowRequest {
    #[serde(default)]
    pub row_index: Option<Value>,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub value: Value,
}

async fn update_row(
    State(state): State<AppState>,
    Json(req): Json<UpdateRowRequest>,
) -> Result<Json<Value>, ApiError> {
    let request_id = new_request_id();
    let (Some(index), Some(column)) = (
        req.row_index.as_ref().and_then(Value::as_i64),
        req.column.filter(|c| !c.is_empty()),
    ) else {
        return Err(ApiError::bad_request(
            "INVALID_PARAMETERS",
            "Invalid parameters",
            request_id,
        ));
    };
    let index = usize::try_from(index).map_err(|_| {
        ApiError::bad_request(
            "ROW_OUT_OF_BOUNDS",
            "Row index out of bounds",
            request_id.clone(),
        )
    })?;
    let updated_row = {
        let mut dataset = state.dataset.write().await;
        dataset
            .set_cell(index, &column, Scalar::from(req.value.clone()))
            .map_err(|e| ApiError::from_dataset_error(e, request_id.clone()))?
            .clone()
    };
    info!(%request_id, row = index, %column, "row updated");
    Ok(Json(json!({
        "message": "Row updated successfully",
        "updatedRow": updated_row,
        "rowIndex": index,
        "column": column,
        "newValue": req.value,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub question: Option<Value>,
}

async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let request_id = new_request_id();
    let question = req
        .question
        .as_ref()
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let dataset = state.snapshot().await;
    let analyzer = state.analyzer.clone();
    let outcome = tokio::task::spawn_blocking(move || analyzer.analyze(&question, &dataset)).await;
    match outcome {
        Ok(Ok(response)) => {
            info!(
                %request_id,
                operation = response.operation.metric_op,
                rows = response.table.rows.len(),
                "question analyzed"
            );
            Ok(Json(response))
        }
        Ok(Err(e)) => Err(ApiError::from_analysis_error(e, request_id)),
        Err(e) => {
            error!(%request_id, error = %e, "analysis task panicked");
            Err(ApiError::from_analysis_error(
                AnalysisError::internal(format!("Task panicked: {e}")),
                request_id,
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub columns: Option<Value>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

async fn export(
    Query(query): Query<ExportQuery>,
    Json(req): Json<ExportRequest>,
) -> Result<Response, ApiError> {
    let request_id = new_request_id();
    let (Some(data), Some(columns)) = (
        req.data.filter(|v| !v.is_null()),
        req.columns.filter(|v| !v.is_null()),
    ) else {
        return Err(ApiError::bad_request(
            "MISSING_FIELDS",
            "Data and columns are required",
            request_id,
        ));
    };
    let (Value::Array(records), Value::Array(columns)) = (data, columns) else {
        return Err(ApiError::bad_request(
            "INVALID_FIELDS",
            "Data and columns must be arrays",
            request_id,
        ));
    };
    let columns: Vec<String> = columns
        .into_iter()
        .map(|c| match c {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();
    let format = query.format.or(req.format).unwrap_or_default();
    let rows = records.len();
    let (content, mime, filename) = match format.as_str() {
        "csv" => (
            Dataset::from_json_records(Some(columns), records).and_then(|d| d.to_csv_string()),
            "text/csv",
            "data.csv",
        ),
        "json" => (
            records_to_json_pretty(&records),
            "application/json",
            "data.json",
        ),
        _ => {
            return Err(ApiError::bad_request(
                "INVALID_FORMAT",
                "Invalid format. Use csv or json",
                request_id,
            ))
        }
    };
    let content = content.map_err(|e| ApiError::from_dataset_error(e, request_id.clone()))?;
    info!(%request_id, %format, rows, "dataset exported");
    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        content,
    )
        .into_response())
}

fn share_base_url(headers: &HeaderMap) -> String {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    header_str(header::ORIGIN)
        .or_else(|| header_str(header::HOST).map(|host| format!("http://{host}")))
        .unwrap_or_default()
}

async fn share_design(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ShareRequest>,
) -> Result<Json<Value>, ApiError> {
    let request_id = new_request_id();
    let (Some(data), Some(columns)) = (
        req.data.filter(|v| !v.is_null()),
        req.columns.filter(|v| !v.is_null()),
    ) else {
        return Err(ApiError::bad_request(
            "MISSING_FIELDS",
            "Data and columns are required",
            request_id,
        ));
    };
    let design = state
        .shares
        .write()
        .await
        .create(data, columns, req.view_mode, req.timestamp);
    let share_url = format!("{}/shared/{}", share_base_url(&headers), design.id);
    info!(%request_id, share_id = %design.id, "design shared");
    Ok(Json(json!({
        "message": "Design shared successfully",
        "shareId": design.id,
        "shareUrl": share_url,
        "expiresAt": Value::Null,
        "createdAt": design.created_at,
    })))
}

#[derive(Debug, Serialize)]
struct SharedDesignView {
    #[serde(flatten)]
    design: SharedDesign,
    message: &'static str,
}

async fn get_shared_design(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
) -> Result<Json<SharedDesignView>, ApiError> {
    let request_id = new_request_id();
    let design = state.shares.write().await.open(&share_id).ok_or_else(|| {
        ApiError::not_found("SHARE_NOT_FOUND", "Shared design not found", request_id)
    })?;
    Ok(Json(SharedDesignView {
        design,
        message: "Shared design retrieved successfully",
    }))
}
