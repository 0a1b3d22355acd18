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

//! Final payload assembly: interpretation text, operation descriptor, keyed result
//! table, chart spec and the display-only pseudo-SQL.

use crate::aggregate::AggregateRow;
use crate::intent::{IntentPlan, Operation, TimeUnit};
use crate::narrative::Narrative;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

pub const CATEGORY_KEY: &str = "categoria";
pub const PERIOD_KEY: &str = "periodo";
pub const VALUE_KEY: &str = "valor";
pub const BAR_EXPLANATION: &str = "Gráfico de barras permite comparação fácil entre categorias.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    TimeSeries,
    GroupBy,
}
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    pub metric_op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_field: Option<String>,
    pub limit: usize,
}
/// Result rows rendered as objects keyed by `label_column` / `value_column`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<AggregateRow>,
    pub label_column: String,
    pub value_column: String,
}
impl ResultTable {
    pub fn new(label_column: &str, value_column: &str, rows: Vec<AggregateRow>) -> Self {
        Self {
            columns: vec![label_column.to_string(), value_column.to_string()],
            rows,
            label_column: label_column.to_string(),
            value_column: value_column.to_string(),
        }
    }
}
struct KeyedRow<'a> {
    row: &'a AggregateRow,
    label_key: &'a str,
    value_key: &'a str,
}
impl Serialize for KeyedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.label_key, &self.row.label)?;
        map.serialize_entry(self.value_key, &self.row.value)?;
        map.end()
    }
}
impl Serialize for ResultTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<KeyedRow<'_>> = self
            .rows
            .iter()
            .map(|row| KeyedRow {
                row,
                label_key: &self.label_column,
                value_key: &self.value_column,
            })
            .collect();
        let mut state = serializer.serialize_struct("ResultTable", 4)?;
        state.serialize_field("columns", &self.columns)?;
        state.serialize_field("rows", &rows)?;
        state.serialize_field("labelColumn", &self.label_column)?;
        state.serialize_field("valueColumn", &self.value_column)?;
        state.end()
    }
}
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub x_key: String,
    pub y_key: String,
    pub explanation: String,
}
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    pub interpretation: String,
    pub operation: OperationDescriptor,
    pub table: ResultTable,
    pub chart: ChartSpec,
    pub sql: String,
    pub analysis: Narrative,
    pub provider: String,
}

#[derive(Debug, Clone)]
pub struct ResponseAssembler {
    provider: String,
}
impl ResponseAssembler {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }
    pub fn assemble(
        &self,
        plan: &IntentPlan,
        rows: Vec<AggregateRow>,
        analysis: Narrative,
    ) -> AnalysisResponse {
        let time_series = plan.operation.is_time_series();
        let label_key = if time_series { PERIOD_KEY } else { CATEGORY_KEY };
        let table = ResultTable::new(label_key, VALUE_KEY, rows);
        let chart = ChartSpec {
            chart_type: if time_series {
                ChartType::Line
            } else {
                ChartType::Bar
            },
            x_key: table.label_column.clone(),
            y_key: table.value_column.clone(),
            explanation: chart_explanation(plan),
        };
        AnalysisResponse {
            interpretation: interpretation(plan),
            operation: describe_operation(plan),
            table,
            chart,
            sql: pseudo_sql(plan),
            analysis,
            provider: self.provider.clone(),
        }
    }
}
impl Default for ResponseAssembler {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PROVIDER)
    }
}

fn group_label(plan: &IntentPlan) -> &str {
    plan.group_by.as_deref().unwrap_or("")
}
fn time_unit(plan: &IntentPlan) -> TimeUnit {
    plan.time_unit.unwrap_or(TimeUnit::Month)
}

pub fn describe_operation(plan: &IntentPlan) -> OperationDescriptor {
    match plan.operation {
        Operation::TimeSeries => OperationDescriptor {
            kind: OperationKind::TimeSeries,
            group_by: None,
            metric_op: Operation::Count.as_str(),
            metric_field: None,
            limit: plan.limit,
        },
        op => OperationDescriptor {
            kind: OperationKind::GroupBy,
            group_by: plan.group_by.clone(),
            metric_op: op.as_str(),
            metric_field: match op {
                Operation::Sum | Operation::Avg => plan.value_column.clone(),
                _ => None,
            },
            limit: plan.limit,
        },
    }
}

pub fn interpretation(plan: &IntentPlan) -> String {
    let group = group_label(plan);
    let value = plan.value_column.as_deref().unwrap_or("");
    match plan.operation {
        Operation::TimeSeries => format!(
            "A pergunta foi interpretada como uma análise de tendência ao longo do tempo usando a coluna '{}'.",
            plan.date_column.as_deref().unwrap_or("")
        ),
        Operation::Sum => {
            format!("A pergunta foi interpretada como soma de '{value}' por '{group}'.")
        }
        Operation::Avg => {
            format!("A pergunta foi interpretada como média de '{value}' por '{group}'.")
        }
        Operation::Count => {
            format!("A pergunta foi interpretada como contagem de registros por '{group}'.")
        }
    }
}

fn chart_explanation(plan: &IntentPlan) -> String {
    match (plan.operation, time_unit(plan)) {
        (Operation::TimeSeries, TimeUnit::Year) => "Série temporal anual de ocorrências".to_string(),
        (Operation::TimeSeries, TimeUnit::Month) => {
            "Série temporal mensal de ocorrências".to_string()
        }
        _ => BAR_EXPLANATION.to_string(),
    }
}

/// Illustrative SQL for display. Identifiers are interpolated unescaped; never execute it.
pub fn pseudo_sql(plan: &IntentPlan) -> String {
    let group = match group_label(plan) {
        "" => "''",
        g => g,
    };
    let n = plan.limit;
    let value = plan.value_column.as_deref().unwrap_or("");
    match plan.operation {
        Operation::TimeSeries => {
            let date = plan.date_column.as_deref().unwrap_or("");
            let quoted = serde_json::to_string(date).unwrap_or_else(|_| format!("\"{date}\""));
            format!(
                "SELECT DATE_TRUNC('{}', TO_TIMESTAMP({quoted})) AS periodo, COUNT(*) AS valor FROM tabela GROUP BY 1 ORDER BY 1",
                time_unit(plan).as_str()
            )
        }
        Operation::Sum => format!(
            "SELECT {group} AS categoria, SUM({value}) AS valor FROM tabela GROUP BY {group} ORDER BY valor DESC LIMIT {n}"
        ),
        Operation::Avg => format!(
            "SELECT {group} AS categoria, AVG({value}) AS valor FROM tabela GROUP BY {group} ORDER BY valor DESC LIMIT {n}"
        ),
        Operation::Count => format!(
            "SELECT {group} AS categoria, COUNT(*) AS valor FROM tabela GROUP BY {group} ORDER BY valor DESC LIMIT {n}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateValue;
    use serde_json::json;

    fn plan(operation: Operation) -> IntentPlan {
        IntentPlan {
            group_by: Some("cliente".into()),
            value_column: Some("valor".into()),
            date_column: Some("data".into()),
            limit: 5,
            operation,
            time_unit: None,
            filter: None,
        }
    }

    #[test]
    fn count_payload_uses_categoria_keys() {
        let rows = vec![AggregateRow {
            label: "A".into(),
            value: AggregateValue::Count(2),
        }];
        let response = ResponseAssembler::default().assemble(
            &plan(Operation::Count),
            rows,
            Narrative::default(),
        );
        let v = serde_json::to_value(&response).unwrap();
        assert_eq!(v["table"]["rows"], json!([{"categoria": "A", "valor": 2}]));
        assert_eq!(v["table"]["columns"], json!(["categoria", "valor"]));
        assert_eq!(v["chart"]["type"], "bar");
        assert_eq!(v["chart"]["xKey"], "categoria");
        assert_eq!(v["operation"]["type"], "group_by");
        assert_eq!(v["operation"]["groupBy"], "cliente");
        assert_eq!(v["operation"]["metricOp"], "count");
        assert!(v["operation"].get("metricField").is_none());
        assert_eq!(v["provider"], "heuristic");
        assert_eq!(
            response.sql,
            "SELECT cliente AS categoria, COUNT(*) AS valor FROM tabela GROUP BY cliente ORDER BY valor DESC LIMIT 5"
        );
    }

    #[test]
    fn time_series_payload_is_a_line_over_periods() {
        let mut p = plan(Operation::TimeSeries);
        p.time_unit = Some(TimeUnit::Year);
        let response = ResponseAssembler::new("x").assemble(&p, Vec::new(), Narrative::default());
        let v = serde_json::to_value(&response).unwrap();
        assert_eq!(v["chart"]["type"], "line");
        assert_eq!(v["table"]["labelColumn"], "periodo");
        assert_eq!(v["operation"]["type"], "time_series");
        assert!(v["operation"].get("groupBy").is_none());
        assert_eq!(response.chart.explanation, "Série temporal anual de ocorrências");
        assert_eq!(
            response.sql,
            "SELECT DATE_TRUNC('year', TO_TIMESTAMP(\"data\")) AS periodo, COUNT(*) AS valor FROM tabela GROUP BY 1 ORDER BY 1"
        );
        assert!(response.interpretation.contains("'data'"));
    }

    #[test]
    fn sum_reports_metric_field() {
        let p = plan(Operation::Sum);
        let op = describe_operation(&p);
        assert_eq!(op.metric_op, "sum");
        assert_eq!(op.metric_field.as_deref(), Some("valor"));
        assert_eq!(
            interpretation(&p),
            "A pergunta foi interpretada como soma de 'valor' por 'cliente'."
        );
    }

    #[test]
    fn missing_group_renders_empty_literal() {
        let mut p = plan(Operation::Count);
        p.group_by = None;
        assert!(pseudo_sql(&p).starts_with("SELECT '' AS categoria"));
        assert!(interpretation(&p).ends_with("por ''."));
    }
}
