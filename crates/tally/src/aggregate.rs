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

use crate::dataset::{Dataset, TemporalParser};
use crate::intent::{EqualityFilter, IntentPlan, Operation, TimeUnit};
use chrono::{Datelike, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Metric cell: exact counts or floating sums/averages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateValue {
    Count(u64),
    Measure(f64),
}
impl AggregateValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            AggregateValue::Count(n) => *n as f64,
            AggregateValue::Measure(v) => *v,
        }
    }
}
impl fmt::Display for AggregateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateValue::Count(n) => write!(f, "{n}"),
            AggregateValue::Measure(v) => write!(f, "{v}"),
        }
    }
}
impl Serialize for AggregateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AggregateValue::Count(n) => serializer.serialize_u64(*n),
            AggregateValue::Measure(v) => serializer.serialize_f64(*v),
        }
    }
}
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub label: String,
    pub value: AggregateValue,
}
impl AggregateRow {
    fn new(label: String, value: AggregateValue) -> Self {
        Self { label, value }
    }
}

/// Executes an [`IntentPlan`] against a dataset snapshot.
#[derive(Debug, Clone, Default)]
pub struct AggregationEngine {
    temporal: TemporalParser,
}
impl AggregationEngine {
    pub fn new(temporal: TemporalParser) -> Self {
        Self { temporal }
    }
    pub fn execute(&self, dataset: &Dataset, plan: &IntentPlan) -> Vec<AggregateRow> {
        let group_key = plan.group_by.as_deref().unwrap_or("");
        let rows = match (plan.operation, plan.value_column.as_deref()) {
            (Operation::TimeSeries, _) => {
                let date_column = plan.date_column.as_deref().unwrap_or("");
                let unit = plan.time_unit.unwrap_or(TimeUnit::Month);
                return self.time_series_count(dataset, date_column, unit);
            }
            (Operation::Sum, Some(value_column)) => {
                group_by_aggregate(dataset, group_key, value_column, Operation::Sum)
            }
            (Operation::Avg, Some(value_column)) => {
                group_by_aggregate(dataset, group_key, value_column, Operation::Avg)
            }
            _ => group_by_count(dataset, group_key, plan.filter.as_ref()),
        };
        top_n(rows, plan.limit)
    }
    /// Counts rows per `YYYY` or `YYYY-MM` bucket, ascending. Unparseable dates are skipped.
    pub fn time_series_count(
        &self,
        dataset: &Dataset,
        date_column: &str,
        unit: TimeUnit,
    ) -> Vec<AggregateRow> {
        let mut buckets: IndexMap<String, u64> = IndexMap::new();
        for value in dataset.column_values(date_column) {
            let Some(dt) = self.temporal.parse(value) else {
                continue;
            };
            *buckets.entry(bucket_key(&dt, unit)).or_insert(0) += 1;
        }
        let mut rows: Vec<AggregateRow> = buckets
            .into_iter()
            .map(|(k, v)| AggregateRow::new(k, AggregateValue::Count(v)))
            .collect();
        rows.sort_by(|a, b| a.label.cmp(&b.label));
        rows
    }
}

pub fn bucket_key(dt: &NaiveDateTime, unit: TimeUnit) -> String {
    match unit {
        TimeUnit::Year => format!("{:04}", dt.year()),
        TimeUnit::Month => format!("{:04}-{:02}", dt.year(), dt.month()),
    }
}

/// Row counts per group, descending; ties keep first-seen order.
pub fn group_by_count(
    dataset: &Dataset,
    key: &str,
    filter: Option<&EqualityFilter>,
) -> Vec<AggregateRow> {
    let mut groups: IndexMap<String, u64> = IndexMap::new();
    for row in &dataset.rows {
        if let Some(f) = filter {
            if Dataset::value(row, &f.column).to_string() != f.equals {
                continue;
            }
        }
        *groups
            .entry(Dataset::value(row, key).to_string())
            .or_insert(0) += 1;
    }
    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(k, v)| AggregateRow::new(k, AggregateValue::Count(v)))
        .collect();
    rows.sort_by(|a, b| b.value.as_f64().total_cmp(&a.value.as_f64()));
    rows
}

/// Per-group sum or mean of `value_field`; non-numeric cells count as zero.
pub fn group_by_aggregate(
    dataset: &Dataset,
    key: &str,
    value_field: &str,
    op: Operation,
) -> Vec<AggregateRow> {
    let mut groups: IndexMap<String, (f64, u64)> = IndexMap::new();
    for row in &dataset.rows {
        let entry = groups
            .entry(Dataset::value(row, key).to_string())
            .or_insert((0.0, 0));
        entry.0 += Dataset::value(row, value_field).number_or_zero();
        entry.1 += 1;
    }
    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(k, (sum, count))| {
            let metric = match op {
                Operation::Avg => sum / count.max(1) as f64,
                _ => sum,
            };
            AggregateRow::new(k, AggregateValue::Measure(metric))
        })
        .collect();
    rows.sort_by(|a, b| b.value.as_f64().total_cmp(&a.value.as_f64()));
    rows
}

/// Keeps the first `n` rows without reordering.
pub fn top_n<T>(mut rows: Vec<T>, n: usize) -> Vec<T> {
    rows.truncate(n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ds(records: Vec<serde_json::Value>) -> Dataset {
        Dataset::from_json_records(None, records).unwrap()
    }

    fn labels(rows: &[AggregateRow]) -> Vec<&str> {
        rows.iter().map(|r| r.label.as_str()).collect()
    }

    #[test]
    fn count_sorts_descending_with_stable_ties() {
        let data = ds(vec![
            json!({"k": "b"}),
            json!({"k": "a"}),
            json!({"k": "c"}),
            json!({"k": "a"}),
        ]);
        let rows = group_by_count(&data, "k", None);
        assert_eq!(labels(&rows), vec!["a", "b", "c"]);
        assert_eq!(rows[0].value, AggregateValue::Count(2));
    }

    #[test]
    fn count_applies_exact_filter() {
        let data = ds(vec![
            json!({"k": "a", "p": "caneta"}),
            json!({"k": "b", "p": "Caneta"}),
            json!({"k": "a", "p": "lapis"}),
        ]);
        let filter = EqualityFilter {
            column: "p".into(),
            equals: "caneta".into(),
        };
        let rows = group_by_count(&data, "k", Some(&filter));
        assert_eq!(rows, vec![AggregateRow::new("a".into(), AggregateValue::Count(1))]);
    }

    #[test]
    fn missing_group_key_collapses_to_empty_label() {
        let data = ds(vec![json!({"v": 1}), json!({"v": 2})]);
        let rows = group_by_count(&data, "", None);
        assert_eq!(rows, vec![AggregateRow::new(String::new(), AggregateValue::Count(2))]);
    }

    #[test]
    fn sum_and_avg_treat_non_numeric_as_zero() {
        let data = ds(vec![
            json!({"k": "a", "v": 10}),
            json!({"k": "a", "v": "x"}),
            json!({"k": "b", "v": "7.5"}),
        ]);
        let sums = group_by_aggregate(&data, "k", "v", Operation::Sum);
        assert_eq!(labels(&sums), vec!["a", "b"]);
        assert_eq!(sums[0].value, AggregateValue::Measure(10.0));
        let avgs = group_by_aggregate(&data, "k", "v", Operation::Avg);
        assert_eq!(labels(&avgs), vec!["b", "a"]);
        assert_eq!(avgs[1].value, AggregateValue::Measure(5.0));
    }

    #[test]
    fn time_series_buckets_by_month_and_year() {
        let data = ds(vec![
            json!({"d": "2025-02-01"}),
            json!({"d": "2024-11-03"}),
            json!({"d": "2025-01-15"}),
            json!({"d": "nope"}),
            json!({"d": "2025-01-20"}),
        ]);
        let engine = AggregationEngine::default();
        let months = engine.time_series_count(&data, "d", TimeUnit::Month);
        assert_eq!(labels(&months), vec!["2024-11", "2025-01", "2025-02"]);
        assert_eq!(months[1].value, AggregateValue::Count(2));
        let years = engine.time_series_count(&data, "d", TimeUnit::Year);
        assert_eq!(labels(&years), vec!["2024", "2025"]);
        assert_eq!(years[1].value, AggregateValue::Count(3));
    }

    #[test]
    fn execute_truncates_grouped_results_only() {
        let data = ds(vec![
            json!({"k": "a", "d": "2025-01-01"}),
            json!({"k": "b", "d": "2025-02-01"}),
            json!({"k": "c", "d": "2025-03-01"}),
        ]);
        let engine = AggregationEngine::default();
        let mut plan = IntentPlan {
            group_by: Some("k".into()),
            value_column: None,
            date_column: Some("d".into()),
            limit: 1,
            operation: Operation::Count,
            time_unit: None,
            filter: None,
        };
        assert_eq!(engine.execute(&data, &plan).len(), 1);
        plan.operation = Operation::TimeSeries;
        plan.time_unit = Some(TimeUnit::Month);
        assert_eq!(engine.execute(&data, &plan).len(), 3);
    }

    #[test]
    fn display_keeps_integers_plain() {
        assert_eq!(AggregateValue::Count(4).to_string(), "4");
        assert_eq!(AggregateValue::Measure(2.0).to_string(), "2");
        assert_eq!(AggregateValue::Measure(2.25).to_string(), "2.25");
        assert_eq!(serde_json::to_string(&AggregateValue::Count(4)).unwrap(), "4");
    }
}
