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

use crate::aggregate::AggregateRow;
use crate::intent::IntentPlan;
use serde::{Deserialize, Serialize};

pub const NO_DATA_SUMMARY: &str = "Não há dados suficientes para gerar um resumo.";
pub const PARETO_INSIGHT: &str =
    "Há concentração nos primeiros grupos, sugerindo curva de Pareto.";
pub const RECOMMENDATIONS: [&str; 2] = [
    "Investigue as categorias com maior volume para oportunidades de otimização.",
    "Aplique segmentações adicionais para entender padrões escondidos.",
];
const SUMMARY_ROWS: usize = 3;
const PARETO_MIN_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Narrative {
    pub summary: String,
    pub insights: Vec<String>,
    pub patterns: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NarrativeGenerator;
impl NarrativeGenerator {
    pub fn new() -> Self {
        Self
    }
    pub fn narrate(&self, plan: &IntentPlan, rows: &[AggregateRow]) -> Narrative {
        Narrative {
            summary: summarize(rows),
            insights: self.insights(plan, rows),
            patterns: Vec::new(),
            recommendations: RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
        }
    }
    fn insights(&self, plan: &IntentPlan, rows: &[AggregateRow]) -> Vec<String> {
        let mut insights = Vec::new();
        if let [top, second, ..] = rows {
            let diff = top.value.as_f64() - second.value.as_f64();
            if diff > 0.0 {
                let unit = if plan.operation.is_time_series() {
                    "ocorrências"
                } else {
                    "unidades"
                };
                insights.push(format!(
                    "{} supera {} em {} {}.",
                    top.label, second.label, diff, unit
                ));
            }
        }
        if rows.len() >= PARETO_MIN_ROWS {
            insights.push(PARETO_INSIGHT.to_string());
        }
        insights
    }
}

fn summarize(rows: &[AggregateRow]) -> String {
    if rows.is_empty() {
        return NO_DATA_SUMMARY.to_string();
    }
    let leaders: Vec<String> = rows
        .iter()
        .take(SUMMARY_ROWS)
        .map(|r| format!("{} ({})", r.label, r.value))
        .collect();
    format!("Os principais resultados são {}.", leaders.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateValue;
    use crate::intent::Operation;

    fn plan(operation: Operation) -> IntentPlan {
        IntentPlan {
            group_by: Some("cliente".into()),
            value_column: None,
            date_column: None,
            limit: 10,
            operation,
            time_unit: None,
            filter: None,
        }
    }

    fn counts(values: &[(&str, u64)]) -> Vec<AggregateRow> {
        values
            .iter()
            .map(|(l, v)| AggregateRow {
                label: l.to_string(),
                value: AggregateValue::Count(*v),
            })
            .collect()
    }

    #[test]
    fn empty_result_gets_fallback_summary() {
        let n = NarrativeGenerator::new().narrate(&plan(Operation::Count), &[]);
        assert_eq!(n.summary, NO_DATA_SUMMARY);
        assert!(n.insights.is_empty());
        assert!(n.patterns.is_empty());
        assert_eq!(n.recommendations.len(), 2);
    }

    #[test]
    fn summary_lists_top_three() {
        let rows = counts(&[("A", 5), ("B", 3), ("C", 2), ("D", 1)]);
        let n = NarrativeGenerator::new().narrate(&plan(Operation::Count), &rows);
        assert_eq!(n.summary, "Os principais resultados são A (5), B (3), C (2).");
        assert_eq!(n.insights, vec!["A supera B em 2 unidades.".to_string()]);
    }

    #[test]
    fn ties_skip_leader_insight() {
        let rows = counts(&[("A", 2), ("B", 2)]);
        let n = NarrativeGenerator::new().narrate(&plan(Operation::Count), &rows);
        assert!(n.insights.is_empty());
    }

    #[test]
    fn time_series_uses_occurrences_and_pareto() {
        let rows = counts(&[("2025-01", 9), ("2025-02", 4), ("2025-03", 1), ("2025-04", 1), ("2025-05", 1)]);
        let n = NarrativeGenerator::new().narrate(&plan(Operation::TimeSeries), &rows);
        assert_eq!(
            n.insights,
            vec![
                "2025-01 supera 2025-02 em 5 ocorrências.".to_string(),
                PARETO_INSIGHT.to_string()
            ]
        );
    }

    #[test]
    fn measures_render_fractional_gap() {
        let rows = vec![
            AggregateRow {
                label: "A".into(),
                value: AggregateValue::Measure(7.5),
            },
            AggregateRow {
                label: "B".into(),
                value: AggregateValue::Measure(5.0),
            },
        ];
        let n = NarrativeGenerator::new().narrate(&plan(Operation::Sum), &rows);
        assert_eq!(n.summary, "Os principais resultados são A (7.5), B (5).");
        assert_eq!(n.insights[0], "A supera B em 2.5 unidades.");
    }
}
