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

use crate::dataset::Dataset;
use crate::schema::ColumnRoles;
use crate::synonyms::{normalize, ColumnGuesses};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TREND_KEYWORDS: &[&str] = &[
    "tendencia",
    "evolucao",
    "por mes",
    "mensal",
    "anual",
    "por ano",
    "timeline",
    "ao longo",
    "mes a mes",
    "year over year",
];
pub const SUM_KEYWORDS: &[&str] = &[
    "somar",
    "soma",
    "faturamento",
    "receita",
    "valor total",
    "totalizado",
];
pub const AVG_KEYWORDS: &[&str] = &["media", "avg"];
pub const TOP_KEYWORDS: &[&str] = &["top", "maiores", "principais"];
/// Matched as plain substrings, so "anos" also selects yearly buckets.
pub const YEAR_KEYWORDS: &[&str] = &["ano", "year", "anual"];
pub const FILTER_PREPOSITIONS: &[&str] = &["de", "do", "da"];

fn word_alternation(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

lazy_static! {
    static ref TOP_N_REGEX: Regex =
        Regex::new(&format!(r"\b(?:{})\s*([0-9]{{1,3}})", word_alternation(TOP_KEYWORDS))).unwrap();
    static ref ANY_N_REGEX: Regex = Regex::new(r"\b([0-9]{1,3})\b").unwrap();
    static ref TREND_REGEX: Regex =
        Regex::new(&format!(r"\b(?:{})\b", word_alternation(TREND_KEYWORDS))).unwrap();
    static ref SUM_REGEX: Regex =
        Regex::new(&format!(r"\b(?:{})\b", word_alternation(SUM_KEYWORDS))).unwrap();
    static ref AVG_REGEX: Regex =
        Regex::new(&format!(r"\b(?:{})\b", word_alternation(AVG_KEYWORDS))).unwrap();
    static ref PREPOSITION_REGEX: Regex =
        Regex::new(&format!(r"\b(?:{})\b", word_alternation(FILTER_PREPOSITIONS))).unwrap();
    static ref TOKEN_SPLIT_REGEX: Regex = Regex::new(r"[\s?.,!;:]+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Count,
    Sum,
    Avg,
    TimeSeries,
}
impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Count => "count",
            Operation::Sum => "sum",
            Operation::Avg => "avg",
            Operation::TimeSeries => "time_series",
        }
    }
    pub fn is_time_series(&self) -> bool {
        matches!(self, Operation::TimeSeries)
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Year,
    Month,
}
impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Year => "year",
            TimeUnit::Month => "month",
        }
    }
}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualityFilter {
    pub column: String,
    pub equals: String,
}
/// Fully resolved interpretation of one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentPlan {
    pub group_by: Option<String>,
    pub value_column: Option<String>,
    pub date_column: Option<String>,
    pub limit: usize,
    pub operation: Operation,
    pub time_unit: Option<TimeUnit>,
    pub filter: Option<EqualityFilter>,
}
#[derive(Debug, Clone, Copy)]
pub struct IntentDetector {
    default_limit: usize,
    max_limit: usize,
}
impl IntentDetector {
    pub fn new(default_limit: usize, max_limit: usize) -> Self {
        Self {
            default_limit,
            max_limit,
        }
    }
    pub fn detect(
        &self,
        question: &str,
        dataset: &Dataset,
        roles: &ColumnRoles,
        guesses: &ColumnGuesses,
    ) -> IntentPlan {
        let q = normalize(question);
        let limit = self.guess_limit(&q);
        let group_by = guesses
            .entity
            .clone()
            .or_else(|| guesses.category.clone())
            .or_else(|| roles.categorical.first().cloned());
        if group_by.is_none() {
            debug!("no group column resolved, rows fall into a single bucket");
        }
        let value_column = guesses
            .value
            .clone()
            .filter(|v| roles.is_numeric(v))
            .or_else(|| roles.numeric.first().cloned());

        if TREND_REGEX.is_match(&q) {
            if let Some(date_column) = guesses
                .date
                .clone()
                .filter(|d| roles.is_date(d))
                .or_else(|| roles.date.first().cloned())
            {
                let unit = if YEAR_KEYWORDS.iter().any(|k| q.contains(k)) {
                    TimeUnit::Year
                } else {
                    TimeUnit::Month
                };
                let plan = IntentPlan {
                    group_by,
                    value_column,
                    date_column: Some(date_column),
                    limit,
                    operation: Operation::TimeSeries,
                    time_unit: Some(unit),
                    filter: None,
                };
                debug!(plan = ?plan, "detected time series intent");
                return plan;
            }
            debug!("trend requested but no date column available");
        }

        let operation = match value_column {
            Some(_) if SUM_REGEX.is_match(&q) => Operation::Sum,
            Some(_) if AVG_REGEX.is_match(&q) => Operation::Avg,
            _ => Operation::Count,
        };
        let filter = if operation == Operation::Count {
            extract_filter(&q, dataset, roles)
        } else {
            None
        };
        let plan = IntentPlan {
            group_by,
            value_column,
            date_column: None,
            limit,
            operation,
            time_unit: None,
            filter,
        };
        debug!(plan = ?plan, "detected aggregation intent");
        plan
    }
    /// "top N" first, then any standalone 1-3 digit number, then the default.
    fn guess_limit(&self, q: &str) -> usize {
        let parsed = TOP_N_REGEX
            .captures(q)
            .or_else(|| ANY_N_REGEX.captures(q))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<usize>().ok());
        parsed.unwrap_or(self.default_limit).min(self.max_limit)
    }
}
impl Default for IntentDetector {
    fn default() -> Self {
        Self::new(10, 1000)
    }
}

/// Equality filter from the word after the last "de"/"do"/"da".
fn extract_filter(q: &str, dataset: &Dataset, roles: &ColumnRoles) -> Option<EqualityFilter> {
    let spaced = FILTER_PREPOSITIONS
        .iter()
        .any(|p| q.contains(&format!(" {p} ")));
    if !spaced {
        return None;
    }
    let tail_start = PREPOSITION_REGEX.find_iter(q).last()?.end();
    let token = TOKEN_SPLIT_REGEX
        .split(q[tail_start..].trim())
        .find(|t| !t.is_empty())?;
    let column = roles.categorical.iter().find(|c| {
        dataset
            .column_values(c)
            .any(|v| v.to_string().to_lowercase() == token)
    })?;
    Some(EqualityFilter {
        column: column.clone(),
        equals: token.to_string(),
    })
}
