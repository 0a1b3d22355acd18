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

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod error;
pub mod intent;
pub mod narrative;
pub mod response;
pub mod schema;
pub mod synonyms;

pub use aggregate::{AggregateRow, AggregateValue, AggregationEngine};
pub use config::{AnalyzerConfig, DEFAULT_PROVIDER, OPENAI_OPTIONAL_PROVIDER};
pub use dataset::{DataFormat, Dataset, Row, Scalar, TemporalParser};
pub use error::{
    AnalysisError, ConfigError, DatasetError, DatasetResult, ErrorSeverity, Result,
};
pub use intent::{EqualityFilter, IntentDetector, IntentPlan, Operation, TimeUnit};
pub use narrative::{Narrative, NarrativeGenerator};
pub use response::{AnalysisResponse, ChartSpec, OperationDescriptor, ResponseAssembler, ResultTable};
pub use schema::{ClassifierConfig, ColumnRoles, SchemaClassifier};
pub use synonyms::{ColumnGuesses, SemanticKey, SynonymResolver};

use std::panic::{self, AssertUnwindSafe};
use tracing::info;

/// Question-to-answer pipeline over one dataset snapshot.
#[derive(Debug, Clone)]
pub struct Analyzer {
    classifier: SchemaClassifier,
    resolver: SynonymResolver,
    detector: IntentDetector,
    engine: AggregationEngine,
    narrator: NarrativeGenerator,
    assembler: ResponseAssembler,
}
impl Analyzer {
    pub fn new() -> Self {
        Self::build(AnalyzerConfig::default())
    }
    pub fn with_config(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }
    fn build(config: AnalyzerConfig) -> Self {
        let classifier = SchemaClassifier::with_config(config.classifier);
        let engine = AggregationEngine::new(classifier.temporal().clone());
        Self {
            classifier,
            resolver: SynonymResolver {
                fallback_min_len: config.entity_fallback_min_len,
            },
            detector: IntentDetector::new(config.default_limit, config.max_limit),
            engine,
            narrator: NarrativeGenerator::new(),
            assembler: ResponseAssembler::new(config.provider),
        }
    }
    /// Answers `question` against `dataset`. Never mutates the dataset.
    pub fn analyze(&self, question: &str, dataset: &Dataset) -> Result<AnalysisResponse> {
        if dataset.is_empty() {
            return Err(AnalysisError::NoDataLoaded);
        }
        if question.is_empty() {
            return Err(AnalysisError::InvalidQuestion);
        }
        let response = panic::catch_unwind(AssertUnwindSafe(|| self.run(question, dataset)))
            .map_err(|payload| AnalysisError::internal(panic_reason(payload.as_ref())))?;
        info!(
            operation = response.operation.metric_op,
            rows = response.table.rows.len(),
            "analysis completed"
        );
        Ok(response)
    }
    fn run(&self, question: &str, dataset: &Dataset) -> AnalysisResponse {
        let roles = self.classifier.classify(dataset);
        let guesses = self.resolver.resolve(question, &dataset.columns);
        let plan = self.detector.detect(question, dataset, &roles, &guesses);
        let rows = self.engine.execute(dataset, &plan);
        let narrative = self.narrator.narrate(&plan, &rows);
        self.assembler.assemble(&plan, rows, narrative)
    }
}
impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot analysis with default settings.
pub fn analyze(question: &str, dataset: &Dataset) -> Result<AnalysisResponse> {
    Analyzer::new().analyze(question, dataset)
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
