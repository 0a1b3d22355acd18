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

//! HTTP surface and CLI plumbing around the `tally` analysis core.

pub mod config;
pub mod http;
pub mod share;
pub mod state;

pub use state::AppState;

use anyhow::{Context, Result};
use std::path::Path;
use tally::{Analyzer, Dataset};

/// Loads a CSV/JSON file and answers one question, returning pretty JSON.
pub fn ask(analyzer: &Analyzer, file: &Path, question: &str) -> Result<String> {
    let dataset = Dataset::from_path(file)
        .with_context(|| format!("failed to load dataset from {}", file.display()))?;
    let response = analyzer.analyze(question, &dataset)?;
    Ok(serde_json::to_string_pretty(&response)?)
}
