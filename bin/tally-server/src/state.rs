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

use crate::config::ServerConfig;
use crate::share::ShareStore;
use std::sync::Arc;
use tally::{Analyzer, Dataset};
use tokio::sync::RwLock;

/// Shared handler state. The active dataset is replaced wholesale on upload.
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<RwLock<Dataset>>,
    pub shares: Arc<RwLock<ShareStore>>,
    pub analyzer: Arc<Analyzer>,
    pub ping_message: Arc<str>,
}
impl AppState {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            dataset: Arc::new(RwLock::new(Dataset::default())),
            shares: Arc::new(RwLock::new(ShareStore::new())),
            analyzer: Arc::new(analyzer),
            ping_message: Arc::from("ping"),
        }
    }
    pub fn from_config(cfg: &ServerConfig) -> tally::Result<Self> {
        let analyzer = Analyzer::with_config(cfg.analyzer.clone())?;
        Ok(Self {
            ping_message: Arc::from(cfg.ping_message.as_str()),
            ..Self::new(analyzer)
        })
    }
    pub fn with_dataset(self, dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(RwLock::new(dataset)),
            ..self
        }
    }
    /// Clones the active dataset so analysis never holds the lock.
    pub async fn snapshot(&self) -> Dataset {
        self.dataset.read().await.clone()
    }
    pub async fn replace_dataset(&self, dataset: Dataset) {
        *self.dataset.write().await = dataset;
    }
}
