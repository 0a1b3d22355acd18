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

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const DEFAULT_VIEW_MODE: &str = "table";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub columns: Option<Value>,
    #[serde(default)]
    pub view_mode: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDesign {
    pub id: String,
    pub data: Value,
    pub columns: Value,
    pub view_mode: String,
    pub timestamp: String,
    pub created_at: String,
    pub access_count: u64,
}

/// In-memory share links keyed by a random 32-char hex id.
#[derive(Debug, Default)]
pub struct ShareStore {
    designs: HashMap<String, SharedDesign>,
}
impl ShareStore {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn create(
        &mut self,
        data: Value,
        columns: Value,
        view_mode: Option<String>,
        timestamp: Option<String>,
    ) -> SharedDesign {
        let created_at = iso_now();
        let id = loop {
            let candidate = new_share_id();
            if !self.designs.contains_key(&candidate) {
                break candidate;
            }
        };
        let design = SharedDesign {
            id: id.clone(),
            data,
            columns,
            view_mode: view_mode.unwrap_or_else(|| DEFAULT_VIEW_MODE.to_string()),
            timestamp: timestamp.unwrap_or_else(|| created_at.clone()),
            created_at,
            access_count: 0,
        };
        self.designs.insert(id, design.clone());
        design
    }
    /// Returns the design after bumping its access counter.
    pub fn open(&mut self, id: &str) -> Option<SharedDesign> {
        let design = self.designs.get_mut(id)?;
        design.access_count += 1;
        Some(design.clone())
    }
    pub fn len(&self) -> usize {
        self.designs.len()
    }
    pub fn is_empty(&self) -> bool {
        self.designs.is_empty()
    }
}

pub fn new_share_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

pub fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
