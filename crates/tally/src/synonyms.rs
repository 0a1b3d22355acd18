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

//! Maps question words to columns through a fixed multilingual synonym table.

use serde::Serialize;
use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercases and strips diacritics: "Evolução Mês" becomes "evolucao mes".
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SemanticKey {
    Entity,
    Product,
    Category,
    Date,
    Value,
    Quantity,
    VolumeOfProcesses,
}

/// Ordered synonym lists; earlier terms take priority.
pub const SYNONYM_TABLE: &[(SemanticKey, &[&str])] = &[
    (
        SemanticKey::Entity,
        &[
            "cliente",
            "clientes",
            "empresa",
            "empresas",
            "consumidor",
            "consumidores",
            "company",
            "customer",
            "client",
        ],
    ),
    (
        SemanticKey::Product,
        &["produto", "produtos", "product", "item", "sku", "artigo"],
    ),
    (
        SemanticKey::Category,
        &["categoria", "segmento", "tipo", "classe", "grupo"],
    ),
    (
        SemanticKey::Date,
        &["data", "date", "dt", "dia", "mes", "ano", "year"],
    ),
    (
        SemanticKey::Value,
        &[
            "valor",
            "valor_total",
            "price",
            "preco",
            "amount",
            "total",
            "receita",
            "faturamento",
        ],
    ),
    (
        SemanticKey::Quantity,
        &["quantidade", "qtd", "volume", "count", "numero"],
    ),
    (
        SemanticKey::VolumeOfProcesses,
        &["processo", "processos", "ordens", "orders", "tickets"],
    ),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnGuesses {
    pub entity: Option<String>,
    pub product: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub value: Option<String>,
    pub quantity: Option<String>,
    pub volume_of_processes: Option<String>,
}
impl ColumnGuesses {
    fn slot_mut(&mut self, key: SemanticKey) -> &mut Option<String> {
        match key {
            SemanticKey::Entity => &mut self.entity,
            SemanticKey::Product => &mut self.product,
            SemanticKey::Category => &mut self.category,
            SemanticKey::Date => &mut self.date,
            SemanticKey::Value => &mut self.value,
            SemanticKey::Quantity => &mut self.quantity,
            SemanticKey::VolumeOfProcesses => &mut self.volume_of_processes,
        }
    }
}

struct NormalizedColumn<'a> {
    raw: &'a str,
    norm: String,
}

/// Resolves semantic keys to column names. Never looks at row values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynonymResolver {
    /// Minimum normalized length for the name-in-question entity fallback. Zero keeps every column eligible.
    pub fallback_min_len: usize,
}
impl SynonymResolver {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn resolve(&self, question: &str, columns: &[String]) -> ColumnGuesses {
        let q = normalize(question);
        let norms: Vec<NormalizedColumn<'_>> = columns
            .iter()
            .map(|c| NormalizedColumn {
                raw: c,
                norm: normalize(c),
            })
            .collect();
        let mut guesses = ColumnGuesses::default();
        for (key, synonyms) in SYNONYM_TABLE {
            if let Some(column) = first_synonym_match(&q, &norms, synonyms) {
                *guesses.slot_mut(*key) = Some(column.to_string());
            }
        }
        if guesses.entity.is_none() {
            guesses.entity = self.column_named_in_question(&q, &norms).map(str::to_string);
        }
        debug!(question = %q, guesses = ?guesses, "resolved column guesses");
        guesses
    }
    fn column_named_in_question<'a>(
        &self,
        q: &str,
        norms: &[NormalizedColumn<'a>],
    ) -> Option<&'a str> {
        norms
            .iter()
            .find(|c| {
                c.norm.chars().count() >= self.fallback_min_len
                    && c.norm.chars().any(|ch| ch.is_ascii_lowercase())
                    && q.contains(c.norm.as_str())
            })
            .map(|c| c.raw)
    }
}

/// First synonym present in the question that also names a column wins.
fn first_synonym_match<'a>(
    q: &str,
    norms: &[NormalizedColumn<'a>],
    synonyms: &[&str],
) -> Option<&'a str> {
    for synonym in synonyms {
        if !q.contains(synonym) {
            continue;
        }
        if let Some(column) = norms.iter().find(|c| c.norm.contains(synonym)) {
            return Some(column.raw);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_strips_accents_and_case() {
        assert_eq!(normalize("Evolução MÊS a mês"), "evolucao mes a mes");
        assert_eq!(normalize("Preço"), "preco");
    }

    #[test]
    fn entity_resolves_through_synonym() {
        let guesses = SynonymResolver::new().resolve("top 3 clientes", &cols(&["Cliente", "valor"]));
        assert_eq!(guesses.entity.as_deref(), Some("Cliente"));
        assert_eq!(guesses.value, None);
    }

    #[test]
    fn later_synonym_is_tried_when_first_has_no_column() {
        // "cliente" appears in the question but no column contains it.
        let guesses = SynonymResolver::new().resolve(
            "receita por cliente da empresa",
            &cols(&["empresa_nome", "receita_bruta"]),
        );
        assert_eq!(guesses.entity.as_deref(), Some("empresa_nome"));
        assert_eq!(guesses.value.as_deref(), Some("receita_bruta"));
    }

    #[test]
    fn accents_in_column_names_are_ignored() {
        let guesses =
            SynonymResolver::new().resolve("média do preço", &cols(&["Preço Unitário"]));
        assert_eq!(guesses.value.as_deref(), Some("Preço Unitário"));
    }

    #[test]
    fn fallback_picks_first_column_named_in_question() {
        let guesses = SynonymResolver::new().resolve(
            "quantos registros por regiao",
            &cols(&["123", "regiao", "cidade"]),
        );
        assert_eq!(guesses.entity.as_deref(), Some("regiao"));
    }

    #[test]
    fn fallback_respects_minimum_length() {
        let resolver = SynonymResolver {
            fallback_min_len: 3,
        };
        let guesses = resolver.resolve("qual uf vende mais", &cols(&["uf"]));
        assert_eq!(guesses.entity, None);
        let guesses = SynonymResolver::new().resolve("qual uf vende mais", &cols(&["uf"]));
        assert_eq!(guesses.entity.as_deref(), Some("uf"));
    }
}
