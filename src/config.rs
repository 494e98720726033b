//! Engine configuration.
//!
//! Everything the engine would otherwise keep as ambient state (detection
//! patterns, category tokens, the "all" sentinel, the default report layout)
//! lives in an [`EngineConfig`] value that callers pass in explicitly. The
//! batch adapter can load one from YAML; omitted fields keep the workshop
//! defaults.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::Aggregator,
    filter::{DEFAULT_ALL_SENTINELS, FilterCriterion, FilterPipeline},
    normalize::{CategoryNormalizer, Taxonomy},
    schema::{CandidateTable, Role},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Role → header substring patterns. Roles left out keep their defaults.
    pub candidates: CandidateTable,
    pub taxonomy: Taxonomy,
    pub all_sentinels: Vec<String>,
    pub group_by: Vec<Role>,
    pub measure: Role,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let aggregator = Aggregator::default();
        Self {
            candidates: CandidateTable::default(),
            taxonomy: Taxonomy::default(),
            all_sentinels: DEFAULT_ALL_SENTINELS.iter().map(|s| s.to_string()).collect(),
            group_by: aggregator.group_by().to_vec(),
            measure: aggregator.measure(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let mut config: EngineConfig =
            serde_yaml::from_str(input).context("Parsing engine configuration")?;
        config.candidates = config.candidates.or_defaults(&CandidateTable::default());
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading configuration from {path:?}"))?;
        Self::from_yaml_str(&raw).with_context(|| format!("Loading configuration {path:?}"))
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing engine configuration")
    }

    /// The sentinel presented as the first drop-down entry.
    pub fn primary_sentinel(&self) -> &str {
        self.all_sentinels
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_ALL_SENTINELS[0])
    }

    pub fn is_all_sentinel(&self, value: &str) -> bool {
        let value = value.trim();
        self.all_sentinels.iter().any(|s| s.trim() == value)
    }

    pub fn normalizer(&self) -> CategoryNormalizer {
        CategoryNormalizer::new(&self.taxonomy)
    }

    pub fn pipeline(&self, criteria: Vec<FilterCriterion>) -> FilterPipeline {
        FilterPipeline::new(criteria).with_all_sentinels(self.all_sentinels.iter().cloned())
    }

    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(self.group_by.clone(), self.measure)
    }
}
