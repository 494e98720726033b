//! One-stop entry point for presentation surfaces.
//!
//! [`PreparedDataset::prepare`] infers the schema and builds the normalized
//! repair-type column once; the filter and aggregation calls that follow all
//! read the same immutable state, so a prepared dataset can be cloned into
//! worker threads freely.

use std::sync::Arc;

use log::info;

use crate::{
    aggregate::{self, Aggregator, DailyTotal, GroupedResult},
    config::EngineConfig,
    dataset::{Dataset, DatasetView},
    diagnostics::Diagnostic,
    error::EngineResult,
    facets,
    filter::{FilterOutcome, FilterPipeline},
    normalize::NormalizedColumn,
    schema::{self, Role, Schema},
    stats::SummaryStats,
    worker::CancelFlag,
};

#[derive(Debug, Clone)]
pub struct PreparedDataset {
    dataset: Arc<Dataset>,
    schema: Arc<Schema>,
    normalized: NormalizedColumn,
    diagnostics: Arc<Vec<Diagnostic>>,
}

impl PreparedDataset {
    pub fn prepare(dataset: impl Into<Arc<Dataset>>, config: &EngineConfig) -> Self {
        let dataset = dataset.into();
        let inference = schema::infer_schema(dataset.headers(), &config.candidates);
        let normalized = match inference.schema.column_index(Role::RepairType) {
            Some(column) => config.normalizer().normalize_column(&dataset, column),
            None => NormalizedColumn::default(),
        };
        info!(
            "Prepared {} row(s); {} of {} role(s) resolved",
            dataset.len(),
            Role::ALL.len() - inference.schema.unresolved().len(),
            Role::ALL.len()
        );
        Self {
            dataset,
            schema: Arc::new(inference.schema),
            normalized,
            diagnostics: Arc::new(inference.diagnostics),
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn normalized(&self) -> &NormalizedColumn {
        &self.normalized
    }

    /// Role resolution events recorded during preparation.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn full_view(&self) -> DatasetView {
        DatasetView::full(Arc::clone(&self.dataset))
    }

    pub fn filter(&self, pipeline: &FilterPipeline) -> FilterOutcome {
        pipeline.apply(&self.full_view(), &self.schema, &self.normalized)
    }

    pub fn filter_with_cancel(
        &self,
        pipeline: &FilterPipeline,
        cancel: &CancelFlag,
    ) -> EngineResult<FilterOutcome> {
        pipeline.apply_with_cancel(&self.full_view(), &self.schema, &self.normalized, cancel)
    }

    pub fn aggregate(
        &self,
        view: &DatasetView,
        aggregator: &Aggregator,
    ) -> EngineResult<GroupedResult> {
        aggregator.aggregate(view, &self.schema)
    }

    pub fn aggregate_by_category(
        &self,
        view: &DatasetView,
        measure: Role,
    ) -> EngineResult<GroupedResult> {
        aggregate::group_by_category(view, &self.schema, &self.normalized, measure)
    }

    pub fn summary(&self, view: &DatasetView) -> SummaryStats {
        SummaryStats::compute(view, &self.schema, &self.normalized)
    }

    pub fn timeline(&self, view: &DatasetView, limit: Option<usize>) -> EngineResult<Vec<DailyTotal>> {
        aggregate::daily_totals(view, &self.schema, limit)
    }

    pub fn options(&self, view: &DatasetView, role: Role) -> Option<Vec<String>> {
        facets::distinct_values(view, &self.schema, &self.normalized, role)
    }

    /// Part ids for a repair-type selection; the "all" sentinel (or a blank
    /// selection) lists every part.
    pub fn parts_for(
        &self,
        view: &DatasetView,
        selection: &str,
        config: &EngineConfig,
    ) -> Option<Vec<String>> {
        let selection = selection.trim();
        let selection =
            (!selection.is_empty() && !config.is_all_sentinel(selection)).then_some(selection);
        facets::parts_for_repair_type(view, &self.schema, &self.normalized, selection)
    }
}
