//! Dashboard summary figures for a filtered view.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    data::{Value, coerce_number},
    dataset::DatasetView,
    normalize::NormalizedColumn,
    schema::{Role, Schema},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureStats {
    pub column: String,
    /// Rows whose measure parsed as a number.
    pub counted: usize,
    pub total: f64,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub records: usize,
    pub measure: Option<MeasureStats>,
    pub distinct_repair_types: Option<usize>,
}

impl SummaryStats {
    /// Unlike aggregation, unparsable measures are skipped here rather than
    /// counted as zero, so the mean and minimum describe real entries only.
    pub fn compute(view: &DatasetView, schema: &Schema, normalized: &NormalizedColumn) -> Self {
        let dataset = view.dataset();
        let measure = schema.resolved(Role::Measure).map(|column| {
            let mut accumulator = MeasureAccumulator::default();
            for &row in view.indices() {
                if let Some(number) = coerce_number(dataset.value(row, column.index)) {
                    accumulator.add(number);
                }
            }
            accumulator.finish(column.name.clone())
        });
        let distinct_repair_types = schema.is_resolved(Role::RepairType).then(|| {
            view.indices()
                .iter()
                .map(|&row| normalized.get(row))
                .filter(|value| !value.is_missing())
                .collect::<HashSet<&Value>>()
                .len()
        });
        Self {
            records: view.len(),
            measure,
            distinct_repair_types,
        }
    }

    pub fn render_rows(&self) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["records".to_string(), self.records.to_string()]];
        if let Some(measure) = &self.measure {
            let fmt = |value: Option<f64>| value.map(|v| format!("{v:.2}")).unwrap_or_default();
            rows.push(vec![format!("{} total", measure.column), format!("{:.2}", measure.total)]);
            rows.push(vec![format!("{} mean", measure.column), fmt(measure.mean)]);
            rows.push(vec![format!("{} median", measure.column), fmt(measure.median)]);
            rows.push(vec![format!("{} max", measure.column), fmt(measure.max)]);
            rows.push(vec![format!("{} min", measure.column), fmt(measure.min)]);
        }
        if let Some(distinct) = self.distinct_repair_types {
            rows.push(vec!["distinct repair types".to_string(), distinct.to_string()]);
        }
        rows
    }
}

#[derive(Default)]
struct MeasureAccumulator {
    values: Vec<f64>,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl MeasureAccumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.min = Some(self.min.map_or(value, |current| current.min(value)));
        self.max = Some(self.max.map_or(value, |current| current.max(value)));
        self.values.push(value);
    }

    fn median(&mut self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        self.values.sort_by(f64::total_cmp);
        let mid = self.values.len() / 2;
        if self.values.len() % 2 == 0 {
            Some((self.values[mid - 1] + self.values[mid]) / 2.0)
        } else {
            Some(self.values[mid])
        }
    }

    fn finish(mut self, column: String) -> MeasureStats {
        let counted = self.values.len();
        let mean = (counted > 0).then(|| self.sum / counted as f64);
        MeasureStats {
            column,
            counted,
            total: self.sum,
            mean,
            median: self.median(),
            min: self.min,
            max: self.max,
        }
    }
}
