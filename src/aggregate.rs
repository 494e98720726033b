//! Grouping and summing of filtered views.
//!
//! The measure is always coerced to a number with unparsable cells counted
//! as zero, so every row of the view lands in exactly one group and the
//! grand total is complete. Groups are ordered by their sum, largest first,
//! with ties kept in first-seen order.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    calendar::JalaliDate,
    data::{Value, coerce_number, parse_lenient_date},
    dataset::DatasetView,
    diagnostics::{Diagnostic, DiagnosticLog},
    error::{EngineError, EngineResult},
    normalize::NormalizedColumn,
    schema::{ResolvedColumn, Role, Schema},
};

/// Ordered key values; a missing value is a key component like any other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<Value>);

impl GroupKey {
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn display_values(&self) -> Vec<String> {
        self.0.iter().map(Value::as_display).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub key: GroupKey,
    pub sum: f64,
    /// Number of records folded into this group.
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyColumn {
    pub role: Role,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedResult {
    key_columns: Vec<KeyColumn>,
    measure_column: String,
    rows: Vec<AggregatedRow>,
    #[serde(skip)]
    dropped_roles: Vec<Role>,
}

impl GroupedResult {
    pub fn key_columns(&self) -> &[KeyColumn] {
        &self.key_columns
    }

    pub fn measure_column(&self) -> &str {
        &self.measure_column
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Group-by roles that were requested but unresolved.
    pub fn dropped_roles(&self) -> &[Role] {
        &self.dropped_roles
    }

    /// Sum over the emitted groups.
    pub fn total(&self) -> f64 {
        self.rows.iter().fold(0.0, |acc, row| acc + row.sum)
    }
}

/// Groups a view by an ordered list of roles and sums one measure role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregator {
    group_by: Vec<Role>,
    measure: Role,
}

impl Default for Aggregator {
    /// The workshop's report layout: part, mold code, request letter number,
    /// summing hours worked.
    fn default() -> Self {
        Self::new(
            vec![Role::PartId, Role::Code, Role::RequestNumber],
            Role::Measure,
        )
    }
}

impl Aggregator {
    pub fn new(group_by: Vec<Role>, measure: Role) -> Self {
        Self { group_by, measure }
    }

    pub fn group_by(&self) -> &[Role] {
        &self.group_by
    }

    pub fn measure(&self) -> Role {
        self.measure
    }

    pub fn aggregate(&self, view: &DatasetView, schema: &Schema) -> EngineResult<GroupedResult> {
        let mut log = DiagnosticLog::default();
        let mut key_columns = Vec::with_capacity(self.group_by.len());
        let mut indices = Vec::with_capacity(self.group_by.len());
        let mut dropped_roles = Vec::new();
        for &role in &self.group_by {
            match schema.resolved(role) {
                Some(ResolvedColumn { name, index }) => {
                    key_columns.push(KeyColumn {
                        role,
                        column: name.clone(),
                    });
                    indices.push(*index);
                }
                None => {
                    log.record(Diagnostic::GroupRoleDropped { role });
                    dropped_roles.push(role);
                }
            }
        }
        if key_columns.is_empty() {
            return Err(EngineError::NoGroupingColumnsAvailable);
        }
        let measure = schema
            .resolved(self.measure)
            .ok_or(EngineError::NoMeasureColumn)?;

        let dataset = view.dataset();
        let rows = sum_groups(view, measure.index, |row| {
            GroupKey(
                indices
                    .iter()
                    .map(|&column| dataset.value(row, column).clone())
                    .collect(),
            )
        });

        Ok(GroupedResult {
            key_columns,
            measure_column: measure.name.clone(),
            rows,
            dropped_roles,
        })
    }
}

/// Groups by the normalized repair type instead of the raw text, so the
/// spelling variants of one category share a bucket.
pub fn group_by_category(
    view: &DatasetView,
    schema: &Schema,
    normalized: &NormalizedColumn,
    measure: Role,
) -> EngineResult<GroupedResult> {
    let category = schema
        .resolved(Role::RepairType)
        .ok_or(EngineError::NoGroupingColumnsAvailable)?;
    let measure = schema
        .resolved(measure)
        .ok_or(EngineError::NoMeasureColumn)?;
    let rows = sum_groups(view, measure.index, |row| {
        GroupKey(vec![normalized.get(row).clone()])
    });
    Ok(GroupedResult {
        key_columns: vec![KeyColumn {
            role: Role::RepairType,
            column: category.name.clone(),
        }],
        measure_column: measure.name.clone(),
        rows,
        dropped_roles: Vec::new(),
    })
}

fn sum_groups<F>(view: &DatasetView, measure: usize, key_of: F) -> Vec<AggregatedRow>
where
    F: Fn(usize) -> GroupKey,
{
    let dataset = view.dataset();
    let mut positions: HashMap<GroupKey, usize> = HashMap::new();
    let mut rows: Vec<AggregatedRow> = Vec::new();
    for &row in view.indices() {
        let amount = coerce_number(dataset.value(row, measure)).unwrap_or(0.0);
        let key = key_of(row);
        match positions.get(&key) {
            Some(&position) => {
                let group = &mut rows[position];
                group.sum += amount;
                group.records += 1;
            }
            None => {
                positions.insert(key.clone(), rows.len());
                rows.push(AggregatedRow {
                    key,
                    sum: amount,
                    records: 1,
                });
            }
        }
    }
    rows.sort_by(|a, b| b.sum.total_cmp(&a.sum));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub jalali: Option<JalaliDate>,
    pub total: f64,
}

/// Sums the measure per calendar day, oldest first, keeping only the most
/// recent `limit` days when a limit is given. Rows without a parsable date
/// are left out.
pub fn daily_totals(
    view: &DatasetView,
    schema: &Schema,
    limit: Option<usize>,
) -> EngineResult<Vec<DailyTotal>> {
    let date_column = schema
        .column_index(Role::Date)
        .ok_or(EngineError::NoGroupingColumnsAvailable)?;
    let measure = schema
        .column_index(Role::Measure)
        .ok_or(EngineError::NoMeasureColumn)?;
    let dataset = view.dataset();

    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for &row in view.indices() {
        let Some(date) = parse_lenient_date(dataset.value(row, date_column)) else {
            continue;
        };
        let amount = coerce_number(dataset.value(row, measure)).unwrap_or(0.0);
        *per_day.entry(date).or_insert(0.0) += amount;
    }

    let skip = limit.map_or(0, |limit| per_day.len().saturating_sub(limit));
    Ok(per_day
        .into_iter()
        .skip(skip)
        .map(|(date, total)| DailyTotal {
            date,
            jalali: JalaliDate::from_gregorian(date).ok(),
            total,
        })
        .collect())
}
