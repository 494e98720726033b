//! Composable row filters over a [`DatasetView`].
//!
//! Criteria run in the order given, each narrowing the working set left by
//! the previous one. A criterion whose role is unresolved in the schema is
//! skipped, and a date range that fails to convert leaves the working set
//! untouched; both cases are reported but never abort the pipeline.

use std::{collections::BTreeSet, convert::Infallible, sync::Arc};

use log::debug;

use crate::{
    calendar::{self, DateInterval},
    data::{Value, coerce_number, parse_lenient_date},
    dataset::{Dataset, DatasetView},
    diagnostics::{Diagnostic, DiagnosticLog},
    error::{EngineError, EngineResult},
    normalize::NormalizedColumn,
    schema::{Role, Schema},
    worker::CancelFlag,
};

/// Values that mean "no restriction" in a categorical selection. The first
/// entry is what the workshop UI shows in its drop-downs.
pub const DEFAULT_ALL_SENTINELS: &[&str] = &["(همه)", "all", "*"];

/// Rows examined between cancellation checks.
pub const BATCH_ROWS: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterCriterion {
    /// Jalali `YYYY/MM/DD` bounds, inclusive.
    DateRange {
        role: Role,
        start: Option<String>,
        end: Option<String>,
    },
    CategoricalEquals { role: Role, value: String },
    CategoricalMultiSelect { role: Role, values: BTreeSet<String> },
    NumericRange {
        role: Role,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Case-sensitive substring search on the cell text as written.
    Contains { role: Role, needle: String },
}

impl FilterCriterion {
    pub fn date_range(role: Role, start: impl Into<String>, end: impl Into<String>) -> Self {
        FilterCriterion::DateRange {
            role,
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    pub fn equals(role: Role, value: impl Into<String>) -> Self {
        FilterCriterion::CategoricalEquals {
            role,
            value: value.into(),
        }
    }

    pub fn one_of<I, S>(role: Role, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterCriterion::CategoricalMultiSelect {
            role,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn numeric_range(role: Role, min: Option<f64>, max: Option<f64>) -> Self {
        FilterCriterion::NumericRange { role, min, max }
    }

    pub fn contains(role: Role, needle: impl Into<String>) -> Self {
        FilterCriterion::Contains {
            role,
            needle: needle.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            FilterCriterion::DateRange { role, .. }
            | FilterCriterion::CategoricalEquals { role, .. }
            | FilterCriterion::CategoricalMultiSelect { role, .. }
            | FilterCriterion::NumericRange { role, .. }
            | FilterCriterion::Contains { role, .. } => *role,
        }
    }
}

/// Which column a categorical comparison reads.
#[derive(Debug, Clone, Copy)]
enum Source {
    Raw(usize),
    Normalized,
}

enum Predicate<'a> {
    Date {
        column: usize,
        interval: DateInterval,
    },
    Equals {
        source: Source,
        value: &'a str,
    },
    OneOf {
        source: Source,
        values: &'a BTreeSet<String>,
    },
    Range {
        column: usize,
        min: Option<f64>,
        max: Option<f64>,
    },
    Contains {
        column: usize,
        needle: &'a str,
    },
}

impl Predicate<'_> {
    fn keep(&self, dataset: &Dataset, normalized: &NormalizedColumn, row: usize) -> bool {
        let categorical = |source: Source| -> Option<String> {
            let value = match source {
                Source::Raw(column) => dataset.value(row, column),
                Source::Normalized => normalized.get(row),
            };
            (!value.is_missing()).then(|| value.as_display())
        };
        match self {
            Predicate::Date { column, interval } => {
                parse_lenient_date(dataset.value(row, *column))
                    .is_some_and(|date| interval.contains(date))
            }
            Predicate::Equals { source, value } => {
                categorical(*source).is_some_and(|text| text == *value)
            }
            Predicate::OneOf { source, values } => {
                categorical(*source).is_some_and(|text| values.contains(&text))
            }
            Predicate::Range { column, min, max } => {
                coerce_number(dataset.value(row, *column)).is_some_and(|number| {
                    min.is_none_or(|min| number >= min) && max.is_none_or(|max| number <= max)
                })
            }
            Predicate::Contains { column, needle } => {
                categorical(Source::Raw(*column)).is_some_and(|text| text.contains(*needle))
            }
        }
    }
}

/// Result of running a pipeline: the narrowed view plus everything that was
/// skipped or failed along the way.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub view: DatasetView,
    pub diagnostics: Vec<Diagnostic>,
    pub errors: Vec<EngineError>,
}

impl FilterOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.diagnostics.iter().all(|d| !d.is_warning())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterPipeline {
    criteria: Vec<FilterCriterion>,
    all_sentinels: Vec<String>,
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FilterPipeline {
    pub fn new(criteria: Vec<FilterCriterion>) -> Self {
        Self {
            criteria,
            all_sentinels: DEFAULT_ALL_SENTINELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_all_sentinels<I, S>(mut self, sentinels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.all_sentinels = sentinels.into_iter().map(Into::into).collect();
        self
    }

    pub fn push(&mut self, criterion: FilterCriterion) {
        self.criteria.push(criterion);
    }

    pub fn criteria(&self) -> &[FilterCriterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    fn is_all(&self, value: &str) -> bool {
        let value = value.trim();
        value.is_empty() || self.all_sentinels.iter().any(|s| s.trim() == value)
    }

    pub fn apply(
        &self,
        view: &DatasetView,
        schema: &Schema,
        normalized: &NormalizedColumn,
    ) -> FilterOutcome {
        let Ok(outcome) = self.run(view, schema, normalized, || Ok::<(), Infallible>(()));
        outcome
    }

    /// Same as [`FilterPipeline::apply`], checking `cancel` between row
    /// batches.
    pub fn apply_with_cancel(
        &self,
        view: &DatasetView,
        schema: &Schema,
        normalized: &NormalizedColumn,
        cancel: &CancelFlag,
    ) -> EngineResult<FilterOutcome> {
        self.run(view, schema, normalized, || cancel.check())
    }

    /// `checkpoint` runs before every batch of rows; its error stops the run.
    fn run<E>(
        &self,
        view: &DatasetView,
        schema: &Schema,
        normalized: &NormalizedColumn,
        mut checkpoint: impl FnMut() -> Result<(), E>,
    ) -> Result<FilterOutcome, E> {
        let mut working = view.clone();
        let mut log = DiagnosticLog::default();
        let mut errors = Vec::new();

        for (position, criterion) in self.criteria.iter().enumerate() {
            let role = criterion.role();
            let Some(column) = schema.column_index(role) else {
                log.record(Diagnostic::CriterionSkipped { position, role });
                continue;
            };
            let categorical_source = if role == Role::RepairType {
                Source::Normalized
            } else {
                Source::Raw(column)
            };
            let predicate = match criterion {
                FilterCriterion::DateRange { start, end, .. } => {
                    match calendar::convert_range(start.as_deref(), end.as_deref()) {
                        Ok(Some(interval)) => Predicate::Date { column, interval },
                        Ok(None) => continue,
                        Err(error) => {
                            log.record(Diagnostic::CriterionFailed {
                                position,
                                role,
                                error: error.clone(),
                            });
                            errors.push(error);
                            continue;
                        }
                    }
                }
                FilterCriterion::CategoricalEquals { value, .. } => {
                    if self.is_all(value) {
                        continue;
                    }
                    Predicate::Equals {
                        source: categorical_source,
                        value: value.as_str(),
                    }
                }
                FilterCriterion::CategoricalMultiSelect { values, .. } => {
                    if values.is_empty() {
                        continue;
                    }
                    Predicate::OneOf {
                        source: categorical_source,
                        values,
                    }
                }
                FilterCriterion::NumericRange { min, max, .. } => {
                    if min.is_none() && max.is_none() {
                        continue;
                    }
                    Predicate::Range {
                        column,
                        min: *min,
                        max: *max,
                    }
                }
                FilterCriterion::Contains { needle, .. } => {
                    if needle.trim().is_empty() {
                        continue;
                    }
                    Predicate::Contains {
                        column,
                        needle: needle.as_str(),
                    }
                }
            };

            let before = working.len();
            working = narrow_in_batches(&working, &mut checkpoint, |row| {
                predicate.keep(working.dataset(), normalized, row)
            })?;
            debug!(
                "Filter #{} on '{}' kept {} of {} row(s)",
                position + 1,
                role,
                working.len(),
                before
            );
        }

        Ok(FilterOutcome {
            view: working,
            diagnostics: log.into_events(),
            errors,
        })
    }
}

fn narrow_in_batches<E, C, F>(
    view: &DatasetView,
    checkpoint: &mut C,
    keep: F,
) -> Result<DatasetView, E>
where
    C: FnMut() -> Result<(), E>,
    F: Fn(usize) -> bool,
{
    let mut kept = Vec::with_capacity(view.len());
    for batch in view.indices().chunks(BATCH_ROWS) {
        checkpoint()?;
        kept.extend(batch.iter().copied().filter(|&row| keep(row)));
    }
    Ok(DatasetView::with_indices(Arc::clone(view.dataset()), kept))
}

pub fn parse_filters(filters: &[String]) -> EngineResult<Vec<FilterCriterion>> {
    filters.iter().map(|f| parse_filter(f)).collect()
}

/// Parses textual criteria such as `repair-type=mold-repair`,
/// `repair-type in mold-repair|part`, `date=1402/01/01..1402/01/10`,
/// `measure=2..5`, `measure>=2`, `part~P1`. The first operator in the
/// expression splits role from value, so values may contain operators.
pub fn parse_filter(filter: &str) -> EngineResult<FilterCriterion> {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidFilter("empty filter expression".into()));
    }

    let lowered = trimmed.to_ascii_lowercase();
    if let Some(idx) = lowered.find(" in ")
        && !trimmed[..idx].contains(['=', '<', '>', '~'])
    {
        let role = parse_role(&trimmed[..idx])?;
        let values = trimmed[idx + 4..]
            .split('|')
            .map(|v| unquote(v.trim()))
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>();
        return Ok(FilterCriterion::one_of(role, values));
    }

    let Some((idx, operator)) = first_operator(trimmed) else {
        return Err(EngineError::InvalidFilter(format!(
            "failed to parse filter expression '{trimmed}'"
        )));
    };
    let role = parse_role(&trimmed[..idx])?;
    let right = unquote(trimmed[idx + operator.len()..].trim());
    match operator {
        ">=" => Ok(FilterCriterion::numeric_range(role, Some(parse_bound(right)?), None)),
        "<=" => Ok(FilterCriterion::numeric_range(role, None, Some(parse_bound(right)?))),
        "~" => Ok(FilterCriterion::contains(role, right)),
        _ => match right.split_once("..") {
            Some((start, end)) if role == Role::Date => Ok(FilterCriterion::DateRange {
                role,
                start: non_empty(start),
                end: non_empty(end),
            }),
            Some((min, max)) => Ok(FilterCriterion::numeric_range(
                role,
                non_empty(min).map(|m| parse_bound(&m)).transpose()?,
                non_empty(max).map(|m| parse_bound(&m)).transpose()?,
            )),
            None => Ok(FilterCriterion::equals(role, right)),
        },
    }
}

/// Leftmost operator and its byte offset; `>=`/`<=` win over a bare `=`
/// only when they start first.
fn first_operator(text: &str) -> Option<(usize, &'static str)> {
    text.char_indices().find_map(|(idx, ch)| match ch {
        '>' if text[idx + 1..].starts_with('=') => Some((idx, ">=")),
        '<' if text[idx + 1..].starts_with('=') => Some((idx, "<=")),
        '=' => Some((idx, "=")),
        '~' => Some((idx, "~")),
        _ => None,
    })
}

fn parse_role(text: &str) -> EngineResult<Role> {
    text.trim().parse::<Role>().map_err(EngineError::InvalidFilter)
}

fn parse_bound(text: &str) -> EngineResult<f64> {
    coerce_number(&Value::String(text.trim().to_string()))
        .ok_or_else(|| EngineError::InvalidFilter(format!("'{text}' is not a number")))
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}
