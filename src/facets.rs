//! Option lists for selection widgets.
//!
//! Drop-downs offer the distinct values of a role, and picking a repair type
//! narrows the part drop-down to the parts that actually had that kind of
//! repair.

use std::collections::BTreeSet;

use crate::{
    data::Value,
    dataset::DatasetView,
    normalize::NormalizedColumn,
    schema::{Role, Schema},
};

fn categorical_value<'a>(
    view: &'a DatasetView,
    normalized: &'a NormalizedColumn,
    role: Role,
    column: usize,
    row: usize,
) -> &'a Value {
    if role == Role::RepairType {
        normalized.get(row)
    } else {
        view.dataset().value(row, column)
    }
}

/// Sorted distinct display values of `role`, missing cells excluded. Repair
/// types are listed in normalized form. `None` when the role is unresolved.
pub fn distinct_values(
    view: &DatasetView,
    schema: &Schema,
    normalized: &NormalizedColumn,
    role: Role,
) -> Option<Vec<String>> {
    let column = schema.column_index(role)?;
    let values = view
        .indices()
        .iter()
        .map(|&row| categorical_value(view, normalized, role, column, row))
        .filter(|value| !value.is_missing())
        .map(Value::as_display)
        .collect::<BTreeSet<_>>();
    Some(values.into_iter().collect())
}

/// Distinct part ids whose normalized repair type equals `repair_type`;
/// `None` as the selection lists every part id.
pub fn parts_for_repair_type(
    view: &DatasetView,
    schema: &Schema,
    normalized: &NormalizedColumn,
    repair_type: Option<&str>,
) -> Option<Vec<String>> {
    let Some(selected) = repair_type else {
        return distinct_values(view, schema, normalized, Role::PartId);
    };
    let part_column = schema.column_index(Role::PartId)?;
    schema.column_index(Role::RepairType)?;
    let dataset = view.dataset();
    let parts = view
        .indices()
        .iter()
        .filter(|&&row| {
            let category = normalized.get(row);
            !category.is_missing() && category.as_display() == selected
        })
        .map(|&row| dataset.value(row, part_column))
        .filter(|value| !value.is_missing())
        .map(Value::as_display)
        .collect::<BTreeSet<_>>();
    Some(parts.into_iter().collect())
}

/// Prepends the "all" sentinel, the way selection widgets present options.
pub fn with_all_option(sentinel: &str, values: Vec<String>) -> Vec<String> {
    std::iter::once(sentinel.to_string()).chain(values).collect()
}
