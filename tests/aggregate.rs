mod common;

use common::{english_dataset, prepare, workshop_sheet};
use moldshop_report::{
    EngineConfig, EngineError, FilterCriterion, FilterPipeline, Role,
    aggregate::{Aggregator, GroupKey},
    data::Value,
};

fn key(values: &[&str]) -> GroupKey {
    GroupKey(values.iter().map(|v| Value::from(*v)).collect())
}

#[test]
fn sums_per_group_sorted_descending_with_unparsable_as_zero() {
    let prepared = prepare(english_dataset(&[
        ["", "", "P1", "C1", "", "3"],
        ["", "", "P1", "C1", "", "2"],
        ["", "", "P2", "C2", "", "bad"],
    ]));
    let aggregator = Aggregator::new(vec![Role::PartId, Role::Code], Role::Measure);
    let result = prepared
        .aggregate(&prepared.full_view(), &aggregator)
        .unwrap();
    let rows = result
        .rows()
        .iter()
        .map(|row| (row.key.clone(), row.sum))
        .collect::<Vec<_>>();
    assert_eq!(rows, [(key(&["P1", "C1"]), 5.0), (key(&["P2", "C2"]), 0.0)]);
    assert_eq!(result.total(), 5.0);
    assert_eq!(result.measure_column(), "Hours");
    let columns = result
        .key_columns()
        .iter()
        .map(|c| c.column.as_str())
        .collect::<Vec<_>>();
    assert_eq!(columns, ["Part", "Mold Code"]);
}

#[test]
fn every_row_lands_in_exactly_one_group() {
    let prepared = workshop_sheet();
    let result = prepared
        .aggregate(&prepared.full_view(), &Aggregator::default())
        .unwrap();
    let records = result.rows().iter().map(|row| row.records).sum::<usize>();
    assert_eq!(records, prepared.dataset().len());
    assert_eq!(result.total(), 18.5);

    let sums = result.rows().iter().map(|row| row.sum).collect::<Vec<_>>();
    assert_eq!(sums, [7.0, 6.0, 4.5, 1.0, 0.0]);
    assert_eq!(
        result.rows()[0].key.display_values(),
        ["P1", "C1", "101"]
    );
}

#[test]
fn ties_keep_first_seen_order() {
    let prepared = prepare(english_dataset(&[
        ["", "", "B", "", "", "2"],
        ["", "", "A", "", "", "2"],
        ["", "", "C", "", "", "5"],
    ]));
    let result = prepared
        .aggregate(
            &prepared.full_view(),
            &Aggregator::new(vec![Role::PartId], Role::Measure),
        )
        .unwrap();
    let parts = result
        .rows()
        .iter()
        .map(|row| row.key.display_values().join("/"))
        .collect::<Vec<_>>();
    assert_eq!(parts, ["C", "B", "A"]);
}

#[test]
fn missing_key_values_form_their_own_group() {
    let prepared = prepare(english_dataset(&[
        ["", "", "", "", "", "1"],
        ["", "", "", "", "", "2"],
        ["", "", "P1", "", "", "1"],
    ]));
    let result = prepared
        .aggregate(
            &prepared.full_view(),
            &Aggregator::new(vec![Role::PartId], Role::Measure),
        )
        .unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result.rows()[0].key, GroupKey(vec![Value::Missing]));
    assert_eq!(result.rows()[0].sum, 3.0);
}

#[test]
fn unresolved_group_roles_are_dropped_and_empty_key_is_an_error() {
    let prepared = prepare(moldshop_report::Dataset::from_raw_rows(
        &["Part", "Hours"],
        &[vec!["P1", "2"]],
    ));
    let result = prepared
        .aggregate(&prepared.full_view(), &Aggregator::default())
        .unwrap();
    assert_eq!(result.dropped_roles(), [Role::Code, Role::RequestNumber]);
    assert_eq!(result.len(), 1);

    let err = prepared
        .aggregate(
            &prepared.full_view(),
            &Aggregator::new(vec![Role::Code, Role::Date], Role::Measure),
        )
        .unwrap_err();
    assert_eq!(err, EngineError::NoGroupingColumnsAvailable);

    let err = prepared
        .aggregate(&prepared.full_view(), &Aggregator::new(Vec::new(), Role::Measure))
        .unwrap_err();
    assert_eq!(err, EngineError::NoGroupingColumnsAvailable);
}

#[test]
fn unresolved_measure_is_an_error() {
    let prepared = prepare(moldshop_report::Dataset::from_raw_rows(
        &["Part", "Notes"],
        &[vec!["P1", "n/a"]],
    ));
    let err = prepared
        .aggregate(
            &prepared.full_view(),
            &Aggregator::new(vec![Role::PartId], Role::Measure),
        )
        .unwrap_err();
    assert_eq!(err, EngineError::NoMeasureColumn);
}

#[test]
fn empty_filtered_view_aggregates_to_nothing() {
    let prepared = workshop_sheet();
    let pipeline = FilterPipeline::new(vec![FilterCriterion::equals(Role::PartId, "nope")]);
    let view = prepared.filter(&pipeline).view;
    assert!(view.is_empty());
    let result = prepared.aggregate(&view, &Aggregator::default()).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.total(), 0.0);
    assert!(!result.total().is_sign_negative());
    assert_eq!(serde_json::to_string(&result.total()).unwrap(), "0.0");
}

#[test]
fn filter_then_group_matches_the_workshop_report() {
    let prepared = workshop_sheet();
    let config = EngineConfig::default();
    let pipeline = config.pipeline(vec![FilterCriterion::date_range(
        Role::Date,
        "1402/01/01",
        "1402/01/10",
    )]);
    let view = prepared.filter(&pipeline).view;
    let result = prepared.aggregate(&view, &config.aggregator()).unwrap();
    let rows = result
        .rows()
        .iter()
        .map(|row| (row.key.display_values()[0].clone(), row.sum))
        .collect::<Vec<_>>();
    assert_eq!(
        rows,
        [
            ("D1".to_string(), 6.0),
            ("P1".to_string(), 3.0),
            ("P2".to_string(), 2.5)
        ]
    );
    assert_eq!(result.total(), 11.5);
}

#[test]
fn grouping_by_category_merges_spelling_variants() {
    let prepared = workshop_sheet();
    let result = prepared
        .aggregate_by_category(&prepared.full_view(), Role::Measure)
        .unwrap();
    let rows = result
        .rows()
        .iter()
        .map(|row| (row.key.display_values()[0].clone(), row.sum, row.records))
        .collect::<Vec<_>>();
    assert_eq!(
        rows,
        [
            ("mold-repair".to_string(), 9.0, 3),
            ("device-repair".to_string(), 6.0, 1),
            ("part-repair".to_string(), 2.5, 1),
            ("repair".to_string(), 1.0, 1),
            ("mold".to_string(), 0.0, 1),
        ]
    );
}

#[test]
fn timeline_keeps_the_most_recent_days() {
    let prepared = workshop_sheet();
    let days = prepared.timeline(&prepared.full_view(), Some(2)).unwrap();
    let labels = days
        .iter()
        .map(|day| (day.jalali.unwrap().to_string(), day.total))
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        [("1402/01/11".to_string(), 0.0), ("1402/01/13".to_string(), 2.0)]
    );

    let all = prepared.timeline(&prepared.full_view(), None).unwrap();
    assert_eq!(all.len(), 6);
    assert!(all.windows(2).all(|pair| pair[0].date < pair[1].date));
}
