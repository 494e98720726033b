//! Command handlers for the batch adapter: load a sheet, prepare it, apply
//! the requested filters, and render the engine's answers as a text table,
//! CSV, or JSON.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::{
    aggregate::{Aggregator, GroupedResult},
    cli::{
        FilterArgs, FilterOptions, GroupArgs, InputArgs, OptionsArgs, OutputArgs, OutputFormat,
        ProbeArgs, SummaryArgs, TimelineArgs,
    },
    config::EngineConfig,
    dataset::DatasetView,
    diagnostics::Diagnostic,
    engine::PreparedDataset,
    facets, io_utils, printable_delimiter,
    schema::Role,
    table::TextTable,
};

const TOTAL_LABEL: &str = "total";

struct Session {
    config: EngineConfig,
    prepared: PreparedDataset,
}

impl Session {
    fn open(input: &InputArgs) -> Result<Self> {
        let config = match &input.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        let delimiter = io_utils::resolve_input_delimiter(&input.input, input.delimiter);
        let encoding = io_utils::resolve_encoding(input.input_encoding.as_deref())?;
        info!(
            "Loading '{}' with delimiter '{}' ({})",
            input.input.display(),
            printable_delimiter(delimiter),
            encoding.name()
        );
        let dataset = io_utils::load_dataset(&input.input, delimiter, encoding)?;
        let prepared = PreparedDataset::prepare(dataset, &config);
        Ok(Self { config, prepared })
    }

    fn filtered(&self, options: &FilterOptions) -> Result<DatasetView> {
        let criteria = options.criteria().context("Parsing filter options")?;
        let pipeline = self.config.pipeline(criteria);
        let outcome = self.prepared.filter(&pipeline);
        for error in &outcome.errors {
            eprintln!("warning: {error}");
        }
        info!(
            "{} of {} row(s) passed {} filter(s)",
            outcome.view.len(),
            self.prepared.dataset().len(),
            pipeline.criteria().len()
        );
        Ok(outcome.view)
    }
}

pub fn probe(args: &ProbeArgs) -> Result<()> {
    let session = Session::open(&args.input)?;
    let rows = session
        .prepared
        .diagnostics()
        .iter()
        .filter_map(|event| match event {
            Diagnostic::RoleResolved {
                role,
                column,
                pattern,
            } => Some(vec![role.to_string(), column.clone(), pattern.clone()]),
            Diagnostic::RoleUnresolved { role } => {
                Some(vec![role.to_string(), "(unresolved)".to_string(), String::new()])
            }
            _ => None,
        })
        .collect();
    TextTable::new(headers(&["role", "column", "pattern"]))
        .with_rows(rows)
        .print();
    println!("{} row(s)", session.prepared.dataset().len());
    Ok(())
}

pub fn filter(args: &FilterArgs) -> Result<()> {
    let session = Session::open(&args.input)?;
    let view = session.filtered(&args.filters)?;
    let mut headers = view.headers().to_vec();
    let mut rows = view.to_display_rows();
    if args.with_normalized {
        let normalized = session.prepared.normalized();
        headers.push("repair-type (normalized)".to_string());
        for (row, &index) in rows.iter_mut().zip(view.indices()) {
            row.push(normalized.get(index).as_display());
        }
    }
    match args.output.format {
        OutputFormat::Table => {
            TextTable::new(headers).with_rows(rows).print();
            println!("{} row(s)", view.len());
            Ok(())
        }
        OutputFormat::Csv => write_csv(&args.output, &headers, &rows),
        OutputFormat::Json => {
            let records = rows
                .iter()
                .map(|row| {
                    headers
                        .iter()
                        .zip(row)
                        .map(|(header, cell)| {
                            (header.clone(), serde_json::Value::String(cell.clone()))
                        })
                        .collect::<serde_json::Map<_, _>>()
                })
                .collect::<Vec<_>>();
            write_json(args.output.output.as_deref(), &records)
        }
    }
}

#[derive(Serialize)]
struct GroupedReport<'a> {
    #[serde(flatten)]
    result: &'a GroupedResult,
    total: f64,
}

pub fn group(args: &GroupArgs) -> Result<()> {
    let session = Session::open(&args.input)?;
    let view = session.filtered(&args.filters)?;
    let measure = args.measure.unwrap_or(session.config.measure);
    let result = if args.by_category {
        session.prepared.aggregate_by_category(&view, measure)?
    } else {
        let group_by = if args.by.is_empty() {
            session.config.group_by.clone()
        } else {
            args.by.clone()
        };
        session
            .prepared
            .aggregate(&view, &Aggregator::new(group_by, measure))?
    };
    for role in result.dropped_roles() {
        eprintln!("warning: group-by role '{role}' has no column and was left out");
    }

    let mut headers = result
        .key_columns()
        .iter()
        .map(|key| key.column.clone())
        .collect::<Vec<_>>();
    headers.push(result.measure_column().to_string());
    let rows = result
        .rows()
        .iter()
        .map(|row| {
            let mut cells = row.key.display_values();
            cells.push(format_measure(row.sum));
            cells
        })
        .collect::<Vec<_>>();

    match args.output.format {
        OutputFormat::Table => {
            let mut footer = vec![String::new(); headers.len()];
            footer[0] = TOTAL_LABEL.to_string();
            if let Some(last) = footer.last_mut() {
                *last = format_measure(result.total());
            }
            TextTable::new(headers)
                .with_rows(rows)
                .with_footer(footer)
                .print();
            Ok(())
        }
        OutputFormat::Csv => write_csv(&args.output, &headers, &rows),
        OutputFormat::Json => write_json(
            args.output.output.as_deref(),
            &GroupedReport {
                result: &result,
                total: result.total(),
            },
        ),
    }
}

pub fn summary(args: &SummaryArgs) -> Result<()> {
    let session = Session::open(&args.input)?;
    let view = session.filtered(&args.filters)?;
    let stats = session.prepared.summary(&view);
    if args.json {
        return write_json(None, &stats);
    }
    if stats.measure.is_none() {
        warn!("No hours column was detected; only the record count is available");
    }
    TextTable::new(headers(&["metric", "value"]))
        .with_rows(stats.render_rows())
        .print();
    Ok(())
}

pub fn timeline(args: &TimelineArgs) -> Result<()> {
    let session = Session::open(&args.input)?;
    let view = session.filtered(&args.filters)?;
    let limit = (args.days > 0).then_some(args.days);
    let days = session.prepared.timeline(&view, limit)?;
    let rows = days
        .iter()
        .map(|day| {
            vec![
                day.jalali.map(|j| j.to_string()).unwrap_or_default(),
                day.date.format("%Y-%m-%d").to_string(),
                format_measure(day.total),
            ]
        })
        .collect();
    TextTable::new(headers(&["jalali", "date", "hours"]))
        .with_rows(rows)
        .print();
    Ok(())
}

pub fn options(args: &OptionsArgs) -> Result<()> {
    let session = Session::open(&args.input)?;
    let view = session.prepared.full_view();
    let values = match (&args.for_repair_type, args.role) {
        (Some(selection), Role::PartId) => {
            session
                .prepared
                .parts_for(&view, selection, &session.config)
        }
        (Some(_), role) => {
            warn!("--for-repair-type only narrows part-id options; ignoring it for '{role}'");
            session.prepared.options(&view, role)
        }
        (None, role) => session.prepared.options(&view, role),
    };
    let Some(values) = values else {
        anyhow::bail!("No column was detected for role '{}'", args.role);
    };
    let values = if args.with_all {
        facets::with_all_option(session.config.primary_sentinel(), values)
    } else {
        values
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for value in values {
        writeln!(out, "{value}")?;
    }
    Ok(())
}

/// Rounds to two decimals and drops trailing zeros, so `4.0` prints as `4`
/// and float noise from summing does not leak into reports.
pub fn format_measure(value: f64) -> String {
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

fn headers(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn write_csv(output: &OutputArgs, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    let delimiter = output
        .output_delimiter
        .unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
    io_utils::write_rows(
        output.output.as_deref(),
        delimiter,
        output.excel_bom,
        headers,
        rows,
    )?;
    if let Some(path) = &output.output {
        info!("Wrote {} row(s) to {path:?}", rows.len());
    }
    Ok(())
}

fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let mut writer: Box<dyn Write> = match path {
        Some(p) if !io_utils::is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout()),
    };
    serde_json::to_writer_pretty(&mut writer, value).context("Serializing JSON output")?;
    writeln!(writer)?;
    writer.flush().context("Flushing output")?;
    Ok(())
}
