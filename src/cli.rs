use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    error::EngineResult,
    filter::{self, FilterCriterion},
    schema::Role,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Filter, group, and summarize mold-shop repair records",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show which column was detected for each role
    Probe(ProbeArgs),
    /// Print or export the records that pass the filters
    Filter(FilterArgs),
    /// Group filtered records and sum hours per group
    Group(GroupArgs),
    /// Summary figures for the filtered records
    Summary(SummaryArgs),
    /// Daily hour totals, labelled with Jalali dates
    Timeline(TimelineArgs),
    /// Distinct values of a role, as offered in selection lists
    Options(OptionsArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV file exported from the workshop sheet ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML engine configuration (column patterns, category tokens, defaults)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args, Default)]
pub struct FilterOptions {
    /// Jalali start date, YYYY/MM/DD (requires --to)
    #[arg(long = "from")]
    pub from: Option<String>,
    /// Jalali end date, YYYY/MM/DD (requires --from)
    #[arg(long = "to")]
    pub to: Option<String>,
    /// Keep one normalized repair type (e.g. mold-repair)
    #[arg(long = "repair-type")]
    pub repair_type: Option<String>,
    /// Keep one part / mold / device id (compared against the raw column)
    #[arg(long = "part")]
    pub part: Option<String>,
    /// Keep any of these normalized repair types
    #[arg(long = "repair-types", value_delimiter = ',')]
    pub repair_types: Vec<String>,
    /// Minimum hours worked (inclusive)
    #[arg(long = "min")]
    pub min: Option<f64>,
    /// Maximum hours worked (inclusive)
    #[arg(long = "max")]
    pub max: Option<f64>,
    /// Additional filters such as `code=M-12`, `measure=2..5` or `part~P1`
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
}

impl FilterOptions {
    /// Criteria in the order the workshop screens apply them: date, repair
    /// type, part, multi-select, hours, then free-form filters.
    pub fn criteria(&self) -> EngineResult<Vec<FilterCriterion>> {
        let mut criteria = Vec::new();
        if self.from.is_some() || self.to.is_some() {
            criteria.push(FilterCriterion::DateRange {
                role: Role::Date,
                start: self.from.clone(),
                end: self.to.clone(),
            });
        }
        if let Some(value) = &self.repair_type {
            criteria.push(FilterCriterion::equals(Role::RepairType, value.trim()));
        }
        if let Some(value) = &self.part {
            criteria.push(FilterCriterion::equals(Role::PartId, value.trim()));
        }
        let selected = self
            .repair_types
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>();
        if !selected.is_empty() {
            criteria.push(FilterCriterion::one_of(Role::RepairType, selected));
        }
        if self.min.is_some() || self.max.is_some() {
            criteria.push(FilterCriterion::numeric_range(
                Role::Measure,
                self.min,
                self.max,
            ));
        }
        criteria.extend(filter::parse_filters(&self.filters)?);
        Ok(criteria)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormat,
    /// Output file for csv/json (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter for csv output
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Prefix csv output with a UTF-8 byte-order mark for spreadsheet programs
    #[arg(long = "excel-bom")]
    pub excel_bom: bool,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterOptions,
    #[command(flatten)]
    pub output: OutputArgs,
    /// Append the normalized repair type as an extra column
    #[arg(long = "with-normalized")]
    pub with_normalized: bool,
}

#[derive(Debug, Args)]
pub struct GroupArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterOptions,
    #[command(flatten)]
    pub output: OutputArgs,
    /// Group-by roles (defaults to the configured layout: part-id,code,request-number)
    #[arg(long = "by", value_delimiter = ',', value_parser = parse_role)]
    pub by: Vec<Role>,
    /// Measure role to sum (defaults to the configured measure)
    #[arg(long = "measure", value_parser = parse_role)]
    pub measure: Option<Role>,
    /// Group by normalized repair type instead of raw columns
    #[arg(long = "by-category", conflicts_with = "by")]
    pub by_category: bool,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterOptions,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TimelineArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filters: FilterOptions,
    /// Number of most recent days to show (0 = all)
    #[arg(long, default_value_t = 30)]
    pub days: usize,
}

#[derive(Debug, Args)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Role whose distinct values are listed
    #[arg(long, value_parser = parse_role)]
    pub role: Role,
    /// List only parts that had this repair type (with --role part-id)
    #[arg(long = "for-repair-type")]
    pub for_repair_type: Option<String>,
    /// Prefix the list with the "all" sentinel
    #[arg(long = "with-all")]
    pub with_all: bool,
}

pub fn parse_role(value: &str) -> Result<Role, String> {
    value.parse()
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
