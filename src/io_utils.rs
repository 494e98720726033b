//! CSV input and output for the batch adapter.
//!
//! The engine itself never touches the filesystem; this module turns an
//! exported sheet into a [`Dataset`] and writes report rows back out.
//!
//! - **Delimiter resolution**: `.tsv` → tab, anything else → comma, with
//!   manual override support.
//! - **Encoding**: input decoding via `encoding_rs` (workshop exports are
//!   often Windows-1256), defaulting to UTF-8.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.
//! - **Excel**: UTF-8 output can carry a byte-order mark so spreadsheet
//!   programs detect Persian text correctly.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{data::Value, dataset::Dataset};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let bytes = if encoding == UTF_8 {
        bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
    } else {
        bytes
    };
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Reads a whole CSV into memory, typing each cell with [`Value::from_raw`].
/// Rows where every cell is blank are dropped.
pub fn read_dataset<R: Read>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Dataset> {
    let headers = reader.byte_headers()?.clone();
    let headers = decode_record(&headers, encoding).context("Decoding header row")?;
    let mut rows = Vec::new();
    let mut blank = 0usize;
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", row_idx + 2))?;
        let decoded = decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", row_idx + 2))?;
        if decoded.iter().all(|cell| cell.trim().is_empty()) {
            blank += 1;
            continue;
        }
        rows.push(decoded.iter().map(|cell| Value::from_raw(cell)).collect());
    }
    if blank > 0 {
        debug!("Skipped {blank} blank row(s)");
    }
    Ok(Dataset::new(headers, rows))
}

pub fn load_dataset(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Dataset> {
    let mut reader = open_csv_reader_from_path(path, delimiter)?;
    read_dataset(&mut reader, encoding).with_context(|| format!("Loading {path:?}"))
}

pub fn open_csv_writer(
    path: Option<&Path>,
    delimiter: u8,
    excel_bom: bool,
) -> Result<csv::Writer<Box<dyn Write>>> {
    let mut base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    if excel_bom {
        base.write_all(UTF8_BOM).context("Writing byte-order mark")?;
    }
    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter)
        .double_quote(true)
        .from_writer(base))
}

pub fn write_rows(
    path: Option<&Path>,
    delimiter: u8,
    excel_bom: bool,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<()> {
    let mut writer = open_csv_writer(path, delimiter, excel_bom)?;
    writer.write_record(headers).context("Writing header row")?;
    for row in rows {
        writer.write_record(row).context("Writing report row")?;
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}
