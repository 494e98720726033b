#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use moldshop_report::{Dataset, EngineConfig, PreparedDataset};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

pub const ENGLISH_HEADERS: [&str; 6] = [
    "Date",
    "Repair Type",
    "Part",
    "Mold Code",
    "Request No",
    "Hours",
];

/// Builds a dataset with English headers from raw cell text.
pub fn english_dataset(rows: &[[&str; 6]]) -> Dataset {
    let rows = rows.iter().map(|row| row.to_vec()).collect::<Vec<_>>();
    Dataset::from_raw_rows(&ENGLISH_HEADERS, &rows)
}

pub fn prepare(dataset: Dataset) -> PreparedDataset {
    PreparedDataset::prepare(Arc::new(dataset), &EngineConfig::default())
}

/// The Persian workshop sheet under `tests/data/repairs.csv`, prepared with
/// the default configuration.
pub fn workshop_sheet() -> PreparedDataset {
    let path = fixture_path("repairs.csv");
    let dataset = moldshop_report::io_utils::load_dataset(
        &path,
        b',',
        encoding_rs::UTF_8,
    )
    .expect("load fixture");
    prepare(dataset)
}
