//! Canonicalization of free-text repair types.
//!
//! Operators type repair types by hand ("قالب تعمیری:", "Mold  repair",
//! "repair - mold"), so the raw column is useless for exact matching. The
//! normalizer cleans punctuation and whitespace and then maps the text onto a
//! fixed seven-label taxonomy. Text that mentions none of the workshop tokens
//! passes through cleaned but otherwise unchanged.

use std::{fmt, sync::Arc};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{data::Value, dataset::Dataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    MoldRepair,
    PartRepair,
    DeviceRepair,
    Mold,
    Part,
    Device,
    Repair,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::MoldRepair,
        Category::PartRepair,
        Category::DeviceRepair,
        Category::Mold,
        Category::Part,
        Category::Device,
        Category::Repair,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::MoldRepair => "mold-repair",
            Category::PartRepair => "part-repair",
            Category::DeviceRepair => "device-repair",
            Category::Mold => "mold",
            Category::Part => "part",
            Category::Device => "device",
            Category::Repair => "repair",
        }
    }

    fn from_label(text: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.label() == text)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Token lists recognised for each concept. Matching is case-insensitive
/// substring matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
    pub mold: Vec<String>,
    pub part: Vec<String>,
    pub device: Vec<String>,
    pub repair: Vec<String>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        fn tokens(values: &[&str]) -> Vec<String> {
            values.iter().map(|v| v.to_string()).collect()
        }
        Self {
            mold: tokens(&["قالب", "mold", "mould"]),
            part: tokens(&["قطعه", "part"]),
            device: tokens(&["دستگاه", "device", "machine"]),
            repair: tokens(&["تعمیر", "repair"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryNormalizer {
    mold: Vec<String>,
    part: Vec<String>,
    device: Vec<String>,
    repair: Vec<String>,
}

impl Default for CategoryNormalizer {
    fn default() -> Self {
        Self::new(&Taxonomy::default())
    }
}

impl CategoryNormalizer {
    pub fn new(taxonomy: &Taxonomy) -> Self {
        fn lowered(tokens: &[String]) -> Vec<String> {
            tokens
                .iter()
                .map(|token| token.trim().to_lowercase())
                .filter(|token| !token.is_empty())
                .collect()
        }
        Self {
            mold: lowered(&taxonomy.mold),
            part: lowered(&taxonomy.part),
            device: lowered(&taxonomy.device),
            repair: lowered(&taxonomy.repair),
        }
    }

    /// Maps cleaned text onto the taxonomy, first rule wins.
    pub fn classify(&self, cleaned: &str) -> Option<Category> {
        if let Some(category) = Category::from_label(cleaned) {
            return Some(category);
        }
        let lowered = cleaned.to_lowercase();
        let has = |tokens: &[String]| tokens.iter().any(|t| lowered.contains(t.as_str()));
        let (mold, part, device, repair) = (
            has(&self.mold),
            has(&self.part),
            has(&self.device),
            has(&self.repair),
        );
        if repair {
            if mold {
                return Some(Category::MoldRepair);
            } else if part {
                return Some(Category::PartRepair);
            } else if device {
                return Some(Category::DeviceRepair);
            }
        }
        if mold {
            Some(Category::Mold)
        } else if part {
            Some(Category::Part)
        } else if device {
            Some(Category::Device)
        } else if repair {
            Some(Category::Repair)
        } else {
            None
        }
    }

    pub fn normalize_text(&self, raw: &str) -> String {
        let cleaned = clean_text(raw);
        match self.classify(&cleaned) {
            Some(category) => category.label().to_string(),
            None => cleaned,
        }
    }

    /// Missing cells stay missing; everything else is normalized through its
    /// display text.
    pub fn normalize_value(&self, value: &Value) -> Value {
        match value {
            Value::Missing => Value::Missing,
            Value::String(text) => Value::String(self.normalize_text(text)),
            other => Value::String(self.normalize_text(&other.as_display())),
        }
    }

    /// Builds the parallel normalized column for `column` of `dataset`.
    pub fn normalize_column(&self, dataset: &Dataset, column: usize) -> NormalizedColumn {
        let values = (0..dataset.len())
            .map(|row| self.normalize_value(dataset.value(row, column)))
            .collect::<Vec<_>>();
        NormalizedColumn {
            values: Arc::new(values),
        }
    }
}

/// Removes colons and collapses whitespace runs into single spaces.
pub fn clean_text(raw: &str) -> String {
    raw.replace(':', "").split_whitespace().join(" ")
}

/// Normalized repair types indexed by parent row. The raw column is left
/// untouched in the dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedColumn {
    values: Arc<Vec<Value>>,
}

impl NormalizedColumn {
    pub fn get(&self, row: usize) -> &Value {
        self.values.get(row).unwrap_or(&Value::Missing)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
