//! Semantic roles and header-based schema inference.
//!
//! Workshop spreadsheets rarely share exact column names, so each [`Role`] is
//! bound to a column by substring matching against a [`CandidateTable`].
//! Resolution is a pure function of the headers and the table: roles that
//! match nothing stay unresolved and the caller decides what to skip.

use std::{collections::BTreeMap, fmt, str::FromStr};

use heck::ToKebabCase;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    RepairType,
    PartId,
    Date,
    Measure,
    RequestNumber,
    Code,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::RepairType,
        Role::PartId,
        Role::Date,
        Role::Measure,
        Role::RequestNumber,
        Role::Code,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::RepairType => "repair-type",
            Role::PartId => "part-id",
            Role::Date => "date",
            Role::Measure => "measure",
            Role::RequestNumber => "request-number",
            Role::Code => "code",
        }
    }

    pub fn variants() -> Vec<&'static str> {
        Role::ALL.iter().map(Role::as_str).collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let token = value.trim().to_kebab_case();
        match token.as_str() {
            "repair-type" | "repair" => Ok(Role::RepairType),
            "part-id" | "part" | "device" => Ok(Role::PartId),
            "date" => Ok(Role::Date),
            "measure" | "hours" => Ok(Role::Measure),
            "request-number" | "request" => Ok(Role::RequestNumber),
            "code" => Ok(Role::Code),
            _ => Err(format!(
                "Unknown role '{value}'. Expected one of: {}",
                Role::variants().join(", ")
            )),
        }
    }
}

/// Ordered substring patterns per role, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateTable {
    patterns: BTreeMap<Role, Vec<String>>,
}

impl CandidateTable {
    pub fn empty() -> Self {
        Self {
            patterns: BTreeMap::new(),
        }
    }

    pub fn with<I, S>(mut self, role: Role, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns
            .insert(role, patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn patterns(&self, role: Role) -> &[String] {
        self.patterns.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fills roles this table does not mention from `defaults`.
    pub fn or_defaults(mut self, defaults: &CandidateTable) -> Self {
        for (role, patterns) in &defaults.patterns {
            self.patterns
                .entry(*role)
                .or_insert_with(|| patterns.clone());
        }
        self
    }
}

impl Default for CandidateTable {
    /// Detection lists used by the workshop's Persian and English sheets.
    fn default() -> Self {
        CandidateTable::empty()
            .with(
                Role::RepairType,
                ["نوع تعمیر", "repair type", "تعمیر", "repair"],
            )
            .with(
                Role::PartId,
                [
                    "قالب / قطعه / دستگاه",
                    "قالب",
                    "قطعه",
                    "دستگاه",
                    "part",
                    "device",
                ],
            )
            .with(Role::Date, ["تاریخ", "date"])
            .with(
                Role::Measure,
                ["مقدار ساعت کار شده", "ساعت", "hour", "time"],
            )
            .with(
                Role::RequestNumber,
                ["شماره نامه درخواست", "شماره درخواست", "request"],
            )
            .with(Role::Code, ["کد قالب", "کد", "code"])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub name: String,
    pub index: usize,
}

/// Role → column bindings produced by [`infer_schema`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    bindings: BTreeMap<Role, ResolvedColumn>,
}

impl Schema {
    pub fn resolved(&self, role: Role) -> Option<&ResolvedColumn> {
        self.bindings.get(&role)
    }

    pub fn column_name(&self, role: Role) -> Option<&str> {
        self.resolved(role).map(|column| column.name.as_str())
    }

    pub fn column_index(&self, role: Role) -> Option<usize> {
        self.resolved(role).map(|column| column.index)
    }

    pub fn is_resolved(&self, role: Role) -> bool {
        self.bindings.contains_key(&role)
    }

    pub fn unresolved(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| !self.is_resolved(*role))
            .collect()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (Role, &ResolvedColumn)> {
        self.bindings.iter().map(|(role, column)| (*role, column))
    }
}

#[derive(Debug, Clone)]
pub struct SchemaInference {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

/// Binds every role to the first header (in header order) that contains one
/// of the role's patterns, compared case-insensitively after trimming.
pub fn infer_schema<S: AsRef<str>>(headers: &[S], table: &CandidateTable) -> SchemaInference {
    let lowered = headers
        .iter()
        .map(|header| header.as_ref().trim().to_lowercase())
        .collect::<Vec<_>>();
    let mut schema = Schema::default();
    let mut log = DiagnosticLog::default();

    for role in Role::ALL {
        let patterns = table
            .patterns(role)
            .iter()
            .map(|pattern| pattern.trim().to_lowercase())
            .enumerate()
            .filter(|(_, pattern)| !pattern.is_empty())
            .collect::<Vec<_>>();
        let hit = lowered.iter().enumerate().find_map(|(index, header)| {
            patterns
                .iter()
                .find(|(_, pattern)| header.contains(pattern.as_str()))
                .map(|&(pattern_idx, _)| (index, pattern_idx))
        });
        match hit {
            Some((index, pattern_idx)) => {
                let name = headers[index].as_ref().to_string();
                log.record(Diagnostic::RoleResolved {
                    role,
                    column: name.clone(),
                    pattern: table.patterns(role)[pattern_idx].clone(),
                });
                schema.bindings.insert(role, ResolvedColumn { name, index });
            }
            None => log.record(Diagnostic::RoleUnresolved { role }),
        }
    }

    SchemaInference {
        schema,
        diagnostics: log.into_events(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_any_case_style() {
        assert_eq!("RepairType".parse::<Role>().unwrap(), Role::RepairType);
        assert_eq!("request_number".parse::<Role>().unwrap(), Role::RequestNumber);
        assert_eq!("hours".parse::<Role>().unwrap(), Role::Measure);
        assert!("colour".parse::<Role>().is_err());
    }

    #[test]
    fn header_order_wins_over_pattern_priority() {
        let table = CandidateTable::empty().with(Role::Code, ["mold code", "code"]);
        let inference = infer_schema(&["Code", "Mold Code"], &table);
        assert_eq!(inference.schema.column_name(Role::Code), Some("Code"));
    }

    #[test]
    fn pattern_reported_is_the_original_text() {
        let table = CandidateTable::empty().with(Role::Date, [" Date "]);
        let inference = infer_schema(&["Work date"], &table);
        assert!(inference.diagnostics.contains(&Diagnostic::RoleResolved {
            role: Role::Date,
            column: "Work date".into(),
            pattern: " Date ".into(),
        }));
    }

    #[test]
    fn empty_patterns_never_match() {
        let table = CandidateTable::empty().with(Role::Measure, ["", "   "]);
        let inference = infer_schema(&["Hours"], &table);
        assert!(!inference.schema.is_resolved(Role::Measure));
    }

    #[test]
    fn blank_patterns_do_not_shift_the_reported_pattern() {
        let table = CandidateTable::empty().with(Role::Date, ["", "  ", "date"]);
        let inference = infer_schema(&["Work date"], &table);
        assert!(inference.diagnostics.contains(&Diagnostic::RoleResolved {
            role: Role::Date,
            column: "Work date".into(),
            pattern: "date".into(),
        }));
    }
}
