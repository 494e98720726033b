//! Non-fatal events produced while resolving roles, filtering, and grouping.
//!
//! Every event is forwarded to the `log` facade when it is recorded, and is
//! also returned to the caller so presentation layers can surface it.

use std::fmt;

use log::{debug, warn};

use crate::{error::EngineError, schema::Role};

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    RoleResolved {
        role: Role,
        column: String,
        pattern: String,
    },
    /// A role had no matching header (schema resolution warning).
    RoleUnresolved { role: Role },
    CriterionSkipped { position: usize, role: Role },
    CriterionFailed {
        position: usize,
        role: Role,
        error: EngineError,
    },
    GroupRoleDropped { role: Role },
}

impl Diagnostic {
    pub fn is_warning(&self) -> bool {
        !matches!(self, Diagnostic::RoleResolved { .. })
    }

    pub(crate) fn emit(&self) {
        if self.is_warning() {
            warn!("{self}");
        } else {
            debug!("{self}");
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::RoleResolved {
                role,
                column,
                pattern,
            } => write!(f, "Role '{role}' resolved to column '{column}' (pattern '{pattern}')"),
            Diagnostic::RoleUnresolved { role } => {
                write!(f, "Role '{role}' did not match any column header")
            }
            Diagnostic::CriterionSkipped { position, role } => write!(
                f,
                "Filter #{} skipped: role '{role}' is unresolved",
                position + 1
            ),
            Diagnostic::CriterionFailed {
                position,
                role,
                error,
            } => write!(
                f,
                "Filter #{} on role '{role}' not applied: {error}",
                position + 1
            ),
            Diagnostic::GroupRoleDropped { role } => {
                write!(f, "Group-by role '{role}' is unresolved and was dropped")
            }
        }
    }
}

/// Collects diagnostics while logging each one as it arrives.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticLog {
    events: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn record(&mut self, event: Diagnostic) {
        event.emit();
        self.events.push(event);
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Diagnostic> {
        self.events
    }
}
