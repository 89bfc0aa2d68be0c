//! # Diagnostics Sink
//!
//! Caller-owned accumulator for notes a workflow wants a human to see. It is passed
//! by `&mut` through the pipeline; no component keeps its own copy.

use crate::{PathwiseError, Severity};
use serde::{Deserialize, Serialize};

/// A single note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: u16,
    pub message: String,
}

/// Ordered collection of notes for one workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

/// Code used for plain informational notes.
pub const NOTE_CODE: u16 = 1000;

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an informational note.
    pub fn note(&mut self, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            severity: Severity::Informational,
            code: NOTE_CODE,
            message: message.into(),
        });
    }

    /// Record an error that was tolerated instead of aborting.
    pub fn tolerated(&mut self, error: &PathwiseError) {
        tracing::warn!(code = error.code(), "tolerated: {}", error);
        self.entries.push(Diagnostic {
            severity: error.severity(),
            code: error.code(),
            message: error.to_string(),
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Messages of the informational notes, in order.
    #[must_use]
    pub fn notes(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Informational)
            .map(|d| d.message.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_and_tolerated_errors_keep_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.note("hub work required");
        diagnostics.tolerated(&PathwiseError::DeviceCommunication {
            tid: "AUSTTXZB1ZW".into(),
            command: "rad_flows".into(),
            detail: "timeout".into(),
        });

        assert_eq!(diagnostics.entries().len(), 2);
        assert_eq!(diagnostics.entries()[1].code, 2002);
        assert_eq!(diagnostics.notes(), vec!["hub work required".to_string()]);
    }
}
