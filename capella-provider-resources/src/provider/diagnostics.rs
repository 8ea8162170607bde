use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    /// Root attribute the diagnostic points at, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// Errors and warnings collected while serving one request.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    fn push(&mut self, severity: Severity, attribute: Option<&str>, summary: &str, detail: &str) {
        self.items.push(Diagnostic {
            severity,
            summary: summary.to_string(),
            detail: detail.to_string(),
            attribute: attribute.map(str::to_string),
        });
    }

    pub fn add_error(&mut self, summary: &str, detail: &str) {
        self.push(Severity::Error, None, summary, detail);
    }

    pub fn add_warning(&mut self, summary: &str, detail: &str) {
        self.push(Severity::Warning, None, summary, detail);
    }

    pub fn add_attribute_error(&mut self, attribute: &str, summary: &str, detail: &str) {
        self.push(Severity::Error, Some(attribute), summary, detail);
    }

    pub fn has_error(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
