use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,    // noteworthy, nothing lost
    Warning, // something was skipped or defaulted
    Error,   // something could not be converted at all
}

/// Kinds of issues a conversion can run into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    UnknownNodeType,
    UnresolvedEndpoint,
    MissingPort,
    MalformedValue,
    MalformedConnection,
    DanglingParent,
    HierarchyMismatch,
    DuplicateSemanticId,
    UnknownDataHandling,
    UnsupportedPayload,
    DisjointContainers,
    EmptySelection,
}

/// One non-fatal issue recorded during export or import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Semantic ID, container ID or connection string the issue is about
    pub subject: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.subject {
            Some(subject) => write!(f, "[{}] {}: {}", level, subject, self.message),
            None => write!(f, "[{}] {}", level, self.message),
        }
    }
}

/// Accumulated diagnostic log for one conversion
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create a new empty log
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record a diagnostic, mirroring it to the `log` facade
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => log::info!("{}", diagnostic),
            Severity::Warning => log::warn!("{}", diagnostic),
            Severity::Error => log::error!("{}", diagnostic),
        }
        self.entries.push(diagnostic);
    }

    pub fn info(&mut self, kind: DiagnosticKind, subject: Option<&str>, message: impl Into<String>) {
        self.record(Severity::Info, kind, subject, message);
    }

    pub fn warn(&mut self, kind: DiagnosticKind, subject: Option<&str>, message: impl Into<String>) {
        self.record(Severity::Warning, kind, subject, message);
    }

    pub fn error(&mut self, kind: DiagnosticKind, subject: Option<&str>, message: impl Into<String>) {
        self.record(Severity::Error, kind, subject, message);
    }

    fn record(
        &mut self,
        severity: Severity,
        kind: DiagnosticKind,
        subject: Option<&str>,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic {
            severity,
            kind,
            subject: subject.map(str::to_string),
            message: message.into(),
        });
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity == Severity::Warning)
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// Get all warnings
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect()
    }

    /// Get all entries of one kind
    pub fn of_kind(&self, kind: DiagnosticKind) -> Vec<&Diagnostic> {
        self.entries.iter().filter(|d| d.kind == kind).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append every entry of another log
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    /// Human-readable log, one line per entry
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Overall outcome of an export or import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionStatus {
    Success,
    Failed(String),
}

/// Element counts produced by a conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionCounts {
    pub containers: usize,
    pub nodes: usize,
    pub connections: usize,
}

/// Status plus diagnostic log returned to the host
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub status: ConversionStatus,
    pub counts: ConversionCounts,
    pub diagnostics: Diagnostics,
}

impl ConversionReport {
    pub fn success(counts: ConversionCounts, diagnostics: Diagnostics) -> Self {
        Self {
            status: ConversionStatus::Success,
            counts,
            diagnostics,
        }
    }

    pub fn failed(message: impl Into<String>, diagnostics: Diagnostics) -> Self {
        Self {
            status: ConversionStatus::Failed(message.into()),
            counts: ConversionCounts::default(),
            diagnostics,
        }
    }

    /// Check if the conversion ran to completion
    pub fn is_success(&self) -> bool {
        self.status == ConversionStatus::Success
    }

    /// One-line status string for the host UI
    pub fn status_line(&self) -> String {
        match &self.status {
            ConversionStatus::Success => format!(
                "OK: {} containers, {} nodes, {} connections ({} warnings)",
                self.counts.containers,
                self.counts.nodes,
                self.counts.connections,
                self.diagnostics.warnings().len()
            ),
            ConversionStatus::Failed(message) => format!("Error: {}", message),
        }
    }
}
