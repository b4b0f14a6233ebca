// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Diagnostics collected during type checking.
//!
//! The checker never aborts on the first problem. Every routine appends to
//! an [`ErrorList`] and signals failure through its return value, so one
//! pass over an expression reports as many independent problems as possible.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// Which analysis stage produced the diagnostic. The checker only performs
/// semantic analysis, so every diagnostic it appends is `Semantic`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Semantic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    TypeError,
    ColumnNotFound,
    NonConstantExpression,
    ConstantTooLong,
    Overflow,
    DividedByZero,
    PendingEscapeByte,
    InvalidAddressChecksum,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    #[serde(skip)]
    pub span: Span,
    pub severity: Severity,
    pub category: Category,
    /// Absent on warnings and notes that only annotate a preceding error.
    pub code: Option<ErrorCode>,
    /// The checker routine that produced the diagnostic.
    pub origin: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn error(span: Span, code: ErrorCode, origin: &'static str, message: String) -> Self {
        Self {
            span,
            severity: Severity::Error,
            category: Category::Semantic,
            code: Some(code),
            origin,
            message,
        }
    }

    pub fn warning(span: Span, origin: &'static str, message: String) -> Self {
        Self {
            span,
            severity: Severity::Warning,
            category: Category::Semantic,
            code: None,
            origin,
            message,
        }
    }

    pub fn note(span: Span, origin: &'static str, message: String) -> Self {
        Self {
            span,
            severity: Severity::Note,
            category: Category::Semantic,
            code: None,
            origin,
            message,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        write!(f, "{severity}")?;
        if let Some(code) = self.code {
            write!(f, "[{code:?}]")?;
        }
        write!(
            f,
            " (offset {}, length {}): {}: {}",
            self.span.start, self.span.length, self.origin, self.message
        )
    }
}

/// An append-only list of diagnostics, kept in emission order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ErrorList {
    items: Vec<Diagnostic>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_preserved() {
        let mut el = ErrorList::new();
        el.append(Diagnostic::error(
            Span::new(0, 1),
            ErrorCode::TypeError,
            "check",
            "first".into(),
        ));
        el.append(Diagnostic::warning(Span::new(2, 1), "check", "second".into()));
        el.append(Diagnostic::note(Span::new(2, 1), "check", "third".into()));

        let messages: Vec<_> = el.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "third"]);
        assert!(el.has_errors());
    }

    #[test]
    fn warnings_are_not_errors() {
        let mut el = ErrorList::new();
        assert!(!el.has_errors());
        el.append(Diagnostic::warning(Span::new(0, 0), "check", "w".into()));
        assert!(!el.has_errors());
        assert_eq!(el.len(), 1);
    }

    #[test]
    fn rendering() {
        let d = Diagnostic::error(
            Span::new(4, 3),
            ErrorCode::DividedByZero,
            "check_div",
            "division by zero".into(),
        );
        assert_eq!(
            d.to_string(),
            "error[DividedByZero] (offset 4, length 3): check_div: division by zero"
        );

        let w = Diagnostic::warning(Span::new(0, 1), "check_add", "wrapped".into());
        assert_eq!(w.to_string(), "warning (offset 0, length 1): check_add: wrapped");
    }

    #[test]
    fn every_diagnostic_is_semantic() {
        let d = Diagnostic::error(Span::new(0, 1), ErrorCode::TypeError, "check", "m".into());
        assert_eq!(d.category, Category::Semantic);
        let w = Diagnostic::warning(Span::new(0, 1), "check", "m".into());
        assert_eq!(w.category, Category::Semantic);
        let n = Diagnostic::note(Span::new(0, 1), "check", "m".into());
        assert_eq!(n.category, Category::Semantic);
    }
}
