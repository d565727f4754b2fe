//! Structured diagnostics emitted by every stage of the semantic core.
//!
//! The core never prints: binding and evaluation report problems as
//! `Diagnostic` records pushed into a write-only [`Diagnostics`] sink. Codes
//! are stable so outer layers (JSON writers, language servers) can key off
//! them; severity is assigned here at the sink boundary, not by producers.

use crate::syntax::SourceLocation;
use serde::Serialize;
use std::fmt;

/// Stable identifiers for every diagnostic the core produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagCode {
    // Binding errors
    UndeclaredIdentifier,
    DuplicateDefinition,
    UsedBeforeDeclared,
    NotAScope,
    NotAValue,
    NotAType,
    NotASubroutine,
    InvalidLiteral,
    TypeMismatch,
    WidthMismatch,
    WidthTooLarge,
    ConstantRequired,
    WrongArgCount,
    UnknownSystemFunction,
    InvalidLValue,
    InvalidSelect,
    InvalidReplication,
    ReturnOutsideSubroutine,
    MissingReturnValue,
    UnexpectedReturnValue,
    UnsupportedPredicate,
    EnumBaseNotIntegral,
    // Evaluation errors
    NotAConstant,
    DivideByZero,
    IndexOutOfBounds,
    RecursionLimit,
    EvalTimeout,
    EvalCancelled,
    CyclicParameter,
    UnknownCondition,
    UninitializedVariable,
}

/// Severity as assigned by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl DiagCode {
    /// The sink's severity policy. Width narrowing and unknown conditions
    /// warn; everything else is an error.
    pub fn severity(self) -> Severity {
        match self {
            DiagCode::WidthMismatch | DiagCode::UnknownCondition => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// One argument slot of a diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DiagArg {
    Text(String),
    Num(i64),
}

impl fmt::Display for DiagArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagArg::Text(s) => write!(f, "{}", s),
            DiagArg::Num(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for DiagArg {
    fn from(s: &str) -> DiagArg {
        DiagArg::Text(s.to_string())
    }
}

impl From<String> for DiagArg {
    fn from(s: String) -> DiagArg {
        DiagArg::Text(s)
    }
}

impl From<i64> for DiagArg {
    fn from(n: i64) -> DiagArg {
        DiagArg::Num(n)
    }
}

impl From<u32> for DiagArg {
    fn from(n: u32) -> DiagArg {
        DiagArg::Num(n as i64)
    }
}

impl From<usize> for DiagArg {
    fn from(n: usize) -> DiagArg {
        DiagArg::Num(n as i64)
    }
}

/// A single diagnostic record: `{code, location, args}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: DiagCode,
    pub location: SourceLocation,
    pub args: Vec<DiagArg>,
}

impl Diagnostic {
    pub fn new(code: DiagCode, location: SourceLocation, args: Vec<DiagArg>) -> Diagnostic {
        Diagnostic {
            code,
            location,
            args,
        }
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    fn arg(&self, index: usize) -> String {
        self.args
            .get(index)
            .map(|a| a.to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.location)?;
        match self.code {
            DiagCode::UndeclaredIdentifier => {
                write!(f, "use of undeclared identifier '{}'", self.arg(0))
            }
            DiagCode::DuplicateDefinition => {
                write!(f, "'{}' is already defined in this scope", self.arg(0))
            }
            DiagCode::UsedBeforeDeclared => {
                write!(f, "'{}' is used before its declaration", self.arg(0))
            }
            DiagCode::NotAScope => write!(f, "'{}' is not a scope", self.arg(0)),
            DiagCode::NotAValue => write!(f, "'{}' does not name a value", self.arg(0)),
            DiagCode::NotAType => write!(f, "'{}' does not name a type", self.arg(0)),
            DiagCode::NotASubroutine => {
                write!(f, "'{}' is not a subroutine", self.arg(0))
            }
            DiagCode::InvalidLiteral => {
                write!(f, "invalid integer literal: {}", self.arg(0))
            }
            DiagCode::TypeMismatch => write!(
                f,
                "cannot convert from '{}' to '{}'",
                self.arg(0),
                self.arg(1)
            ),
            DiagCode::WidthMismatch => write!(
                f,
                "implicit conversion narrows from {} to {} bits",
                self.arg(0),
                self.arg(1)
            ),
            DiagCode::WidthTooLarge => write!(
                f,
                "width {} exceeds the implementation maximum",
                self.arg(0)
            ),
            DiagCode::ConstantRequired => {
                write!(f, "expression is not constant")
            }
            DiagCode::WrongArgCount => write!(
                f,
                "expected {} arguments, got {}",
                self.arg(0),
                self.arg(1)
            ),
            DiagCode::UnknownSystemFunction => {
                write!(f, "unknown system function '{}'", self.arg(0))
            }
            DiagCode::InvalidLValue => write!(f, "expression is not assignable"),
            DiagCode::InvalidSelect => {
                write!(f, "cannot select from a value of type '{}'", self.arg(0))
            }
            DiagCode::InvalidReplication => {
                write!(f, "replication count must be a positive constant")
            }
            DiagCode::ReturnOutsideSubroutine => {
                write!(f, "return statement is only valid inside a subroutine")
            }
            DiagCode::MissingReturnValue => {
                write!(f, "return in function '{}' needs a value", self.arg(0))
            }
            DiagCode::UnexpectedReturnValue => {
                write!(f, "void function '{}' cannot return a value", self.arg(0))
            }
            DiagCode::UnsupportedPredicate => {
                write!(f, "'&&&' and pattern predicates are not supported")
            }
            DiagCode::EnumBaseNotIntegral => {
                write!(f, "enum base type '{}' is not integral", self.arg(0))
            }
            DiagCode::NotAConstant => {
                write!(f, "reference to '{}' is not constant", self.arg(0))
            }
            DiagCode::DivideByZero => write!(f, "division by zero"),
            DiagCode::IndexOutOfBounds => write!(
                f,
                "index {} is out of bounds for '{}'",
                self.arg(0),
                self.arg(1)
            ),
            DiagCode::RecursionLimit => {
                write!(f, "recursion limit reached while evaluating '{}'", self.arg(0))
            }
            DiagCode::EvalTimeout => write!(f, "constant evaluation step budget exhausted"),
            DiagCode::EvalCancelled => write!(f, "constant evaluation was cancelled"),
            DiagCode::CyclicParameter => {
                write!(f, "parameter '{}' depends on its own value", self.arg(0))
            }
            DiagCode::UnknownCondition => {
                write!(f, "condition has unknown bits; treated as false")
            }
            DiagCode::UninitializedVariable => {
                write!(f, "variable '{}' is used before being assigned", self.arg(0))
            }
        }
    }
}

/// Write-only sink collecting diagnostics in emission order.
#[derive(Debug, Default, Serialize)]
pub struct Diagnostics {
    diags: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn add(
        &mut self,
        code: DiagCode,
        location: SourceLocation,
        args: Vec<DiagArg>,
    ) {
        self.diags.push(Diagnostic::new(code, location, args));
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.diags.push(diag);
    }

    pub fn extend(&mut self, diags: impl IntoIterator<Item = Diagnostic>) {
        self.diags.extend(diags);
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter()
    }

    /// True if any collected diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diags
            .iter()
            .any(|d| d.severity() == Severity::Error)
    }

    /// Drain all diagnostics, leaving the sink empty.
    pub fn drain(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diags)
    }

    /// Roll back to a previous length; used by speculative binds that are
    /// allowed to fail silently.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.diags.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let d = Diagnostic::new(
            DiagCode::UndeclaredIdentifier,
            SourceLocation::new(4, 2),
            vec!["foo".into()],
        );
        assert_eq!(d.to_string(), "5:3: use of undeclared identifier 'foo'");
    }

    #[test]
    fn test_severity_policy() {
        assert_eq!(DiagCode::WidthMismatch.severity(), Severity::Warning);
        assert_eq!(DiagCode::DivideByZero.severity(), Severity::Error);
    }

    #[test]
    fn test_sink_collects_in_order() {
        let mut sink = Diagnostics::new();
        sink.add(DiagCode::DivideByZero, SourceLocation::default(), vec![]);
        sink.add(
            DiagCode::WidthMismatch,
            SourceLocation::default(),
            vec![16u32.into(), 8u32.into()],
        );
        assert_eq!(sink.len(), 2);
        assert!(sink.has_errors());
        let codes: Vec<_> = sink.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![DiagCode::DivideByZero, DiagCode::WidthMismatch]);
    }

    #[test]
    fn test_serialize() {
        let d = Diagnostic::new(
            DiagCode::DivideByZero,
            SourceLocation::new(0, 0),
            vec![],
        );
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("DivideByZero"));
    }
}
