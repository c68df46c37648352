//! Every error the compiler can produce, returned as a value at every
//! component boundary — nothing in this crate panics or is thrown across a
//! crate boundary. Each variant carries an optional [`Span`] when a source
//! position is available (registration errors and errors raised on
//! synthesized expressions have none).

use flowexpr_span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// One taxonomy entry per the error-kinds table: lexical/syntax, unknown
/// symbol, type/level, predicate cycle, operand, registration. `Internal`
/// is not user-facing; it marks a violated compiler invariant (a bug),
/// kept distinct so callers can tell "your expression is wrong" from
/// "the compiler is wrong" without us panicking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Lexical(Diagnostic),
    #[error("{0}")]
    Syntax(Diagnostic),
    #[error("{0}")]
    UnknownSymbol(Diagnostic),
    #[error("{0}")]
    TypeLevel(Diagnostic),
    #[error("{0}")]
    PredicateCycle(Diagnostic),
    #[error("{0}")]
    Operand(Diagnostic),
    #[error("{0}")]
    Registration(Diagnostic),
    #[error("internal compiler error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub span: Option<Span>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "{}: {}", span, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error {
    pub fn lexical(message: impl Into<String>, span: Span) -> Self {
        Error::Lexical(Diagnostic { message: message.into(), span: Some(span) })
    }

    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Error::Syntax(Diagnostic { message: message.into(), span: Some(span) })
    }

    pub fn unknown_symbol(name: impl fmt::Display, span: Span) -> Self {
        Error::UnknownSymbol(Diagnostic {
            message: format!("unknown symbol `{name}`"),
            span: Some(span),
        })
    }

    pub fn type_level(message: impl Into<String>, span: Span) -> Self {
        Error::TypeLevel(Diagnostic { message: message.into(), span: Some(span) })
    }

    pub fn predicate_cycle(chain: &[String]) -> Self {
        Error::PredicateCycle(Diagnostic {
            message: format!("predicate expansion cycle: {}", chain.join(" -> ")),
            span: None,
        })
    }

    pub fn operand(message: impl Into<String>, span: Span) -> Self {
        Error::Operand(Diagnostic { message: message.into(), span: Some(span) })
    }

    pub fn registration(message: impl Into<String>) -> Self {
        Error::Registration(Diagnostic { message: message.into(), span: None })
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// The span associated with this error, if any was recorded.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Lexical(d)
            | Error::Syntax(d)
            | Error::UnknownSymbol(d)
            | Error::TypeLevel(d)
            | Error::PredicateCycle(d)
            | Error::Operand(d)
            | Error::Registration(d) => d.span,
            Error::Internal(_) => None,
        }
    }
}
