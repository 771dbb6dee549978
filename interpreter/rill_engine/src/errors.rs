//! Engine error types and constructors.
//!
//! Three error families reach the host through [`ScriptError`]:
//! lex failures from tokenization, parse failures from `expect`-style
//! token mismatches, and runtime failures (resolution misses, bad calls,
//! native errors, internal invariant violations). Failures raised while
//! `execute` runs are annotated once, at the top level, with a dump of
//! every active scope; failures from `add_native` propagate bare since no
//! script scopes are active at registration time.

use std::fmt;

use rill_lexer::{LexError, Span, Token};
use rill_runtime::{InvariantError, NativeError, NodeKind};

/// A token mismatch: something specific was required, something else was
/// found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    /// What the parser required here.
    pub expected: &'static str,
    /// Description of the token actually found.
    pub found: &'static str,
    /// Where the offending token sits.
    pub span: Span,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {}, found {} at bytes {}",
            self.expected, self.found, self.span
        )
    }
}

impl std::error::Error for ParseError {}

/// A failure while executing otherwise well-formed script.
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeError {
    /// An identifier was read but found in no active scope.
    UndefinedVariable {
        /// The unresolved name.
        name: Box<str>,
    },
    /// A member was called but resolved nowhere - not on the object, its
    /// prototype chain, or the built-in classes.
    MemberNotFound {
        /// The member name.
        name: Box<str>,
        /// Kind of the value it was looked up on.
        on: NodeKind,
    },
    /// A call applied to a value that is not a function.
    NotCallable {
        /// The callee's name as written.
        name: Box<str>,
        /// The kind it actually had.
        kind: NodeKind,
    },
    /// Assignment to something that designates no storage slot.
    InvalidAssignmentTarget,
    /// A host callback reported failure.
    Native(NativeError),
    /// Wrong-kind operation inside the engine - a host/engine bug, not a
    /// script error; treat as non-recoverable.
    Internal(InvariantError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UndefinedVariable { name } => {
                write!(f, "`{name}` is not defined in any scope")
            }
            RuntimeError::MemberNotFound { name, on } => {
                write!(f, "member `{name}` not found on {on} value")
            }
            RuntimeError::NotCallable { name, kind } => {
                write!(f, "`{name}` is not a function (found {kind})")
            }
            RuntimeError::InvalidAssignmentTarget => f.write_str("invalid assignment target"),
            RuntimeError::Native(err) => err.fmt(f),
            RuntimeError::Internal(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// The error family a [`ScriptError`] wraps.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptErrorKind {
    /// Tokenization failed.
    Lex(LexError),
    /// A token mismatch.
    Parse(ParseError),
    /// Execution failed.
    Runtime(RuntimeError),
}

impl fmt::Display for ScriptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptErrorKind::Lex(err) => err.fmt(f),
            ScriptErrorKind::Parse(err) => err.fmt(f),
            ScriptErrorKind::Runtime(err) => err.fmt(f),
        }
    }
}

impl From<LexError> for ScriptErrorKind {
    fn from(err: LexError) -> Self {
        ScriptErrorKind::Lex(err)
    }
}

impl From<ParseError> for ScriptErrorKind {
    fn from(err: ParseError) -> Self {
        ScriptErrorKind::Parse(err)
    }
}

impl From<RuntimeError> for ScriptErrorKind {
    fn from(err: RuntimeError) -> Self {
        ScriptErrorKind::Runtime(err)
    }
}

impl From<InvariantError> for ScriptErrorKind {
    fn from(err: InvariantError) -> Self {
        ScriptErrorKind::Runtime(RuntimeError::Internal(err))
    }
}

impl From<NativeError> for ScriptErrorKind {
    fn from(err: NativeError) -> Self {
        ScriptErrorKind::Runtime(RuntimeError::Native(err))
    }
}

/// The public failure type of [`Engine`](crate::Engine) operations.
///
/// Carries the proximate cause plus, for failures inside `execute`, the
/// diagnostic snapshot: the literal form of every scope active when the
/// failure surfaced, and the call-frame labels.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptError {
    kind: ScriptErrorKind,
    scope_dump: Vec<String>,
    call_labels: Vec<Box<str>>,
}

impl ScriptError {
    /// Wrap a failure with no execution context (registration-time
    /// errors).
    pub(crate) fn bare(kind: ScriptErrorKind) -> Self {
        ScriptError {
            kind,
            scope_dump: Vec::new(),
            call_labels: Vec::new(),
        }
    }

    /// Wrap a failure raised during `execute` with its scope snapshot.
    pub(crate) fn with_context(
        kind: ScriptErrorKind,
        scope_dump: Vec<String>,
        call_labels: Vec<Box<str>>,
    ) -> Self {
        ScriptError {
            kind,
            scope_dump,
            call_labels,
        }
    }

    /// The proximate cause.
    pub fn kind(&self) -> &ScriptErrorKind {
        &self.kind
    }

    /// Literal form of every scope active at failure time, index order.
    /// Empty for registration-time errors.
    pub fn scope_dump(&self) -> &[String] {
        &self.scope_dump
    }

    /// Call-frame labels active at failure time, outermost first.
    pub fn call_labels(&self) -> &[Box<str>] {
        &self.call_labels
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)?;
        for (index, scope) in self.scope_dump.iter().enumerate() {
            write!(f, "\n  scope {index}: {scope}")?;
        }
        if !self.call_labels.is_empty() {
            write!(f, "\n  call stack: {}", self.call_labels.join(" > "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ScriptErrorKind::Lex(err) => Some(err),
            ScriptErrorKind::Parse(err) => Some(err),
            ScriptErrorKind::Runtime(err) => Some(err),
        }
    }
}

// Error constructors.

/// A specific token was required; `token` was found instead.
pub fn unexpected_token(expected: &'static str, token: &Token) -> ScriptErrorKind {
    ScriptErrorKind::Parse(ParseError {
        expected,
        found: token.kind.describe(),
        span: token.span,
    })
}

/// An identifier was read but resolved in no scope.
pub fn undefined_variable(name: &str) -> ScriptErrorKind {
    ScriptErrorKind::Runtime(RuntimeError::UndefinedVariable { name: name.into() })
}

/// A member call resolved nowhere.
pub fn member_not_found(name: &str, on: NodeKind) -> ScriptErrorKind {
    ScriptErrorKind::Runtime(RuntimeError::MemberNotFound {
        name: name.into(),
        on,
    })
}

/// A call was applied to a non-function value.
pub fn not_callable(name: &str, kind: NodeKind) -> ScriptErrorKind {
    ScriptErrorKind::Runtime(RuntimeError::NotCallable {
        name: name.into(),
        kind,
    })
}

/// Assignment to an expression that designates no slot.
pub fn invalid_assignment_target() -> ScriptErrorKind {
    ScriptErrorKind::Runtime(RuntimeError::InvalidAssignmentTarget)
}
