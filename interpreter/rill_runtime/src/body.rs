//! Deferred compilation of function bodies.

use std::rc::Rc;

use rill_lexer::{tokenize, LexError, TokenList};

/// The captured, still-unparsed body of a script function.
///
/// At definition time the interpreter stores the exact source span of the
/// body (`{ ... }`, braces included) without building any AST. Each
/// invocation re-tokenizes that text from scratch - a deliberate
/// simplicity-over-performance trade-off. The abstraction boundary is
/// here on purpose: a caching or bytecode strategy would replace
/// [`compile`](CompiledBody::compile) without touching any caller.
///
/// Cloning shares the text.
#[derive(Clone, Debug)]
pub struct CompiledBody {
    text: Rc<str>,
}

impl CompiledBody {
    /// Capture a body span verbatim.
    pub fn capture(text: impl Into<Rc<str>>) -> Self {
        CompiledBody { text: text.into() }
    }

    /// The captured source text, braces included.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Tokenize the captured text for one invocation.
    ///
    /// Re-tokenization is idempotent: the same text yields an equivalent
    /// stream on every call.
    pub fn compile(&self) -> Result<TokenList, LexError> {
        tokenize(&self.text)
    }
}

impl PartialEq for CompiledBody {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}
