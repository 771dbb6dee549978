//! The engine: root object, built-in classes, `execute`, `add_native`.

use std::any::Any;
use std::rc::Rc;

use rill_lexer::{tokenize, TokenCursor, TokenKind};
use rill_runtime::{Builtins, NativeCallback, NodeRef};
use tracing::{debug, trace};

use crate::errors::{ScriptError, ScriptErrorKind};
use crate::exec::{self, call, ExecState};

/// An embeddable interpreter instance.
///
/// The engine owns the root (global) object and the three built-in class
/// objects (`String`, `Array`, `Object`), which are linked into the root
/// and live for the engine's lifetime. All engine state is inside the
/// shared value graph, so every method takes `&self` and cloning the
/// engine yields another handle to the *same* interpreter - which is how
/// a host passes the engine to a native callback as user data for
/// re-entrant `execute` calls.
///
/// # Execution model
///
/// `execute` builds a fresh execution context per call: token cursor over
/// the submitted source, scope stack reset to `[root]`, empty call stack.
/// Nested invocations from native callbacks therefore cannot see the
/// caller's local scopes, and the caller's context resumes untouched -
/// on every exit path, because the context is a stack value, not engine
/// state.
#[derive(Clone, Debug)]
pub struct Engine {
    root: NodeRef,
    builtins: Builtins,
}

impl Engine {
    /// Create an engine with an empty root and freshly linked built-in
    /// classes.
    pub fn new() -> Self {
        let root = NodeRef::object();
        let builtins = Builtins::new();
        builtins.link_into(&root);
        debug!("engine created");
        Engine { root, builtins }
    }

    /// The global object: pre-seed globals on it before running scripts,
    /// or inspect what a script left behind.
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// The built-in class singletons.
    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Run a script to completion.
    ///
    /// Any failure - lex, parse, or runtime - is annotated with the
    /// index and literal form of every scope active when it surfaced,
    /// then returned. There is no partial-success mode: mutations the
    /// script performed before failing remain visible.
    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        let mut state = ExecState::new(self);
        run_source(&mut state, source).map_err(|kind| {
            ScriptError::with_context(kind, state.scopes.dump(), state.calls.labels().to_vec())
        })
    }

    /// Register a host function under a dotted path.
    ///
    /// `prototype` has the form `function a.b.c(arg1, arg2)`: every path
    /// segment but the last is looked up or created as a plain object
    /// descending from the root, and the last becomes a native-function
    /// child. Because the built-in classes hang off the root,
    /// `function String.charAt(pos)` attaches to the `String` class
    /// itself.
    ///
    /// Errors (malformed prototype text) propagate without scope
    /// context: no script scopes are active at registration time.
    pub fn add_native(
        &self,
        prototype: &str,
        callback: NativeCallback,
        userdata: Option<Rc<dyn Any>>,
    ) -> Result<(), ScriptError> {
        self.register_native(prototype, callback, userdata)
            .map_err(ScriptError::bare)
    }

    fn register_native(
        &self,
        prototype: &str,
        callback: NativeCallback,
        userdata: Option<Rc<dyn Any>>,
    ) -> Result<(), ScriptErrorKind> {
        let tokens = tokenize(prototype)?;
        let mut cur = TokenCursor::new(&tokens, prototype);
        exec::expect(&mut cur, &TokenKind::Function)?;
        let mut base = self.root.clone();
        let mut name = exec::expect_ident(&mut cur)?;
        while exec::eat(&mut cur, &TokenKind::Dot) {
            let next = base.find_child(&name).unwrap_or_else(|| {
                let object = NodeRef::object();
                base.set_child(&name, &object);
                object
            });
            base = next;
            name = exec::expect_ident(&mut cur)?;
        }
        let func = NodeRef::native_function(callback, userdata);
        call::parse_parameters(&mut cur, &func)?;
        exec::expect(&mut cur, &TokenKind::Eof)?;
        base.set_child(&name, &func);
        debug!(path = prototype, "registered native function");
        Ok(())
    }

    /// Diagnostic hook: emit the object graph at TRACE level.
    pub fn trace(&self) {
        trace!(root = %self.root, "object graph");
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn run_source(state: &mut ExecState<'_>, source: &str) -> Result<(), ScriptErrorKind> {
    let tokens = tokenize(source)?;
    let mut cursor = TokenCursor::new(&tokens, source);
    while !cursor.is_at_end() {
        exec::statement(state, &mut cursor)?;
    }
    Ok(())
}
