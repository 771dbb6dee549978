//! Parse-as-you-execute statement entry points.
//!
//! The interpreter has no AST: statements are parsed and executed in one
//! pass. Control flow works by re-reading token ranges (loops rewind to a
//! saved mark) or by parsing in *skip mode* (untaken branches and
//! function bodies are consumed and validated, but every evaluation is
//! inert). `return` stores its value on the innermost call frame and
//! switches the state to skip mode for the rest of the body.
//!
//! All execution threads an explicit [`ExecState`] - engine handle, scope
//! stack, call stack, run/skip flag - so nested invocations (a native
//! callback calling back into the engine) simply build their own state
//! and can never corrupt this one.

pub(crate) mod call;
pub(crate) mod expr;

use rill_lexer::{TokenCursor, TokenKind};
use rill_runtime::{CallStack, NodeRef, ScopeStack, RETURN_NAME};
use tracing::trace;

use crate::engine::Engine;
use crate::errors::{unexpected_token, ScriptErrorKind};

/// Stack headroom below which recursion grows the stack.
pub(crate) const RED_ZONE: usize = 64 * 1024;

/// Stack chunk allocated when growing.
pub(crate) const STACK_CHUNK: usize = 1024 * 1024;

/// Everything one execution threads through the recursive descent.
pub(crate) struct ExecState<'e> {
    /// The engine (root, built-in classes) this execution runs against.
    pub(crate) engine: &'e Engine,
    /// Active scopes; index 0 is the engine root.
    pub(crate) scopes: ScopeStack,
    /// Diagnostic call-frame labels.
    pub(crate) calls: CallStack,
    /// Run mode (`true`) or skip mode (`false`).
    pub(crate) running: bool,
}

impl<'e> ExecState<'e> {
    /// Fresh state for one top-level `execute`: scope stack reset to
    /// `[root]`, empty call stack, run mode.
    pub(crate) fn new(engine: &'e Engine) -> Self {
        ExecState {
            engine,
            scopes: ScopeStack::new(engine.root().clone()),
            calls: CallStack::new(),
            running: true,
        }
    }
}

// === Cursor helpers ===

/// `true` when the current token is `kind`.
pub(crate) fn at(cur: &TokenCursor<'_>, kind: &TokenKind) -> bool {
    cur.current_kind() == kind
}

/// Consume the current token when it is `kind`.
pub(crate) fn eat(cur: &mut TokenCursor<'_>, kind: &TokenKind) -> bool {
    if at(cur, kind) {
        cur.advance();
        true
    } else {
        false
    }
}

/// Require and consume `kind`, or fail naming the token found.
pub(crate) fn expect(cur: &mut TokenCursor<'_>, kind: &TokenKind) -> Result<(), ScriptErrorKind> {
    if at(cur, kind) {
        cur.advance();
        Ok(())
    } else {
        Err(unexpected_token(kind.describe(), cur.current()))
    }
}

/// Require and consume an identifier, returning its name.
pub(crate) fn expect_ident(cur: &mut TokenCursor<'_>) -> Result<Box<str>, ScriptErrorKind> {
    match cur.current_kind() {
        TokenKind::Ident(name) => {
            let name = name.clone();
            cur.advance();
            Ok(name)
        }
        _ => Err(unexpected_token("identifier", cur.current())),
    }
}

// === Statements ===

/// Parse and (in run mode) execute one statement.
pub(crate) fn statement(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<(), ScriptErrorKind> {
    stacker::maybe_grow(RED_ZONE, STACK_CHUNK, || statement_inner(st, cur))
}

fn statement_inner(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<(), ScriptErrorKind> {
    match cur.current_kind() {
        TokenKind::Semi => {
            cur.advance();
            Ok(())
        }
        TokenKind::LBrace => block(st, cur),
        TokenKind::Var => var_statement(st, cur),
        TokenKind::If => if_statement(st, cur),
        TokenKind::While => while_statement(st, cur),
        TokenKind::For => for_statement(st, cur),
        TokenKind::Function => function_statement(st, cur),
        TokenKind::Return => return_statement(st, cur),
        _ => {
            expr::expression(st, cur)?;
            expect(cur, &TokenKind::Semi)
        }
    }
}

/// `{ statement* }`. Blocks do not open scopes; only function calls do.
pub(crate) fn block(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<(), ScriptErrorKind> {
    expect(cur, &TokenKind::LBrace)?;
    while !matches!(cur.current_kind(), TokenKind::RBrace | TokenKind::Eof) {
        statement(st, cur)?;
    }
    expect(cur, &TokenKind::RBrace)
}

/// Execute a statement normally, or force skip mode over it.
///
/// When forcing, the previous mode is restored afterwards. When running
/// normally the statement's own mode changes (a `return`) must
/// propagate, so nothing is restored.
fn run_or_skip(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
    take: bool,
) -> Result<(), ScriptErrorKind> {
    if take {
        statement(st, cur)
    } else {
        let saved = st.running;
        st.running = false;
        let result = statement(st, cur);
        st.running = saved;
        result
    }
}

/// `var a = expr, b;` - declares on the innermost scope.
fn var_statement(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<(), ScriptErrorKind> {
    expect(cur, &TokenKind::Var)?;
    loop {
        let name = expect_ident(cur)?;
        if eat(cur, &TokenKind::Assign) {
            let value = expr::expression(st, cur)?;
            if st.running {
                st.scopes.innermost().set_child(&name, &value);
            }
        } else if st.running {
            // Bare `var x;` keeps an existing binding intact.
            st.scopes
                .innermost()
                .declare_child(&name, &NodeRef::undefined());
        }
        if !eat(cur, &TokenKind::Comma) {
            break;
        }
    }
    expect(cur, &TokenKind::Semi)
}

fn if_statement(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<(), ScriptErrorKind> {
    expect(cur, &TokenKind::If)?;
    expect(cur, &TokenKind::LParen)?;
    let entry_running = st.running;
    let cond = expr::expression(st, cur)?;
    expect(cur, &TokenKind::RParen)?;
    let truthy = cond.truthy();
    run_or_skip(st, cur, entry_running && truthy)?;
    if eat(cur, &TokenKind::Else) {
        run_or_skip(st, cur, entry_running && !truthy)?;
    }
    Ok(())
}

fn while_statement(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<(), ScriptErrorKind> {
    expect(cur, &TokenKind::While)?;
    expect(cur, &TokenKind::LParen)?;
    let entry_running = st.running;
    let cond_mark = cur.mark();
    let first_cond = expr::expression(st, cur)?;
    expect(cur, &TokenKind::RParen)?;
    let body_mark = cur.mark();
    let mut take = entry_running && first_cond.truthy();
    run_or_skip(st, cur, take)?;
    let end_mark = cur.mark();
    if entry_running {
        while take && st.running {
            cur.rewind(cond_mark);
            let cond = expr::expression(st, cur)?;
            expect(cur, &TokenKind::RParen)?;
            take = cond.truthy();
            if take {
                cur.rewind(body_mark);
                statement(st, cur)?;
            }
        }
        cur.rewind(end_mark);
    }
    Ok(())
}

fn for_statement(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<(), ScriptErrorKind> {
    expect(cur, &TokenKind::For)?;
    expect(cur, &TokenKind::LParen)?;
    let entry_running = st.running;
    statement(st, cur)?; // init, with its own `;`
    let cond_mark = cur.mark();
    let first_cond = for_condition(st, cur)?;
    expect(cur, &TokenKind::Semi)?;
    let iter_mark = cur.mark();
    if !at(cur, &TokenKind::RParen) {
        // The iterator runs after each pass, never here.
        let saved = st.running;
        st.running = false;
        let parsed = expr::expression(st, cur);
        st.running = saved;
        parsed?;
    }
    expect(cur, &TokenKind::RParen)?;
    let body_mark = cur.mark();
    let take = entry_running && first_cond;
    run_or_skip(st, cur, take)?;
    let end_mark = cur.mark();
    if take {
        loop {
            if !st.running {
                break; // a `return` inside the body
            }
            cur.rewind(iter_mark);
            if !at(cur, &TokenKind::RParen) {
                expr::expression(st, cur)?;
            }
            cur.rewind(cond_mark);
            if !for_condition(st, cur)? {
                break;
            }
            cur.rewind(body_mark);
            statement(st, cur)?;
        }
        cur.rewind(end_mark);
    }
    Ok(())
}

/// A `for` condition; empty means "always true".
fn for_condition(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<bool, ScriptErrorKind> {
    if at(cur, &TokenKind::Semi) {
        Ok(true)
    } else {
        Ok(expr::expression(st, cur)?.truthy())
    }
}

fn function_statement(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<(), ScriptErrorKind> {
    expect(cur, &TokenKind::Function)?;
    let name = expect_ident(cur)?;
    let func = call::finish_function(st, cur)?;
    if st.running {
        st.scopes.innermost().set_child(&name, &func);
    }
    Ok(())
}

fn return_statement(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<(), ScriptErrorKind> {
    expect(cur, &TokenKind::Return)?;
    let value = if at(cur, &TokenKind::Semi) {
        NodeRef::undefined()
    } else {
        expr::expression(st, cur)?
    };
    expect(cur, &TokenKind::Semi)?;
    if st.running {
        trace!(depth = st.scopes.depth(), "return");
        st.scopes.innermost().set_child(RETURN_NAME, &value);
        st.running = false;
    }
    Ok(())
}
