//! Function definition, argument binding, and invocation.

use std::mem;

use rill_lexer::{TokenCursor, TokenKind};
use rill_runtime::{CompiledBody, NodeRef, ScopeStack, RETURN_NAME};
use tracing::trace;

use super::expr::{self, Eval, Origin};
use super::{block, eat, expect, expect_ident, ExecState};
use crate::errors::{member_not_found, not_callable, undefined_variable, ScriptErrorKind};

/// Parse `(a, b, c)`, binding each parameter as an undefined placeholder
/// child of `func`.
///
/// Placeholders go through `declare_child`, so a repeated parameter name
/// keeps its first binding. Fails on any token that is not an
/// identifier, `,`, or `)` - including end of input before the `)`.
pub(crate) fn parse_parameters(
    cur: &mut TokenCursor<'_>,
    func: &NodeRef,
) -> Result<(), ScriptErrorKind> {
    expect(cur, &TokenKind::LParen)?;
    if eat(cur, &TokenKind::RParen) {
        return Ok(());
    }
    loop {
        let name = expect_ident(cur)?;
        func.declare_child(&name, &NodeRef::undefined());
        if !eat(cur, &TokenKind::Comma) {
            break;
        }
    }
    expect(cur, &TokenKind::RParen)
}

/// Parse the parameter list and body of a function whose `function`
/// keyword (and optional name) the caller already consumed.
///
/// The body is parsed once in skip mode - consumed and syntax-checked,
/// effects discarded - and the exact source span between its braces'
/// marks is captured verbatim for deferred compilation. Nothing executes
/// here.
pub(crate) fn finish_function(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<NodeRef, ScriptErrorKind> {
    let func = NodeRef::script_function(CompiledBody::capture(""));
    parse_parameters(cur, &func)?;
    let body_start = cur.mark();
    let saved = st.running;
    st.running = false;
    let parsed = block(st, cur);
    st.running = saved;
    parsed?;
    let body_end = cur.mark();
    func.set_body(CompiledBody::capture(cur.slice(body_start, body_end)))?;
    Ok(func)
}

/// Parse a call's argument list and apply `callee`.
///
/// Arguments are evaluated in the caller's context and bound
/// positionally onto a fresh call frame; missing arguments bind
/// undefined, excess arguments are evaluated and discarded. Script
/// bodies recompile from their captured text and run against a scope
/// stack of `[root, frame]`; natives receive the frame directly. Either
/// way the frame's `"return"` child is the call's value.
///
/// On a failing body or callback, the frame and label intentionally stay
/// on their stacks: the top-level error snapshot must see them.
pub(crate) fn invoke(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
    callee: Eval,
) -> Result<Eval, ScriptErrorKind> {
    expect(cur, &TokenKind::LParen)?;
    let mut args: Vec<NodeRef> = Vec::new();
    if !eat(cur, &TokenKind::RParen) {
        loop {
            args.push(expr::expression(st, cur)?);
            if !eat(cur, &TokenKind::Comma) {
                break;
            }
        }
        expect(cur, &TokenKind::RParen)?;
    }
    if !st.running {
        return Ok(Eval::skipped());
    }

    match &callee.origin {
        Origin::UnresolvedIdent(name) => return Err(undefined_variable(name)),
        Origin::MissingMember { name, on } => return Err(member_not_found(name, *on)),
        Origin::Plain => {}
    }
    let func = callee.value;
    let label: Box<str> = callee
        .place
        .as_ref()
        .map_or_else(|| "(anonymous)".into(), |place| place.name.clone());
    if !func.is_function() {
        return Err(not_callable(&label, func.kind()));
    }

    let frame = NodeRef::object();
    let params = func.child_names();
    for (index, param) in params.iter().enumerate() {
        let value = args.get(index).cloned().unwrap_or_else(NodeRef::undefined);
        frame.set_child(param, &value);
    }
    frame.set_child(RETURN_NAME, &NodeRef::undefined());

    trace!(function = &*label, args = args.len(), "call");
    if let Some(native) = func.native() {
        st.calls.push(&label);
        native.invoke(&frame)?;
        st.calls.pop();
    } else if let Some(body) = func.body() {
        let tokens = body.compile()?;
        let mut body_cursor = TokenCursor::new(&tokens, body.text());
        // The body sees the root and its own frame, nothing of the
        // caller's locals: the visible stack is replaced for the call,
        // the same reset discipline `execute` applies per invocation.
        // With the index-0-first scan this is also what keeps recursion
        // sound - an accumulated outer frame would capture every lookup
        // of a same-named parameter.
        let saved_scopes = mem::replace(
            &mut st.scopes,
            ScopeStack::new(st.engine.root().clone()),
        );
        st.scopes.push(frame.clone());
        st.calls.push(&label);
        let saved_running = st.running;
        block(st, &mut body_cursor)?;
        st.running = saved_running;
        st.calls.pop();
        st.scopes = saved_scopes;
    }
    let result = frame
        .find_child(RETURN_NAME)
        .unwrap_or_else(NodeRef::undefined);
    trace!(function = &*label, "return");
    Ok(Eval::rvalue(result))
}
