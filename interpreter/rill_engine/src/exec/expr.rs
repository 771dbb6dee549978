//! The expression ladder.
//!
//! Precedence, loosest to tightest: assignment, ternary, `||`, `&&`,
//! `|`, `^`, `&`, equality, relational (with shifts), additive,
//! multiplicative, unary, postfix, primary. Every level parses
//! unconditionally; evaluation happens only in run mode, so skip-mode
//! parses validate syntax without side effects.
//!
//! Member access and bare identifiers evaluate to a value *plus a place*
//! (container and child name), which is what assignment and the postfix
//! `++`/`--` write through - the typed successor of the original
//! link-returning style.

use rill_lexer::{TokenCursor, TokenKind};
use rill_runtime::{resolve_member, NodeKind, NodeRef};
use tracing::debug;

use super::{at, call, eat, expect, expect_ident, ExecState, RED_ZONE, STACK_CHUNK};
use crate::errors::{
    invalid_assignment_target, undefined_variable, unexpected_token, ScriptErrorKind,
};

/// An assignable slot: a container node plus a child name.
pub(crate) struct Place {
    pub(crate) container: NodeRef,
    pub(crate) name: Box<str>,
}

/// How an evaluation's value came to be, for resolution diagnostics.
pub(crate) enum Origin {
    /// An ordinary value.
    Plain,
    /// A bare identifier that resolved in no scope. Reading it is an
    /// error; assigning to it creates a root global.
    UnresolvedIdent(Box<str>),
    /// A member found neither on the object, its prototype chain, nor
    /// the built-in classes. Reads yield undefined; calls fail.
    MissingMember {
        name: Box<str>,
        on: NodeKind,
    },
}

/// Result of evaluating (or skip-parsing) an expression.
pub(crate) struct Eval {
    pub(crate) value: NodeRef,
    pub(crate) place: Option<Place>,
    pub(crate) origin: Origin,
}

impl Eval {
    pub(crate) fn rvalue(value: NodeRef) -> Self {
        Eval {
            value,
            place: None,
            origin: Origin::Plain,
        }
    }

    /// The inert result every skip-mode evaluation produces.
    pub(crate) fn skipped() -> Self {
        Self::rvalue(NodeRef::undefined())
    }
}

/// Evaluate one full expression to a value.
pub(crate) fn expression(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<NodeRef, ScriptErrorKind> {
    let eval = assignment(st, cur)?;
    value_of(st, eval)
}

/// Collapse an evaluation to its value. Reading an unresolved identifier
/// is a resolution error (in run mode only).
fn value_of(st: &ExecState<'_>, eval: Eval) -> Result<NodeRef, ScriptErrorKind> {
    if st.running {
        if let Origin::UnresolvedIdent(name) = &eval.origin {
            return Err(undefined_variable(name));
        }
    }
    Ok(eval.value)
}

enum AssignOp {
    Set,
    Add,
    Sub,
}

pub(crate) fn assignment(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<Eval, ScriptErrorKind> {
    let lhs = ternary(st, cur)?;
    let op = match cur.current_kind() {
        TokenKind::Assign => AssignOp::Set,
        TokenKind::PlusAssign => AssignOp::Add,
        TokenKind::MinusAssign => AssignOp::Sub,
        _ => return Ok(lhs),
    };
    cur.advance();
    let rhs = assignment(st, cur)?; // right-associative
    let rhs_value = value_of(st, rhs)?;
    if !st.running {
        return Ok(Eval::skipped());
    }
    let Some(place) = lhs.place else {
        return Err(invalid_assignment_target());
    };
    if let Origin::UnresolvedIdent(name) = &lhs.origin {
        if matches!(op, AssignOp::Set) {
            debug!(
                name = &**name,
                "assignment to undeclared identifier creates a root global"
            );
        } else {
            // `x += 1` still reads `x` first.
            return Err(undefined_variable(name));
        }
    }
    let value = match op {
        AssignOp::Set => rhs_value,
        AssignOp::Add => add_values(&lhs.value, &rhs_value),
        AssignOp::Sub => NodeRef::number(lhs.value.as_number() - rhs_value.as_number()),
    };
    place.container.set_child(&place.name, &value);
    Ok(Eval::rvalue(value))
}

fn ternary(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    let cond = logical_or(st, cur)?;
    if !eat(cur, &TokenKind::Question) {
        return Ok(cond);
    }
    let truthy = value_of(st, cond)?.truthy();
    let first = eval_in_mode(st, cur, truthy, assignment)?;
    expect(cur, &TokenKind::Colon)?;
    let second = eval_in_mode(st, cur, !truthy, assignment)?;
    if !st.running {
        return Ok(Eval::skipped());
    }
    let value = if truthy {
        value_of(st, first)?
    } else {
        value_of(st, second)?
    };
    Ok(Eval::rvalue(value))
}

/// Parse a sub-expression with run mode additionally gated on `active`
/// (short-circuiting, untaken ternary branches). The previous mode is
/// always restored: expressions cannot contain `return`.
fn eval_in_mode(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
    active: bool,
    level: fn(&mut ExecState<'_>, &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind>,
) -> Result<Eval, ScriptErrorKind> {
    let saved = st.running;
    st.running = saved && active;
    let result = level(st, cur);
    st.running = saved;
    result
}

fn bool_value(b: bool) -> NodeRef {
    NodeRef::number(if b { 1.0 } else { 0.0 })
}

fn logical_or(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    let mut lhs = logical_and(st, cur)?;
    while eat(cur, &TokenKind::OrOr) {
        let lhs_truthy = value_of(st, lhs)?.truthy();
        let rhs = eval_in_mode(st, cur, !lhs_truthy, logical_and)?;
        lhs = if !st.running {
            Eval::skipped()
        } else if lhs_truthy {
            Eval::rvalue(bool_value(true))
        } else {
            Eval::rvalue(bool_value(value_of(st, rhs)?.truthy()))
        };
    }
    Ok(lhs)
}

fn logical_and(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    let mut lhs = bit_or(st, cur)?;
    while eat(cur, &TokenKind::AndAnd) {
        let lhs_truthy = value_of(st, lhs)?.truthy();
        let rhs = eval_in_mode(st, cur, lhs_truthy, bit_or)?;
        lhs = if !st.running {
            Eval::skipped()
        } else if !lhs_truthy {
            Eval::rvalue(bool_value(false))
        } else {
            Eval::rvalue(bool_value(value_of(st, rhs)?.truthy()))
        };
    }
    Ok(lhs)
}

/// Binary operators at one precedence level.
#[derive(Clone, Copy)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

/// One left-associative precedence level.
fn binary_level(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
    next: fn(&mut ExecState<'_>, &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind>,
    ops: &[(TokenKind, BinaryOp)],
) -> Result<Eval, ScriptErrorKind> {
    let mut lhs = next(st, cur)?;
    loop {
        let Some(op) = ops
            .iter()
            .find(|(kind, _)| at(cur, kind))
            .map(|(_, op)| *op)
        else {
            return Ok(lhs);
        };
        cur.advance();
        let rhs = next(st, cur)?;
        lhs = apply_binary(st, op, lhs, rhs)?;
    }
}

fn bit_or(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    binary_level(st, cur, bit_xor, &[(TokenKind::Pipe, BinaryOp::BitOr)])
}

fn bit_xor(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    binary_level(st, cur, bit_and, &[(TokenKind::Caret, BinaryOp::BitXor)])
}

fn bit_and(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    binary_level(st, cur, equality, &[(TokenKind::Amp, BinaryOp::BitAnd)])
}

fn equality(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    binary_level(
        st,
        cur,
        relational,
        &[
            (TokenKind::EqEqEq, BinaryOp::StrictEq),
            (TokenKind::NotEqEq, BinaryOp::StrictNe),
            (TokenKind::EqEq, BinaryOp::Eq),
            (TokenKind::NotEq, BinaryOp::Ne),
        ],
    )
}

fn relational(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    binary_level(
        st,
        cur,
        additive,
        &[
            (TokenKind::LtEq, BinaryOp::Le),
            (TokenKind::GtEq, BinaryOp::Ge),
            (TokenKind::Shl, BinaryOp::Shl),
            (TokenKind::Shr, BinaryOp::Shr),
            (TokenKind::Lt, BinaryOp::Lt),
            (TokenKind::Gt, BinaryOp::Gt),
        ],
    )
}

fn additive(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    binary_level(
        st,
        cur,
        multiplicative,
        &[
            (TokenKind::Plus, BinaryOp::Add),
            (TokenKind::Minus, BinaryOp::Sub),
        ],
    )
}

fn multiplicative(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<Eval, ScriptErrorKind> {
    binary_level(
        st,
        cur,
        unary,
        &[
            (TokenKind::Star, BinaryOp::Mul),
            (TokenKind::Slash, BinaryOp::Div),
            (TokenKind::Percent, BinaryOp::Rem),
        ],
    )
}

fn apply_binary(
    st: &ExecState<'_>,
    op: BinaryOp,
    lhs: Eval,
    rhs: Eval,
) -> Result<Eval, ScriptErrorKind> {
    let a = value_of(st, lhs)?;
    let b = value_of(st, rhs)?;
    if !st.running {
        return Ok(Eval::skipped());
    }
    let both_strings = a.is_string() && b.is_string();
    let value = match op {
        BinaryOp::Add => add_values(&a, &b),
        BinaryOp::Sub => NodeRef::number(a.as_number() - b.as_number()),
        BinaryOp::Mul => NodeRef::number(a.as_number() * b.as_number()),
        BinaryOp::Div => NodeRef::number(a.as_number() / b.as_number()),
        BinaryOp::Rem => NodeRef::number(a.as_number() % b.as_number()),
        BinaryOp::BitAnd => int_result(to_int(&a) & to_int(&b)),
        BinaryOp::BitOr => int_result(to_int(&a) | to_int(&b)),
        BinaryOp::BitXor => int_result(to_int(&a) ^ to_int(&b)),
        BinaryOp::Shl => int_result(to_int(&a).wrapping_shl(shift_amount(&b))),
        BinaryOp::Shr => int_result(to_int(&a).wrapping_shr(shift_amount(&b))),
        BinaryOp::Eq => bool_value(loose_equals(&a, &b)),
        BinaryOp::Ne => bool_value(!loose_equals(&a, &b)),
        BinaryOp::StrictEq => bool_value(strict_equals(&a, &b)),
        BinaryOp::StrictNe => bool_value(!strict_equals(&a, &b)),
        BinaryOp::Lt => bool_value(if both_strings {
            a.as_string() < b.as_string()
        } else {
            a.as_number() < b.as_number()
        }),
        BinaryOp::Le => bool_value(if both_strings {
            a.as_string() <= b.as_string()
        } else {
            a.as_number() <= b.as_number()
        }),
        BinaryOp::Gt => bool_value(if both_strings {
            a.as_string() > b.as_string()
        } else {
            a.as_number() > b.as_number()
        }),
        BinaryOp::Ge => bool_value(if both_strings {
            a.as_string() >= b.as_string()
        } else {
            a.as_number() >= b.as_number()
        }),
    };
    Ok(Eval::rvalue(value))
}

/// `+` concatenates when either operand is a string, else adds.
fn add_values(a: &NodeRef, b: &NodeRef) -> NodeRef {
    if a.is_string() || b.is_string() {
        NodeRef::string(format!("{}{}", a.as_string(), b.as_string()))
    } else {
        NodeRef::number(a.as_number() + b.as_number())
    }
}

fn loose_equals(a: &NodeRef, b: &NodeRef) -> bool {
    if a.is_string() && b.is_string() {
        return a.as_string() == b.as_string();
    }
    if a.is_undefined() && b.is_undefined() {
        return true;
    }
    let a_ref = a.is_object() || a.is_array() || a.is_function();
    let b_ref = b.is_object() || b.is_array() || b.is_function();
    if a_ref || b_ref {
        return a_ref && b_ref && NodeRef::ptr_eq(a, b);
    }
    a.as_number() == b.as_number()
}

fn strict_equals(a: &NodeRef, b: &NodeRef) -> bool {
    if a.kind() != b.kind() {
        return false;
    }
    match a.kind() {
        NodeKind::Undefined => true,
        NodeKind::Number => a.as_number() == b.as_number(),
        NodeKind::String => a.as_string() == b.as_string(),
        NodeKind::Object
        | NodeKind::Array
        | NodeKind::ScriptFunction
        | NodeKind::NativeFunction => NodeRef::ptr_eq(a, b),
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "script bitwise operators run on 64-bit integer lanes"
)]
fn to_int(value: &NodeRef) -> i64 {
    let n = value.as_number();
    if n.is_nan() {
        0
    } else {
        n as i64
    }
}

fn shift_amount(value: &NodeRef) -> u32 {
    u32::try_from(to_int(value) & 63).unwrap_or(0)
}

#[expect(
    clippy::cast_precision_loss,
    reason = "integer results return to the script's f64 number kind"
)]
fn int_result(n: i64) -> NodeRef {
    NodeRef::number(n as f64)
}

fn unary(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    if eat(cur, &TokenKind::Bang) {
        let inner = unary(st, cur)?;
        let operand = value_of(st, inner)?;
        if !st.running {
            return Ok(Eval::skipped());
        }
        return Ok(Eval::rvalue(bool_value(!operand.truthy())));
    }
    if eat(cur, &TokenKind::Minus) {
        let inner = unary(st, cur)?;
        let operand = value_of(st, inner)?;
        if !st.running {
            return Ok(Eval::skipped());
        }
        return Ok(Eval::rvalue(NodeRef::number(-operand.as_number())));
    }
    postfix(st, cur)
}

fn postfix(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    let target = factor(st, cur)?;
    let step = match cur.current_kind() {
        TokenKind::PlusPlus => 1.0,
        TokenKind::MinusMinus => -1.0,
        _ => return Ok(target),
    };
    cur.advance();
    if !st.running {
        return Ok(Eval::skipped());
    }
    if let Origin::UnresolvedIdent(name) = &target.origin {
        return Err(undefined_variable(name));
    }
    let Some(place) = &target.place else {
        return Err(invalid_assignment_target());
    };
    let old = target.value.as_number();
    place
        .container
        .set_child(&place.name, &NodeRef::number(old + step));
    Ok(Eval::rvalue(NodeRef::number(old)))
}

/// A primary expression followed by its postfix chain: member access,
/// index access, calls.
fn factor(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    stacker::maybe_grow(RED_ZONE, STACK_CHUNK, || factor_inner(st, cur))
}

fn factor_inner(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    let mut eval = primary(st, cur)?;
    loop {
        match cur.current_kind() {
            TokenKind::Dot => {
                cur.advance();
                let name = expect_ident(cur)?;
                eval = member_access(st, eval, &name)?;
            }
            TokenKind::LBracket => {
                cur.advance();
                let index = expression(st, cur)?;
                expect(cur, &TokenKind::RBracket)?;
                eval = member_access(st, eval, &index.as_string())?;
            }
            TokenKind::LParen => {
                eval = call::invoke(st, cur, eval)?;
            }
            _ => return Ok(eval),
        }
    }
}

/// `object.name` / `object[name]`: own children first, then the
/// prototype chain and built-in classes. The result always carries the
/// place `(object, name)` so assignment creates an own child, shadowing
/// anything inherited.
fn member_access(
    st: &ExecState<'_>,
    base: Eval,
    name: &str,
) -> Result<Eval, ScriptErrorKind> {
    if !st.running {
        return Ok(Eval::skipped());
    }
    let object = value_of(st, base)?;
    let found = object
        .find_child(name)
        .or_else(|| resolve_member(&object, name, st.engine.builtins()));
    let origin = match &found {
        Some(_) => Origin::Plain,
        None => Origin::MissingMember {
            name: name.into(),
            on: object.kind(),
        },
    };
    Ok(Eval {
        value: found.unwrap_or_else(NodeRef::undefined),
        place: Some(Place {
            container: object,
            name: name.into(),
        }),
        origin,
    })
}

fn primary(st: &mut ExecState<'_>, cur: &mut TokenCursor<'_>) -> Result<Eval, ScriptErrorKind> {
    match cur.current_kind() {
        TokenKind::Number(n) => {
            let n = *n;
            cur.advance();
            Ok(if st.running {
                Eval::rvalue(NodeRef::number(n))
            } else {
                Eval::skipped()
            })
        }
        TokenKind::Str(text) => {
            let text = text.clone();
            cur.advance();
            Ok(if st.running {
                Eval::rvalue(NodeRef::string(text))
            } else {
                Eval::skipped()
            })
        }
        TokenKind::True => {
            cur.advance();
            Ok(Eval::rvalue(bool_value(true)))
        }
        TokenKind::False => {
            cur.advance();
            Ok(Eval::rvalue(bool_value(false)))
        }
        TokenKind::Null | TokenKind::Undefined => {
            cur.advance();
            Ok(Eval::skipped())
        }
        TokenKind::Ident(name) => {
            let name = name.clone();
            cur.advance();
            Ok(identifier(st, name))
        }
        TokenKind::LParen => {
            cur.advance();
            let inner = assignment(st, cur)?;
            expect(cur, &TokenKind::RParen)?;
            Ok(inner)
        }
        TokenKind::LBrace => object_literal(st, cur),
        TokenKind::LBracket => array_literal(st, cur),
        TokenKind::Function => {
            cur.advance();
            if matches!(cur.current_kind(), TokenKind::Ident(_)) {
                // Named function expressions: the name is not bound.
                expect_ident(cur)?;
            }
            let func = call::finish_function(st, cur)?;
            Ok(Eval::rvalue(func))
        }
        _ => Err(unexpected_token("an expression", cur.current())),
    }
}

/// Resolve a bare identifier against the scope stack (index 0 first).
/// Unknown names stay assignable: their place targets the root object.
fn identifier(st: &ExecState<'_>, name: Box<str>) -> Eval {
    if !st.running {
        return Eval::skipped();
    }
    match st.scopes.find_with_owner(&name) {
        Some((owner, value)) => Eval {
            value,
            place: Some(Place {
                container: owner,
                name,
            }),
            origin: Origin::Plain,
        },
        None => Eval {
            value: NodeRef::undefined(),
            place: Some(Place {
                container: st.engine.root().clone(),
                name: name.clone(),
            }),
            origin: Origin::UnresolvedIdent(name),
        },
    }
}

fn object_literal(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<Eval, ScriptErrorKind> {
    expect(cur, &TokenKind::LBrace)?;
    let object = st.running.then(NodeRef::object);
    if !eat(cur, &TokenKind::RBrace) {
        loop {
            let key = match cur.current_kind() {
                TokenKind::Ident(name) => name.clone(),
                TokenKind::Str(text) => text.clone(),
                _ => return Err(unexpected_token("property name", cur.current())),
            };
            cur.advance();
            expect(cur, &TokenKind::Colon)?;
            let value = expression(st, cur)?;
            if let Some(object) = &object {
                object.set_child(&key, &value);
            }
            if !eat(cur, &TokenKind::Comma) || at(cur, &TokenKind::RBrace) {
                break;
            }
        }
        expect(cur, &TokenKind::RBrace)?;
    }
    Ok(object.map_or_else(Eval::skipped, Eval::rvalue))
}

fn array_literal(
    st: &mut ExecState<'_>,
    cur: &mut TokenCursor<'_>,
) -> Result<Eval, ScriptErrorKind> {
    expect(cur, &TokenKind::LBracket)?;
    let array = st.running.then(NodeRef::array);
    if !eat(cur, &TokenKind::RBracket) {
        let mut index = 0usize;
        loop {
            let value = expression(st, cur)?;
            if let Some(array) = &array {
                array.set_child(&index.to_string(), &value);
            }
            index += 1;
            if !eat(cur, &TokenKind::Comma) || at(cur, &TokenKind::RBracket) {
                break;
            }
        }
        expect(cur, &TokenKind::RBracket)?;
    }
    Ok(array.map_or_else(Eval::skipped, Eval::rvalue))
}
