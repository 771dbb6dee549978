//! Rill Runtime - the dynamic value graph of the Rill interpreter.
//!
//! Everything a running script touches is a [`ValueNode`] reached through
//! a [`NodeRef`] handle: objects, arrays, strings, numbers, and both
//! flavors of function. Nodes own their named children through [`Link`]s,
//! children keep insertion order (property enumeration order is
//! observable), and node lifetime is reference counting over the owning
//! links - a node stays alive exactly while it is reachable from the root
//! object, an active scope, or a live call frame.
//!
//! # Ownership model
//!
//! The handle type does the lifetime bookkeeping: cloning a [`NodeRef`]
//! takes a strong count, dropping one releases it, and the last drop
//! reclaims the node together with its owned children. Lookup results are
//! handle clones - aliases that can never dangle and never double-free.
//! All allocation goes through the factory methods on [`NodeRef`]
//! (`object()`, `number()`, ...); external code cannot construct a node
//! any other way.
//!
//! # Thread safety
//!
//! The graph is single-threaded by design (`Rc<RefCell<...>>`). Methods
//! take only short-lived interior borrows and return snapshots, so
//! re-entrant interpreter recursion never holds a borrow across a call.

mod body;
mod node;
mod resolve;
mod scope;

pub use body::CompiledBody;
pub use node::{
    InvariantError, Link, NativeCallback, NativeError, NativeHandle, NodeKind, NodeRef,
    RETURN_NAME,
};
pub use resolve::{resolve_member, Builtins, PROTOTYPE};
pub use scope::{CallStack, ScopeStack};
