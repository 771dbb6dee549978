//! Rill Engine - the embeddable execution engine for the Rill scripting
//! language.
//!
//! Hosts create an [`Engine`], optionally register native functions with
//! [`Engine::add_native`], and run scripts with [`Engine::execute`]. The
//! engine drives the recursive-descent parse-as-you-execute entry points
//! over the token stream from `rill_lexer` and the value graph from
//! `rill_runtime`.
//!
//! # Quick start
//!
//! ```
//! use rill_engine::Engine;
//!
//! let engine = Engine::new();
//! engine.execute("var answer = 6 * 7;")?;
//! assert_eq!(engine.root().find_child("answer").map(|n| n.as_number()), Some(42.0));
//! # Ok::<(), rill_engine::ScriptError>(())
//! ```

mod engine;
pub mod errors;
mod exec;

pub use engine::Engine;
pub use errors::{ParseError, RuntimeError, ScriptError, ScriptErrorKind};

// Re-export the value-graph surface hosts interact with.
pub use rill_runtime::{
    resolve_member, Builtins, CompiledBody, InvariantError, Link, NativeCallback, NativeError,
    NodeKind, NodeRef, PROTOTYPE, RETURN_NAME,
};
