//! The scope stack and the diagnostic call stack.

use crate::node::NodeRef;

/// Ordered sequence of active variable-lookup containers.
///
/// Index 0 is always the root object; function calls push one frame each.
///
/// # Lookup order
///
/// [`find`](ScopeStack::find) scans in stored order, index 0 first - the
/// outermost scope wins, not the innermost. Globals beat parameters of
/// the same name; that is the language's resolution order, deliberately
/// not "fixed" to innermost-first, which would silently alter shadowing
/// semantics.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<NodeRef>,
}

impl ScopeStack {
    /// A fresh stack containing only `root`.
    ///
    /// Every top-level `execute` starts here: locals of any other
    /// in-flight invocation are never visible.
    pub fn new(root: NodeRef) -> Self {
        ScopeStack { scopes: vec![root] }
    }

    /// Push a call frame.
    pub fn push(&mut self, scope: NodeRef) {
        self.scopes.push(scope);
    }

    /// Pop the most recent frame. The root at index 0 is never popped.
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// The most recently pushed scope (the root when no frame is active).
    /// `return` statements write their value here.
    pub fn innermost(&self) -> &NodeRef {
        // Invariant: scopes is never empty (index 0 is the root).
        &self.scopes[self.scopes.len() - 1]
    }

    /// Number of active scopes, root included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Find `name`, scanning index 0 first; returns the first match.
    pub fn find(&self, name: &str) -> Option<NodeRef> {
        self.find_with_owner(name).map(|(_, value)| value)
    }

    /// Like [`find`](ScopeStack::find), but also returns the scope object
    /// that owns the match (the assignment target container).
    pub fn find_with_owner(&self, name: &str) -> Option<(NodeRef, NodeRef)> {
        self.scopes
            .iter()
            .find_map(|scope| scope.find_child(name).map(|value| (scope.clone(), value)))
    }

    /// Literal form of every active scope, in stack order. Engine errors
    /// attach this as the scope dump.
    pub fn dump(&self) -> Vec<String> {
        self.scopes.iter().map(ToString::to_string).collect()
    }
}

/// Call-frame labels for diagnostics.
///
/// Pushed on call entry, popped on return; never consulted for variable
/// resolution.
#[derive(Debug, Default)]
pub struct CallStack {
    labels: Vec<Box<str>>,
}

impl CallStack {
    /// An empty call stack.
    pub fn new() -> Self {
        CallStack::default()
    }

    /// Record entry into a function.
    pub fn push(&mut self, label: &str) {
        self.labels.push(label.into());
    }

    /// Record return from the innermost function.
    pub fn pop(&mut self) {
        self.labels.pop();
    }

    /// Active frame labels, outermost first.
    pub fn labels(&self) -> &[Box<str>] {
        &self.labels
    }
}
