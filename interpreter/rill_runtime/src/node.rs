//! Value nodes, links, and the shared-ownership handle.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::body::CompiledBody;

/// Name of the reserved call-frame slot a `return` statement writes to.
pub const RETURN_NAME: &str = "return";

/// Nesting depth at which literal formatting gives up on a graph and
/// prints `...` instead (self-referential objects are legal).
const MAX_LITERAL_DEPTH: usize = 16;

/// The kind of a value node.
///
/// A closed variant: every consumer (resolver, formatter, executor) is
/// forced to handle all kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// The absent value.
    Undefined,
    /// An `f64` number.
    Number,
    /// A text string.
    String,
    /// A plain object.
    Object,
    /// An array (an object whose children are named by index).
    Array,
    /// A function with a captured, deferred source body.
    ScriptFunction,
    /// A function backed by a host callback.
    NativeFunction,
}

impl NodeKind {
    /// Lower-case kind name for diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            NodeKind::Undefined => "undefined",
            NodeKind::Number => "number",
            NodeKind::String => "string",
            NodeKind::Object => "object",
            NodeKind::Array => "array",
            NodeKind::ScriptFunction => "function",
            NodeKind::NativeFunction => "native function",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Error raised by a host-native callback.
///
/// The engine wraps this into its script-error type; the message is the
/// only payload a host needs to surface a failure to script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeError {
    message: String,
}

impl NativeError {
    /// Create a new native failure.
    pub fn new(message: impl Into<String>) -> Self {
        NativeError {
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "native function failed: {}", self.message)
    }
}

impl std::error::Error for NativeError {}

/// Host callback invoked when script calls a native function.
///
/// Receives the call-frame node (arguments are its named children; the
/// callback may set the `"return"` child) and the opaque user data the
/// host registered alongside the function.
pub type NativeCallback = fn(&NodeRef, Option<&Rc<dyn Any>>) -> Result<(), NativeError>;

/// A registered native callback plus its opaque user data.
#[derive(Clone)]
pub struct NativeHandle {
    callback: NativeCallback,
    userdata: Option<Rc<dyn Any>>,
}

impl NativeHandle {
    /// Pair a callback with its user data.
    pub fn new(callback: NativeCallback, userdata: Option<Rc<dyn Any>>) -> Self {
        NativeHandle { callback, userdata }
    }

    /// Invoke the callback against a call frame.
    pub fn invoke(&self, frame: &NodeRef) -> Result<(), NativeError> {
        (self.callback)(frame, self.userdata.as_ref())
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle").finish_non_exhaustive()
    }
}

/// Internal invariant violation: an operation applied to a node of the
/// wrong kind. A host/engine bug, not a recoverable script error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvariantError {
    /// The operation that was attempted.
    pub operation: &'static str,
    /// The kind the operation requires.
    pub expected: NodeKind,
    /// The kind it was applied to.
    pub found: NodeKind,
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "internal invariant violated: {} requires a {} node, found {}",
            self.operation, self.expected, self.found
        )
    }
}

impl std::error::Error for InvariantError {}

/// Kind-specific payload of a node.
#[derive(Debug)]
enum Payload {
    Undefined,
    Number(f64),
    String(String),
    Object,
    Array,
    Script(CompiledBody),
    Native(NativeHandle),
}

impl Payload {
    fn kind(&self) -> NodeKind {
        match self {
            Payload::Undefined => NodeKind::Undefined,
            Payload::Number(_) => NodeKind::Number,
            Payload::String(_) => NodeKind::String,
            Payload::Object => NodeKind::Object,
            Payload::Array => NodeKind::Array,
            Payload::Script(_) => NodeKind::ScriptFunction,
            Payload::Native(_) => NodeKind::NativeFunction,
        }
    }
}

/// A named, owning reference from a container node to a child node.
///
/// The link holds one strong count on its target for as long as it
/// exists; replacing or removing it releases that count.
#[derive(Clone, Debug)]
pub struct Link {
    name: Box<str>,
    target: NodeRef,
}

impl Link {
    /// The child's name, unique within its container.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The linked node.
    pub fn target(&self) -> &NodeRef {
        &self.target
    }
}

/// A dynamically-typed runtime value with named, ref-counted children.
#[derive(Debug)]
pub struct ValueNode {
    payload: Payload,
    children: SmallVec<[Link; 4]>,
}

/// Shared-ownership handle to a [`ValueNode`].
///
/// The only way to create nodes is through the factory methods here;
/// cloning the handle is the ref-count increment, dropping it the
/// decrement. Equality of identity is [`NodeRef::ptr_eq`].
#[derive(Clone)]
pub struct NodeRef(Rc<RefCell<ValueNode>>);

impl NodeRef {
    fn alloc(payload: Payload) -> Self {
        NodeRef(Rc::new(RefCell::new(ValueNode {
            payload,
            children: SmallVec::new(),
        })))
    }

    /// The undefined value.
    #[inline]
    pub fn undefined() -> Self {
        Self::alloc(Payload::Undefined)
    }

    /// A number value.
    #[inline]
    pub fn number(value: f64) -> Self {
        Self::alloc(Payload::Number(value))
    }

    /// A string value.
    #[inline]
    pub fn string(text: impl Into<String>) -> Self {
        Self::alloc(Payload::String(text.into()))
    }

    /// An empty object.
    #[inline]
    pub fn object() -> Self {
        Self::alloc(Payload::Object)
    }

    /// An empty array.
    #[inline]
    pub fn array() -> Self {
        Self::alloc(Payload::Array)
    }

    /// A script function with a captured body.
    #[inline]
    pub fn script_function(body: CompiledBody) -> Self {
        Self::alloc(Payload::Script(body))
    }

    /// A native function.
    #[inline]
    pub fn native_function(callback: NativeCallback, userdata: Option<Rc<dyn Any>>) -> Self {
        Self::alloc(Payload::Native(NativeHandle::new(callback, userdata)))
    }

    // === Classification ===

    /// This node's kind tag.
    pub fn kind(&self) -> NodeKind {
        self.0.borrow().payload.kind()
    }

    /// `true` for the undefined value.
    pub fn is_undefined(&self) -> bool {
        self.kind() == NodeKind::Undefined
    }

    /// `true` for numbers.
    pub fn is_number(&self) -> bool {
        self.kind() == NodeKind::Number
    }

    /// `true` for strings.
    pub fn is_string(&self) -> bool {
        self.kind() == NodeKind::String
    }

    /// `true` for plain objects.
    pub fn is_object(&self) -> bool {
        self.kind() == NodeKind::Object
    }

    /// `true` for arrays.
    pub fn is_array(&self) -> bool {
        self.kind() == NodeKind::Array
    }

    /// `true` for either function kind.
    pub fn is_function(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::ScriptFunction | NodeKind::NativeFunction
        )
    }

    // === Payload access ===

    /// Numeric coercion: numbers as themselves, strings parsed (NaN when
    /// not numeric), undefined as `0`, containers and functions as NaN.
    pub fn as_number(&self) -> f64 {
        match &self.0.borrow().payload {
            Payload::Undefined => 0.0,
            Payload::Number(n) => *n,
            Payload::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
            Payload::Object | Payload::Array | Payload::Script(_) | Payload::Native(_) => f64::NAN,
        }
    }

    /// String coercion: strings as their text, numbers via their display
    /// form, everything else via the literal form.
    pub fn as_string(&self) -> String {
        match &self.0.borrow().payload {
            Payload::Undefined => "undefined".to_string(),
            Payload::Number(n) => format_number(*n),
            Payload::String(s) => s.clone(),
            Payload::Object
            | Payload::Array
            | Payload::Script(_)
            | Payload::Native(_) => self.to_string(),
        }
    }

    /// Condition coercion: nonzero numbers, nonempty strings, and all
    /// objects/arrays/functions are true.
    pub fn truthy(&self) -> bool {
        match &self.0.borrow().payload {
            Payload::Undefined => false,
            Payload::Number(n) => *n != 0.0 && !n.is_nan(),
            Payload::String(s) => !s.is_empty(),
            Payload::Object | Payload::Array | Payload::Script(_) | Payload::Native(_) => true,
        }
    }

    /// The captured body of a script function, if this is one.
    pub fn body(&self) -> Option<CompiledBody> {
        match &self.0.borrow().payload {
            Payload::Script(body) => Some(body.clone()),
            _ => None,
        }
    }

    /// The callback handle of a native function, if this is one.
    pub fn native(&self) -> Option<NativeHandle> {
        match &self.0.borrow().payload {
            Payload::Native(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Store a deferred body on a script function node.
    pub fn set_body(&self, body: CompiledBody) -> Result<(), InvariantError> {
        let mut node = self.0.borrow_mut();
        match node.payload.kind() {
            NodeKind::ScriptFunction => {
                node.payload = Payload::Script(body);
                Ok(())
            }
            found => Err(InvariantError {
                operation: "set_body",
                expected: NodeKind::ScriptFunction,
                found,
            }),
        }
    }

    /// Turn a function node into a native function.
    ///
    /// Applying this to a non-function node is a host/engine bug and
    /// reports an invariant violation.
    pub fn set_callback(
        &self,
        callback: NativeCallback,
        userdata: Option<Rc<dyn Any>>,
    ) -> Result<(), InvariantError> {
        let mut node = self.0.borrow_mut();
        match node.payload.kind() {
            NodeKind::ScriptFunction | NodeKind::NativeFunction => {
                node.payload = Payload::Native(NativeHandle::new(callback, userdata));
                Ok(())
            }
            found => Err(InvariantError {
                operation: "set_callback",
                expected: NodeKind::NativeFunction,
                found,
            }),
        }
    }

    // === Children ===

    /// Add or replace the child `name`.
    ///
    /// On replacement the previous target loses this link's strong count;
    /// the child keeps its original position in enumeration order.
    pub fn set_child(&self, name: &str, target: &NodeRef) {
        let mut node = self.0.borrow_mut();
        if let Some(link) = node.children.iter_mut().find(|l| &*l.name == name) {
            link.target = target.clone();
        } else {
            node.children.push(Link {
                name: name.into(),
                target: target.clone(),
            });
        }
    }

    /// Add the child `name` only if absent.
    ///
    /// Returns `false` (and changes nothing) when the name already
    /// exists - parameter binding depends on this: declaring `a` twice
    /// must not replace the first binding's target.
    pub fn declare_child(&self, name: &str, target: &NodeRef) -> bool {
        let mut node = self.0.borrow_mut();
        if node.children.iter().any(|l| &*l.name == name) {
            return false;
        }
        node.children.push(Link {
            name: name.into(),
            target: target.clone(),
        });
        true
    }

    /// Remove the child `name`, returning its target if it existed.
    pub fn remove_child(&self, name: &str) -> Option<NodeRef> {
        let mut node = self.0.borrow_mut();
        let index = node.children.iter().position(|l| &*l.name == name)?;
        Some(node.children.remove(index).target)
    }

    /// Look up the child `name`. The returned handle is an alias; it does
    /// not affect the container's link.
    pub fn find_child(&self, name: &str) -> Option<NodeRef> {
        self.0
            .borrow()
            .children
            .iter()
            .find(|l| &*l.name == name)
            .map(|l| l.target.clone())
    }

    /// Snapshot of the children, in insertion order.
    pub fn children(&self) -> Vec<Link> {
        self.0.borrow().children.iter().cloned().collect()
    }

    /// Child names, in insertion order.
    pub fn child_names(&self) -> Vec<Box<str>> {
        self.0
            .borrow()
            .children
            .iter()
            .map(|l| l.name.clone())
            .collect()
    }

    // === Identity and lifetime ===

    /// `true` when both handles designate the same node.
    pub fn ptr_eq(a: &NodeRef, b: &NodeRef) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Number of live strong counts: owning links plus handles currently
    /// held on the host/interpreter stack. This is the observable form of
    /// the reference-count invariant.
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    // === Formatting ===

    fn write_literal(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        if depth > MAX_LITERAL_DEPTH {
            return f.write_str("...");
        }
        let node = self.0.borrow();
        match &node.payload {
            Payload::Undefined => f.write_str("undefined"),
            Payload::Number(n) => f.write_str(&format_number(*n)),
            Payload::String(s) => write_quoted(f, s),
            Payload::Object => write_object(f, &node.children, depth),
            Payload::Array => write_array(f, &node.children, depth),
            Payload::Script(body) => {
                write_signature(f, &node.children)?;
                write!(f, " {}", body.text())
            }
            Payload::Native(_) => {
                write_signature(f, &node.children)?;
                f.write_str(" { [native code] }")
            }
        }
    }
}

impl fmt::Display for NodeRef {
    /// Literal (source-like) form: `{ "a": 1 }`, `[ 1, 2 ]`, quoted
    /// strings. This is what scope dumps print.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_literal(f, 0)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({self})")
    }
}

/// Display form of a number: integral values print without a fraction.
fn format_number(n: f64) -> String {
    format!("{n}")
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in text.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

fn write_object(f: &mut fmt::Formatter<'_>, children: &[Link], depth: usize) -> fmt::Result {
    if children.is_empty() {
        return f.write_str("{}");
    }
    f.write_str("{ ")?;
    for (i, link) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_quoted(f, &link.name)?;
        f.write_str(": ")?;
        link.target.write_literal(f, depth + 1)?;
    }
    f.write_str(" }")
}

fn write_array(f: &mut fmt::Formatter<'_>, children: &[Link], depth: usize) -> fmt::Result {
    if children.is_empty() {
        return f.write_str("[]");
    }
    f.write_str("[ ")?;
    for (i, link) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        link.target.write_literal(f, depth + 1)?;
    }
    f.write_str(" ]")
}

fn write_signature(f: &mut fmt::Formatter<'_>, children: &[Link]) -> fmt::Result {
    f.write_str("function (")?;
    for (i, link) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&link.name)?;
    }
    f.write_str(")")
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // === Factories and classification ===

    #[test]
    fn factories_set_the_kind() {
        assert_eq!(NodeRef::undefined().kind(), NodeKind::Undefined);
        assert_eq!(NodeRef::number(1.0).kind(), NodeKind::Number);
        assert_eq!(NodeRef::string("s").kind(), NodeKind::String);
        assert_eq!(NodeRef::object().kind(), NodeKind::Object);
        assert_eq!(NodeRef::array().kind(), NodeKind::Array);
    }

    #[test]
    fn function_predicate_covers_both_kinds() {
        fn noop(_: &NodeRef, _: Option<&Rc<dyn Any>>) -> Result<(), NativeError> {
            Ok(())
        }
        let script = NodeRef::script_function(CompiledBody::capture("{}"));
        let native = NodeRef::native_function(noop, None);
        assert!(script.is_function());
        assert!(native.is_function());
        assert!(!NodeRef::object().is_function());
    }

    // === Coercions ===

    #[test]
    fn numeric_coercion() {
        assert_eq!(NodeRef::number(2.5).as_number(), 2.5);
        assert_eq!(NodeRef::string(" 42 ").as_number(), 42.0);
        assert_eq!(NodeRef::undefined().as_number(), 0.0);
        assert!(NodeRef::string("nope").as_number().is_nan());
        assert!(NodeRef::object().as_number().is_nan());
    }

    #[test]
    fn string_coercion() {
        assert_eq!(NodeRef::number(1.0).as_string(), "1");
        assert_eq!(NodeRef::number(1.5).as_string(), "1.5");
        assert_eq!(NodeRef::string("hi").as_string(), "hi");
        assert_eq!(NodeRef::undefined().as_string(), "undefined");
    }

    #[test]
    fn truthiness() {
        assert!(!NodeRef::undefined().truthy());
        assert!(!NodeRef::number(0.0).truthy());
        assert!(!NodeRef::number(f64::NAN).truthy());
        assert!(NodeRef::number(-1.0).truthy());
        assert!(!NodeRef::string("").truthy());
        assert!(NodeRef::string("x").truthy());
        assert!(NodeRef::object().truthy());
    }

    // === Children ===

    #[test]
    fn set_child_replaces_and_keeps_position() {
        let obj = NodeRef::object();
        obj.set_child("a", &NodeRef::number(1.0));
        obj.set_child("b", &NodeRef::number(2.0));
        obj.set_child("a", &NodeRef::number(9.0));
        let names = obj.child_names();
        assert_eq!(names, vec!["a".into(), "b".into()]);
        assert_eq!(obj.find_child("a").unwrap().as_number(), 9.0);
    }

    #[test]
    fn declare_child_is_a_noop_on_existing_names() {
        let func = NodeRef::script_function(CompiledBody::capture("{}"));
        let first = NodeRef::number(1.0);
        assert!(func.declare_child("a", &first));
        assert!(!func.declare_child("a", &NodeRef::number(2.0)));
        let bound = func.find_child("a").unwrap();
        assert!(NodeRef::ptr_eq(&bound, &first));
    }

    #[test]
    fn remove_child_returns_the_target() {
        let obj = NodeRef::object();
        obj.set_child("x", &NodeRef::number(7.0));
        let removed = obj.remove_child("x").unwrap();
        assert_eq!(removed.as_number(), 7.0);
        assert!(obj.find_child("x").is_none());
        assert!(obj.remove_child("x").is_none());
    }

    #[test]
    fn enumeration_order_is_insertion_order() {
        let obj = NodeRef::object();
        for name in ["z", "a", "m"] {
            obj.set_child(name, &NodeRef::undefined());
        }
        assert_eq!(obj.child_names(), vec!["z".into(), "a".into(), "m".into()]);
    }

    // === Reference counting ===

    #[test]
    fn links_own_strong_counts() {
        let value = NodeRef::number(5.0);
        assert_eq!(value.strong_count(), 1); // just this handle

        let a = NodeRef::object();
        let b = NodeRef::object();
        a.set_child("v", &value);
        b.set_child("v", &value);
        assert_eq!(value.strong_count(), 3);

        a.remove_child("v");
        assert_eq!(value.strong_count(), 2);

        // Replacing the link also releases the old target's count.
        b.set_child("v", &NodeRef::undefined());
        assert_eq!(value.strong_count(), 1);
    }

    #[test]
    fn dropping_a_container_releases_children_recursively() {
        let leaf = NodeRef::number(1.0);
        {
            let outer = NodeRef::object();
            let inner = NodeRef::object();
            inner.set_child("leaf", &leaf);
            outer.set_child("inner", &inner);
            drop(inner);
            assert_eq!(leaf.strong_count(), 2); // us + link from inner
        }
        // outer dropped -> inner reclaimed -> leaf link released
        assert_eq!(leaf.strong_count(), 1);
    }

    #[test]
    fn lookup_results_are_aliases() {
        let obj = NodeRef::object();
        obj.set_child("x", &NodeRef::number(1.0));
        let alias = obj.find_child("x").unwrap();
        drop(alias); // dropping an alias must not disturb the link
        assert!(obj.find_child("x").is_some());
    }

    // === Invariants ===

    #[test]
    fn set_callback_on_non_function_is_an_invariant_violation() {
        fn noop(_: &NodeRef, _: Option<&Rc<dyn Any>>) -> Result<(), NativeError> {
            Ok(())
        }
        let err = NodeRef::object().set_callback(noop, None).unwrap_err();
        assert_eq!(err.operation, "set_callback");
        assert_eq!(err.found, NodeKind::Object);
        assert_eq!(
            err.to_string(),
            "internal invariant violated: set_callback requires a native function node, \
             found object"
        );
    }

    #[test]
    fn set_body_on_non_function_is_an_invariant_violation() {
        let err = NodeRef::number(1.0)
            .set_body(CompiledBody::capture("{}"))
            .unwrap_err();
        assert_eq!(err.expected, NodeKind::ScriptFunction);
        assert_eq!(err.found, NodeKind::Number);
    }

    // === Formatting ===

    #[test]
    fn literal_forms() {
        let obj = NodeRef::object();
        obj.set_child("a", &NodeRef::number(1.0));
        obj.set_child("b", &NodeRef::string("x\ny"));
        assert_eq!(obj.to_string(), "{ \"a\": 1, \"b\": \"x\\ny\" }");

        let arr = NodeRef::array();
        arr.set_child("0", &NodeRef::number(1.0));
        arr.set_child("1", &NodeRef::number(2.0));
        assert_eq!(arr.to_string(), "[ 1, 2 ]");

        assert_eq!(NodeRef::object().to_string(), "{}");
        assert_eq!(NodeRef::array().to_string(), "[]");
    }

    #[test]
    fn function_literal_shows_signature_and_body() {
        let func = NodeRef::script_function(CompiledBody::capture("{ return a; }"));
        func.declare_child("a", &NodeRef::undefined());
        assert_eq!(func.to_string(), "function (a) { return a; }");
    }

    #[test]
    fn cyclic_graph_formatting_terminates() {
        let obj = NodeRef::object();
        obj.set_child("self", &obj);
        // Must not loop forever or overflow; the cap prints `...`.
        let text = obj.to_string();
        assert!(text.contains("..."));
    }
}
