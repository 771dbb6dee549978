//! Prototype-chain and built-in class member resolution.
//!
//! Member lookup order for the whole language is defined here: an
//! object's own children are checked by the caller first; when that
//! fails, [`resolve_member`] walks the `"prototype"` chain, then the
//! kind-specific built-in class (`String` for strings, `Array` for
//! arrays), and finally - for every kind - the `Object` built-in class.
//! Single-inheritance prototype chain, classical "everything inherits
//! from Object" fallback.

use tracing::trace;

use crate::node::NodeRef;

/// Reserved child name that links an object to its prototype.
pub const PROTOTYPE: &str = "prototype";

/// The three built-in class singletons.
///
/// Each is an ordinary object node; the engine links them into the root
/// as `String`, `Array`, and `Object`, which also makes them reachable
/// from script (and from dotted `add_native` registration, so
/// `function String.charAt(pos)` attaches to the class itself).
#[derive(Clone, Debug)]
pub struct Builtins {
    string_class: NodeRef,
    array_class: NodeRef,
    object_class: NodeRef,
}

impl Builtins {
    /// Create the three class objects.
    pub fn new() -> Self {
        Builtins {
            string_class: NodeRef::object(),
            array_class: NodeRef::object(),
            object_class: NodeRef::object(),
        }
    }

    /// The `String` class object.
    pub fn string_class(&self) -> &NodeRef {
        &self.string_class
    }

    /// The `Array` class object.
    pub fn array_class(&self) -> &NodeRef {
        &self.array_class
    }

    /// The `Object` class object.
    pub fn object_class(&self) -> &NodeRef {
        &self.object_class
    }

    /// Link the class objects into `root` under their class names.
    pub fn link_into(&self, root: &NodeRef) {
        root.set_child("String", &self.string_class);
        root.set_child("Array", &self.array_class);
        root.set_child("Object", &self.object_class);
    }
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve `name` against `object`'s prototype chain, then the built-in
/// classes. The caller has already checked own children.
///
/// The chain walk is cycle-guarded: a prototype seen twice terminates the
/// walk, so a self-referential chain degrades to not-found instead of
/// hanging resolution.
pub fn resolve_member(object: &NodeRef, name: &str, builtins: &Builtins) -> Option<NodeRef> {
    let mut visited: Vec<NodeRef> = Vec::new();
    let mut prototype = object.find_child(PROTOTYPE);
    while let Some(proto) = prototype {
        if let Some(found) = proto.find_child(name) {
            trace!(member = name, "resolved via prototype chain");
            return Some(found);
        }
        if visited.iter().any(|seen| NodeRef::ptr_eq(seen, &proto)) {
            break;
        }
        prototype = proto.find_child(PROTOTYPE);
        visited.push(proto);
    }

    if object.is_string() {
        if let Some(found) = builtins.string_class.find_child(name) {
            trace!(member = name, "resolved via String builtin");
            return Some(found);
        }
    }
    if object.is_array() {
        if let Some(found) = builtins.array_class.find_child(name) {
            trace!(member = name, "resolved via Array builtin");
            return Some(found);
        }
    }
    builtins.object_class.find_child(name)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn number_child(container: &NodeRef, name: &str, value: f64) {
        container.set_child(name, &NodeRef::number(value));
    }

    // === Resolution order ===

    #[test]
    fn prototype_chain_beats_kind_builtin() {
        let builtins = Builtins::new();
        number_child(builtins.array_class(), "foo", 3.0);

        let proto = NodeRef::object();
        number_child(&proto, "foo", 1.0);

        let arr = NodeRef::array();
        arr.set_child(PROTOTYPE, &proto);

        let found = resolve_member(&arr, "foo", &builtins).unwrap();
        assert_eq!(found.as_number(), 1.0);
    }

    #[test]
    fn chain_removal_falls_through_to_kind_builtin() {
        let builtins = Builtins::new();
        number_child(builtins.array_class(), "foo", 3.0);
        number_child(builtins.object_class(), "foo", 4.0);

        let proto = NodeRef::object();
        number_child(&proto, "foo", 1.0);

        let arr = NodeRef::array();
        arr.set_child(PROTOTYPE, &proto);

        proto.remove_child("foo");
        let found = resolve_member(&arr, "foo", &builtins).unwrap();
        assert_eq!(found.as_number(), 3.0);

        builtins.array_class().remove_child("foo");
        let found = resolve_member(&arr, "foo", &builtins).unwrap();
        assert_eq!(found.as_number(), 4.0);

        builtins.object_class().remove_child("foo");
        assert!(resolve_member(&arr, "foo", &builtins).is_none());
    }

    #[test]
    fn string_kind_uses_string_builtin() {
        let builtins = Builtins::new();
        number_child(builtins.string_class(), "length_hint", 1.0);
        number_child(builtins.array_class(), "length_hint", 2.0);

        let s = NodeRef::string("abc");
        let found = resolve_member(&s, "length_hint", &builtins).unwrap();
        assert_eq!(found.as_number(), 1.0);
    }

    #[test]
    fn object_builtin_applies_to_every_kind() {
        let builtins = Builtins::new();
        number_child(builtins.object_class(), "common", 9.0);

        for value in [
            NodeRef::object(),
            NodeRef::array(),
            NodeRef::string("s"),
            NodeRef::number(1.0),
        ] {
            let found = resolve_member(&value, "common", &builtins).unwrap();
            assert_eq!(found.as_number(), 9.0);
        }
    }

    // === Chain walking ===

    #[test]
    fn multi_level_chain_is_walked() {
        let builtins = Builtins::new();
        let grandparent = NodeRef::object();
        number_child(&grandparent, "deep", 7.0);
        let parent = NodeRef::object();
        parent.set_child(PROTOTYPE, &grandparent);
        let obj = NodeRef::object();
        obj.set_child(PROTOTYPE, &parent);

        let found = resolve_member(&obj, "deep", &builtins).unwrap();
        assert_eq!(found.as_number(), 7.0);
    }

    #[test]
    fn cyclic_chain_terminates_as_not_found() {
        let builtins = Builtins::new();
        let a = NodeRef::object();
        let b = NodeRef::object();
        a.set_child(PROTOTYPE, &b);
        b.set_child(PROTOTYPE, &a);

        assert!(resolve_member(&a, "missing", &builtins).is_none());
    }

    // === Wiring ===

    #[test]
    fn link_into_exposes_classes_from_root() {
        let builtins = Builtins::new();
        let root = NodeRef::object();
        builtins.link_into(&root);

        let string_class = root.find_child("String").unwrap();
        assert!(NodeRef::ptr_eq(&string_class, builtins.string_class()));
        assert!(root.find_child("Array").is_some());
        assert!(root.find_child("Object").is_some());
    }
}
