//! Local `$ref` resolution over a document tree.
//!
//! Resolution never fails loudly: a missing key, a lookup into a sequence or
//! scalar, or a malformed pointer all surface as `None` (or as the input value,
//! for `deref`), and templates render nothing in their place.
//!
//! The walk is written once against [`Tree`], so it runs both over the typed
//! [`Node`] model and directly over the JSON render context without
//! converting between them.

use std::collections::HashSet;

use serde_json::Value as Json;

use crate::codegen::{
    document::{Node, Pointer, Scalar},
    helpers,
};

const REF_KEY: &str = "$ref";

/// How far [`deref`] follows a chain of references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DerefMode {
    /// Follow one pointer. A target that is itself a reference is returned
    /// as that reference.
    #[default]
    SingleHop,
    /// Keep following reference targets until a non-reference node is
    /// reached. A cycle resolves to nothing.
    Transitive,
}

/// A tree a [`Pointer`] can be walked over.
pub trait Tree {
    /// The member named `key`, when this is a mapping.
    fn child(&self, key: &str) -> Option<&Self>;
    fn truthy(&self) -> bool;
    /// The pointer of a `{"$ref": "#/..."}` mapping.
    fn reference(&self) -> Option<Pointer>;
    fn text(&self) -> Option<&str>;
}

impl Tree for Node {
    fn child(&self, key: &str) -> Option<&Node> {
        self.get(key)
    }

    fn truthy(&self) -> bool {
        self.is_truthy()
    }

    fn reference(&self) -> Option<Pointer> {
        match self {
            Node::Reference { pointer, .. } => Some(pointer.clone()),
            _ => None,
        }
    }

    fn text(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Tree for Json {
    fn child(&self, key: &str) -> Option<&Json> {
        self.as_object()?.get(key)
    }

    fn truthy(&self) -> bool {
        helpers::is_truthy(self)
    }

    fn reference(&self) -> Option<Pointer> {
        Pointer::parse(self.as_object()?.get(REF_KEY)?.as_str()?)
    }

    fn text(&self) -> Option<&str> {
        self.as_str()
    }
}

/// Walks `root` along the pointer's segments.
///
/// Descent continues only while segments remain and the current value is
/// truthy; a falsy intermediate value is returned as-is.
pub fn resolve<'a, T: Tree>(root: &'a T, pointer: &Pointer) -> Option<&'a T> {
    walk(root, pointer.segments())
}

fn walk<'a, T: Tree>(node: &'a T, segments: &[String]) -> Option<&'a T> {
    let (key, rest) = segments.split_first()?;
    let value = node.child(key)?;
    if !rest.is_empty() && value.truthy() {
        walk(value, rest)
    } else {
        Some(value)
    }
}

/// Replaces a reference with the node it points to.
///
/// Both a `{"$ref": "#/..."}` mapping and a bare pointer string are accepted.
/// Anything else, including strings that are not valid pointers, is returned
/// unchanged.
pub fn deref<'a, T: Tree>(value: &'a T, root: &'a T, mode: DerefMode) -> Option<&'a T> {
    let pointer = match value.reference() {
        Some(pointer) => pointer,
        None => match value.text().and_then(Pointer::parse) {
            Some(pointer) => pointer,
            None => return Some(value),
        },
    };
    follow(root, &pointer, mode)
}

fn follow<'a, T: Tree>(root: &'a T, pointer: &Pointer, mode: DerefMode) -> Option<&'a T> {
    let mut target = resolve(root, pointer)?;
    if mode == DerefMode::SingleHop {
        return Some(target);
    }
    let mut seen = HashSet::from([pointer.clone()]);
    while let Some(pointer) = target.reference() {
        if !seen.insert(pointer.clone()) {
            return None;
        }
        target = resolve(root, &pointer)?;
    }
    Some(target)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn node(value: Json) -> Node {
        Node::from(&value)
    }

    fn pointer(s: &str) -> Pointer {
        Pointer::parse(s).unwrap()
    }

    fn petstore() -> Node {
        node(json!({
            "components": {
                "schemas": {
                    "Pet": {"type": "object", "properties": {"name": {"type": "string"}}},
                    "PetAlias": {"$ref": "#/components/schemas/Pet"},
                    "PetAliasAlias": {"$ref": "#/components/schemas/PetAlias"},
                    "Loop1": {"$ref": "#/components/schemas/Loop2"},
                    "Loop2": {"$ref": "#/components/schemas/Loop1"},
                    "Tags": ["a", "b"],
                    "Zero": 0,
                    "Empty": "",
                },
            },
        }))
    }

    #[test]
    fn resolve_follows_successive_keys() {
        let root = petstore();
        assert_eq!(
            resolve(&root, &pointer("#/components/schemas/Pet")).map(Json::from),
            Some(json!({"type": "object", "properties": {"name": {"type": "string"}}}))
        );
        assert_eq!(
            resolve(&root, &pointer("#/components/schemas/Pet/properties/name/type")).map(Json::from),
            Some(json!("string"))
        );
    }

    #[test]
    fn resolve_missing_key_is_absent() {
        let root = petstore();
        assert_eq!(resolve(&root, &pointer("#/components/schemas/Dog")), None);
        assert_eq!(resolve(&root, &pointer("#/components/responses/NotFound")), None);
        assert_eq!(resolve(&root, &pointer("#/nothing/at/all")), None);
    }

    #[test]
    fn resolve_stops_at_falsy_intermediate() {
        let root = petstore();
        assert_eq!(
            resolve(&root, &pointer("#/components/schemas/Zero/deeper")).map(Json::from),
            Some(json!(0))
        );
        assert_eq!(
            resolve(&root, &pointer("#/components/schemas/Empty/deeper/still")).map(Json::from),
            Some(json!(""))
        );
    }

    #[test]
    fn resolve_does_not_index_sequences() {
        let root = petstore();
        assert_eq!(resolve(&root, &pointer("#/components/schemas/Tags/0")), None);
    }

    #[test]
    fn resolve_does_not_chain_intermediate_references() {
        let root = petstore();
        assert_eq!(
            resolve(&root, &pointer("#/components/schemas/PetAlias/properties")),
            None
        );
    }

    #[test]
    fn deref_reference_object() {
        let root = petstore();
        let value = node(json!({"$ref": "#/components/schemas/Pet"}));
        assert_eq!(
            deref(&value, &root, DerefMode::SingleHop),
            resolve(&root, &pointer("#/components/schemas/Pet"))
        );
    }

    #[test]
    fn deref_bare_pointer_string() {
        let root = petstore();
        let value = node(json!("#/components/schemas/Pet"));
        assert_eq!(
            deref(&value, &root, DerefMode::SingleHop),
            resolve(&root, &pointer("#/components/schemas/Pet"))
        );
    }

    #[test]
    fn deref_passes_non_references_through() {
        let root = petstore();
        for value in [
            json!("plain string"),
            json!("#/not a pointer"),
            json!({"$ref": "other.yaml#/Pet"}),
            json!({"type": "string"}),
            json!([1, 2]),
            json!(null),
            json!(3),
        ] {
            let value = node(value);
            assert_eq!(deref(&value, &root, DerefMode::SingleHop), Some(&value));
            assert_eq!(deref(&value, &root, DerefMode::Transitive), Some(&value));
        }
    }

    #[test]
    fn deref_unresolvable_is_absent() {
        let root = petstore();
        let value = node(json!({"$ref": "#/components/schemas/Dog"}));
        assert_eq!(deref(&value, &root, DerefMode::SingleHop), None);
    }

    #[test]
    fn deref_single_hop_returns_chained_reference() {
        let root = petstore();
        let value = node(json!({"$ref": "#/components/schemas/PetAliasAlias"}));

        let one = deref(&value, &root, DerefMode::SingleHop).unwrap();
        assert_eq!(Json::from(one), json!({"$ref": "#/components/schemas/PetAlias"}));

        let two = deref(one, &root, DerefMode::SingleHop).unwrap();
        assert_eq!(Json::from(two), json!({"$ref": "#/components/schemas/Pet"}));

        let three = deref(two, &root, DerefMode::SingleHop).unwrap();
        assert_eq!(three, root.get("components").unwrap().get("schemas").unwrap().get("Pet").unwrap());
    }

    #[test]
    fn deref_transitive_reaches_concrete_value() {
        let root = petstore();
        let value = node(json!({"$ref": "#/components/schemas/PetAliasAlias"}));
        assert_eq!(
            deref(&value, &root, DerefMode::Transitive),
            resolve(&root, &pointer("#/components/schemas/Pet"))
        );
    }

    #[test]
    fn deref_transitive_cycle_is_absent() {
        let root = petstore();
        let value = node(json!({"$ref": "#/components/schemas/Loop1"}));
        assert_eq!(deref(&value, &root, DerefMode::Transitive), None);
        assert!(matches!(
            deref(&value, &root, DerefMode::SingleHop),
            Some(Node::Reference { .. })
        ));
    }

    #[test]
    fn json_tree_resolves_like_node_tree() {
        let value = json!({
            "defs": {
                "A": {"type": "string"},
                "B": {"$ref": "#/defs/A", "description": "alias"},
                "C": {"$ref": "#/defs/B"},
                "Loop": {"$ref": "#/defs/Loop"},
                "Zero": 0,
                "External": {"$ref": "other.yaml#/A"},
            },
        });
        let root = node(value.clone());
        for s in [
            "#/defs/A/type",
            "#/defs/B/description",
            "#/defs/Zero/deeper",
            "#/defs/Nope",
        ] {
            let p = pointer(s);
            assert_eq!(resolve(&value, &p).cloned(), resolve(&root, &p).map(Json::from), "{s}");
        }
        for reference in [
            json!({"$ref": "#/defs/A"}),
            json!({"$ref": "#/defs/C"}),
            json!({"$ref": "#/defs/Loop"}),
            json!({"$ref": "#/defs/Nope"}),
            json!("#/defs/B"),
            json!("not a pointer"),
            json!({"$ref": "other.yaml#/A"}),
        ] {
            for mode in [DerefMode::SingleHop, DerefMode::Transitive] {
                assert_eq!(
                    deref(&reference, &value, mode).cloned(),
                    deref(&node(reference.clone()), &root, mode).map(Json::from),
                    "{reference} {mode:?}"
                );
            }
        }
    }
}
