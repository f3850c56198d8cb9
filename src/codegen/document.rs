use std::{error::Error, fmt, fs};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value as Json};
use serde_yaml::Value as Yaml;

use crate::log;

const REF_KEY: &str = "$ref";

static POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(/[A-Za-z0-9_]+)+$").expect("pointer pattern is valid"));

/// A local reference of the form `#/seg1/seg2/...`.
///
/// Segments are ASCII word characters only; `~` and `/` escapes are not
/// supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pointer {
    segments: Vec<String>,
}

impl Pointer {
    pub fn parse(s: &str) -> Option<Pointer> {
        if !POINTER_RE.is_match(s) {
            return None;
        }
        let segments = s[1..].split('/').skip(1).map(str::to_string).collect();
        Some(Pointer { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#")?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

/// A node of an API description document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(IndexMap<String, Node>),
    /// A mapping whose `$ref` member is a valid local pointer. Any other
    /// members are carried along for rendering but never consulted during
    /// resolution.
    Reference {
        pointer: Pointer,
        siblings: IndexMap<String, Node>,
    },
}

impl Node {
    pub fn null() -> Node {
        Node::Scalar(Scalar::Null)
    }

    /// Looks up `key` when this node is a mapping. References expose their
    /// sibling members; every other node has no children.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Mapping(map) => map.get(key),
            Node::Reference { siblings, .. } => siblings.get(key),
            Node::Scalar(_) | Node::Sequence(_) => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Node::Scalar(Scalar::Null) => false,
            Node::Scalar(Scalar::Bool(b)) => *b,
            Node::Scalar(Scalar::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Node::Scalar(Scalar::String(s)) => !s.is_empty(),
            Node::Sequence(_) | Node::Mapping(_) | Node::Reference { .. } => true,
        }
    }

    /// Classifies a freshly built mapping, turning it into a `Reference` when
    /// its `$ref` member holds a valid pointer.
    fn from_mapping(mut map: IndexMap<String, Node>) -> Node {
        let pointer = match map.get(REF_KEY) {
            Some(Node::Scalar(Scalar::String(s))) => Pointer::parse(s),
            _ => None,
        };
        match pointer {
            Some(pointer) => {
                map.shift_remove(REF_KEY);
                Node::Reference {
                    pointer,
                    siblings: map,
                }
            }
            None => Node::Mapping(map),
        }
    }
}

impl From<Yaml> for Node {
    fn from(value: Yaml) -> Node {
        match value {
            Yaml::Null => Node::null(),
            Yaml::Bool(b) => Node::Scalar(Scalar::Bool(b)),
            Yaml::Number(n) => Node::Scalar(yaml_number(&n)),
            Yaml::String(s) => Node::Scalar(Scalar::String(s)),
            Yaml::Sequence(seq) => Node::Sequence(seq.into_iter().map(Node::from).collect()),
            Yaml::Mapping(mapping) => Node::from_mapping(
                mapping
                    .into_iter()
                    .map(|(k, v)| (yaml_key(k), Node::from(v)))
                    .collect(),
            ),
            Yaml::Tagged(tagged) => Node::from(tagged.value),
        }
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Number(i.into())
    } else if let Some(u) = n.as_u64() {
        Scalar::Number(u.into())
    } else {
        n.as_f64()
            .and_then(Number::from_f64)
            .map_or(Scalar::Null, Scalar::Number)
    }
}

// YAML allows non-string keys; status codes like `200:` are the common case.
fn yaml_key(key: Yaml) -> String {
    match key {
        Yaml::String(s) => s,
        Yaml::Number(n) => n.to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Null => String::from("null"),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl From<&Json> for Node {
    fn from(value: &Json) -> Node {
        match value {
            Json::Null => Node::null(),
            Json::Bool(b) => Node::Scalar(Scalar::Bool(*b)),
            Json::Number(n) => Node::Scalar(Scalar::Number(n.clone())),
            Json::String(s) => Node::Scalar(Scalar::String(s.clone())),
            Json::Array(items) => Node::Sequence(items.iter().map(Node::from).collect()),
            Json::Object(object) => Node::from_mapping(
                object
                    .iter()
                    .map(|(k, v)| (k.clone(), Node::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Node> for Json {
    fn from(node: &Node) -> Json {
        match node {
            Node::Scalar(Scalar::Null) => Json::Null,
            Node::Scalar(Scalar::Bool(b)) => Json::Bool(*b),
            Node::Scalar(Scalar::Number(n)) => Json::Number(n.clone()),
            Node::Scalar(Scalar::String(s)) => Json::String(s.clone()),
            Node::Sequence(items) => Json::Array(items.iter().map(Json::from).collect()),
            Node::Mapping(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Json::from(v)))
                    .collect(),
            ),
            Node::Reference { pointer, siblings } => {
                let mut object = serde_json::Map::new();
                object.insert(REF_KEY.to_string(), Json::String(pointer.to_string()));
                for (k, v) in siblings {
                    object.insert(k.clone(), Json::from(v));
                }
                Json::Object(object)
            }
        }
    }
}

/// A parsed API description. Read-only for the duration of a run.
#[derive(Debug, Clone)]
pub struct Document {
    root: Node,
}

impl Document {
    pub fn parse(text: &str) -> Result<Document, Box<dyn Error>> {
        let value: Yaml = serde_yaml::from_str(text)?;
        let root = Node::from(value);
        if !matches!(root, Node::Mapping(_)) {
            Err("document root must be a mapping")?
        }
        Ok(Document { root })
    }

    /// Reads the document from a local path, or downloads it when `source`
    /// is an `http://` or `https://` URL.
    pub fn load(source: &str) -> Result<Document, Box<dyn Error>> {
        let text = if source.starts_with("http://") || source.starts_with("https://") {
            log!("downloading document from {}", source);
            reqwest::blocking::get(source)?.error_for_status()?.text()?
        } else {
            log!("reading document from {}", source);
            fs::read_to_string(source).map_err(|e| format!("reading {source}: {e}"))?
        };
        Document::parse(&text)
    }

    pub fn to_json(&self) -> Json {
        Json::from(&self.root)
    }
}
