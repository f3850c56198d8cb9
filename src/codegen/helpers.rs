//! Template helpers.
//!
//! Every helper is a plain function of its arguments; the only per-render
//! state, the `switch` frame, lives on the engine's block stack (see
//! [`blocks`]).

use handlebars::{
    Context, Handlebars, Helper, HelperDef, RenderContext, RenderError, ScopedJson,
    handlebars_helper,
};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value as Json};

use crate::{
    codegen::{
        casing,
        resolver::{self, DerefMode},
    },
    log,
};

mod blocks;

static ERROR_STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([45][0-9X]{2}|default)$").expect("status pattern is valid"));

/// Template truthiness: null, false, zero and the empty string are falsy.
pub fn is_truthy(value: &Json) -> bool {
    match value {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Json::String(s) => !s.is_empty(),
        Json::Array(_) | Json::Object(_) => true,
    }
}

/// The plain text form of a value. Null renders as nothing.
pub fn display(value: &Json) -> String {
    match value {
        Json::Null => String::new(),
        Json::Bool(b) => b.to_string(),
        Json::Number(n) => n.to_string(),
        Json::String(s) => s.clone(),
        Json::Array(items) => items.iter().map(display).join(","),
        Json::Object(_) => String::from("[object Object]"),
    }
}

/// Renders `raw` as a literal: a JSON-quoted string when `kind` is
/// `"string"`, the bare text otherwise.
pub fn literal(raw: &Json, kind: &str) -> String {
    let text = display(raw);
    match kind {
        "string" => Json::String(text).to_string(),
        _ => text,
    }
}

/// Template equality. Numbers compare by value, so `1` equals `1.0`; every
/// other pair must match in type and content.
pub fn same_value(a: &Json, b: &Json) -> bool {
    match (a, b) {
        (Json::Number(x), Json::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

pub fn is_in(collection: &Json, value: &Json) -> bool {
    match collection {
        Json::Array(items) => items.iter().any(|item| same_value(item, value)),
        _ => false,
    }
}

pub fn contains(haystack: &Json, needle: &Json) -> bool {
    match (haystack, needle) {
        (Json::String(haystack), Json::String(needle)) => haystack.contains(needle.as_str()),
        _ => false,
    }
}

pub fn all_truthy(values: &[&Json]) -> bool {
    !values.is_empty() && values.iter().all(|v| is_truthy(v))
}

pub fn any_truthy(values: &[&Json]) -> bool {
    values.iter().any(|v| is_truthy(v))
}

pub fn coalesce<'a>(values: &[&'a Json]) -> Option<&'a Json> {
    values.iter().copied().find(|v| is_truthy(v))
}

/// Drops `4xx`, `5xx` (including the `4XX`/`5XX` wildcards) and `default`
/// entries, keeping the rest in their original order.
pub fn success_responses(responses: &Json) -> Json {
    let kept: Map<String, Json> = match responses {
        Json::Object(map) => map
            .iter()
            .filter(|(status, _)| !ERROR_STATUS_RE.is_match(status))
            .map(|(status, response)| (status.clone(), response.clone()))
            .collect(),
        _ => Map::new(),
    };
    Json::Object(kept)
}

handlebars_helper!(schema_ref_to_type_name: |reference: Json| {
    casing::pascal_case(casing::last_segment(&display(reference)))
});
handlebars_helper!(schema_to_type_name: |reference: Json| {
    casing::camel_case(casing::last_segment(&display(reference)))
});
handlebars_helper!(value_name: |v: Json| casing::camel_case(&display(v)));
handlebars_helper!(class_name: |v: Json| casing::pascal_case(&display(v)));
handlebars_helper!(concat: |*args| args.iter().map(|v| display(v)).join(""));
handlebars_helper!(eq: |a: Json, b: Json| same_value(a, b));
handlebars_helper!(in_list: |collection: Json, value: Json| is_in(collection, value));
handlebars_helper!(contains_text: |haystack: Json, needle: Json| contains(haystack, needle));
handlebars_helper!(and: |*args| all_truthy(&args));
handlebars_helper!(or: |*args| any_truthy(&args));
handlebars_helper!(first_truthy: |*args| coalesce(&args).cloned());
handlebars_helper!(success_responses_of: |responses: Json| success_responses(responses));

/// `{{value raw [type]}}`; `type` defaults to `"string"`.
struct ValueHelper;

impl HelperDef for ValueHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let raw = h.param(0).map(|p| p.value()).unwrap_or(&Json::Null);
        let kind = h
            .param(1)
            .and_then(|p| p.value().as_str())
            .unwrap_or("string");
        Ok(ScopedJson::Derived(Json::String(literal(raw, kind))))
    }
}

/// `{{deref value [root]}}`; `root` defaults to the render's root context,
/// which is also used when the argument evaluates to null (as `@root` does
/// when passed as a parameter).
struct DerefHelper {
    mode: DerefMode,
}

impl HelperDef for DerefHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let value = h.param(0).map(|p| p.value()).unwrap_or(&Json::Null);
        let root = match h.param(1) {
            Some(p) if !p.is_value_missing() && !p.value().is_null() => p.value(),
            _ => ctx.data(),
        };
        match resolver::deref(value, root, self.mode) {
            Some(found) => Ok(ScopedJson::Derived(found.clone())),
            None => {
                log!("unresolved reference: {}", value);
                Ok(ScopedJson::Derived(Json::Null))
            }
        }
    }
}

/// Registers the full helper catalogue on `registry`.
///
/// The predicates are registered under their `?` names and under plain
/// aliases, since the expression grammar only calls identifiers made of word
/// characters.
pub fn register(registry: &mut Handlebars<'_>, mode: DerefMode) {
    registry.register_helper("schemaRefToTypeName", Box::new(schema_ref_to_type_name));
    registry.register_helper("schemaToTypeName", Box::new(schema_to_type_name));
    registry.register_helper("valueName", Box::new(value_name));
    registry.register_helper("className", Box::new(class_name));
    registry.register_helper("concat", Box::new(concat));
    registry.register_helper("value", Box::new(ValueHelper));
    for name in ["eq?", "eq"] {
        registry.register_helper(name, Box::new(eq));
    }
    for name in ["in?", "in"] {
        registry.register_helper(name, Box::new(in_list));
    }
    for name in ["contains?", "contains"] {
        registry.register_helper(name, Box::new(contains_text));
    }
    for name in ["and?", "and"] {
        registry.register_helper(name, Box::new(and));
    }
    for name in ["or?", "or"] {
        registry.register_helper(name, Box::new(or));
    }
    registry.register_helper("coalesce", Box::new(first_truthy));
    registry.register_helper("successResponses", Box::new(success_responses_of));
    registry.register_helper("deref", Box::new(DerefHelper { mode }));
    registry.register_helper("switch", Box::new(blocks::SwitchHelper));
    registry.register_helper("case", Box::new(blocks::CaseHelper));
    registry.register_helper("first", Box::new(blocks::FirstHelper));
}

#[cfg(test)]
pub(crate) fn test_registry(mode: DerefMode) -> Handlebars<'static> {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    register(&mut registry, mode);
    registry
}
