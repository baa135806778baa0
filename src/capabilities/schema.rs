//! Structured type descriptions for capability arguments and results.
//!
//! Remote agents advertise argument and result shapes as JSON Schema
//! documents. [`Schema`] is the tagged form of the subset the bridge
//! understands; documents outside that subset are rejected when a descriptor
//! is parsed, so validation never has to guess.
//!
//! Supported keywords:
//!
//! - `type` (single name or array of names, e.g. `["string", "null"]`)
//! - `anyOf` (at least one variant matches) / `oneOf` (exactly one matches)
//! - numbers: `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum`
//! - strings: `enum`, `pattern`, `minLength`, `maxLength`
//! - arrays: `items`, `minItems`, `maxItems`
//! - objects: `properties`, `required`, `additionalProperties`
//!
//! Any other keyword (`$ref`, `allOf`, `const`, `not`, ...) is an error, as is
//! a keyword that does not apply to the declared type or a validation keyword
//! next to `anyOf`/`oneOf`. Annotation keywords (`description`, `title`,
//! `examples`, `format`, ...) are ignored.
//!
//! Objects that declare `properties` reject unknown fields unless
//! `additionalProperties` is `true` or a schema; a bare `{"type": "object"}`
//! accepts any map.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error raised when a schema document cannot be turned into a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema at '{path}' must be a JSON object or `true`")]
    NotASchema { path: String },

    #[error("unsupported schema type '{ty}' at '{path}'")]
    UnsupportedType { path: String, ty: String },

    #[error("invalid '{keyword}' at '{path}': {reason}")]
    InvalidKeyword {
        path: String,
        keyword: String,
        reason: String,
    },
}

impl SchemaError {
    fn invalid(path: &str, keyword: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKeyword {
            path: path.to_string(),
            keyword: keyword.to_string(),
            reason: reason.into(),
        }
    }
}

/// A single mismatch between a value and a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON path of the offending value, rooted at `$`.
    pub path: String,
    /// What was wrong.
    pub message: String,
}

impl SchemaViolation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Join violations into one human-readable line.
pub fn describe_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Compiled `pattern` keyword.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.0.is_match(s)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Limits of an `integer` or `number` schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bounds {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
}

impl Bounds {
    fn check(&self, n: f64, path: &str, out: &mut Vec<SchemaViolation>) {
        if let Some(min) = self.minimum {
            if n < min {
                out.push(SchemaViolation::new(path, format!("{} is below minimum {}", n, min)));
            }
        }
        if let Some(max) = self.maximum {
            if n > max {
                out.push(SchemaViolation::new(path, format!("{} is above maximum {}", n, max)));
            }
        }
        if let Some(min) = self.exclusive_minimum {
            if n <= min {
                out.push(SchemaViolation::new(path, format!("{} must be greater than {}", n, min)));
            }
        }
        if let Some(max) = self.exclusive_maximum {
            if n >= max {
                out.push(SchemaViolation::new(path, format!("{} must be less than {}", n, max)));
            }
        }
    }
}

/// Tagged description of a structured value.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Accepts any value.
    Any,
    Null,
    Boolean,
    Integer(Bounds),
    Number(Bounds),
    String {
        pattern: Option<Pattern>,
        allowed: Option<Vec<String>>,
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Array {
        items: Box<Schema>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    Object {
        properties: BTreeMap<String, Schema>,
        required: BTreeSet<String>,
        /// `None` rejects unknown fields; `Some(schema)` validates them.
        additional: Option<Box<Schema>>,
    },
    /// Value must match at least one variant.
    AnyOf(Vec<Schema>),
    /// Value must match exactly one variant.
    OneOf(Vec<Schema>),
}

impl Schema {
    /// Parse a JSON Schema document.
    pub fn from_json(doc: &Value) -> Result<Self, SchemaError> {
        parse(doc, "$")
    }

    /// An object schema with no declared properties that rejects every field.
    pub fn empty_object() -> Self {
        Schema::Object {
            properties: BTreeMap::new(),
            required: BTreeSet::new(),
            additional: None,
        }
    }

    /// Whether values of this schema are (or may be) key/value maps.
    pub fn accepts_objects(&self) -> bool {
        match self {
            Schema::Any | Schema::Object { .. } => true,
            Schema::AnyOf(variants) | Schema::OneOf(variants) => {
                variants.iter().any(Schema::accepts_objects)
            }
            _ => false,
        }
    }

    /// Names of the required top-level fields (empty for non-object schemas).
    pub fn required_fields(&self) -> Vec<&str> {
        match self {
            Schema::Object { required, .. } => required.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Drop `null` values of fields that are not required.
    ///
    /// Reasoning loops often pass `null` for arguments they mean to omit.
    pub fn drop_null_optionals(&self, args: Map<String, Value>) -> Map<String, Value> {
        let required = self.required_fields();
        args.into_iter()
            .filter(|(key, value)| !value.is_null() || required.contains(&key.as_str()))
            .collect()
    }

    /// Clean up tool-call arguments and validate them.
    ///
    /// Every tool, local or remote, runs its arguments through this before
    /// doing any work.
    pub fn validate_arguments(
        &self,
        args: Map<String, Value>,
    ) -> Result<Map<String, Value>, Vec<SchemaViolation>> {
        let value = Value::Object(self.drop_null_optionals(args));
        self.validate(&value)?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    /// Validate `value`, collecting every violation.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<SchemaViolation>> {
        let mut violations = Vec::new();
        self.check(value, "$", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn check(&self, value: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
        match self {
            Schema::Any => {}
            Schema::Null => {
                if !value.is_null() {
                    out.push(mismatch(path, "null", value));
                }
            }
            Schema::Boolean => {
                if !value.is_boolean() {
                    out.push(mismatch(path, "boolean", value));
                }
            }
            Schema::Integer(bounds) => match as_integer(value) {
                Some(n) => bounds.check(n, path, out),
                None => out.push(mismatch(path, "integer", value)),
            },
            Schema::Number(bounds) => match value.as_f64() {
                Some(n) => bounds.check(n, path, out),
                None => out.push(mismatch(path, "number", value)),
            },
            Schema::String {
                pattern,
                allowed,
                min_length,
                max_length,
            } => {
                let Some(s) = value.as_str() else {
                    out.push(mismatch(path, "string", value));
                    return;
                };
                if let Some(allowed) = allowed {
                    if !allowed.iter().any(|a| a == s) {
                        out.push(SchemaViolation::new(
                            path,
                            format!("'{}' is not one of [{}]", s, allowed.join(", ")),
                        ));
                    }
                }
                if let Some(pattern) = pattern {
                    if !pattern.is_match(s) {
                        out.push(SchemaViolation::new(
                            path,
                            format!("'{}' does not match pattern '{}'", s, pattern.as_str()),
                        ));
                    }
                }
                let len = s.chars().count();
                if min_length.is_some_and(|min| len < min) || max_length.is_some_and(|max| len > max)
                {
                    out.push(SchemaViolation::new(
                        path,
                        format!("string length {} is out of bounds", len),
                    ));
                }
            }
            Schema::Array {
                items,
                min_items,
                max_items,
            } => {
                let Some(arr) = value.as_array() else {
                    out.push(mismatch(path, "array", value));
                    return;
                };
                if min_items.is_some_and(|min| arr.len() < min)
                    || max_items.is_some_and(|max| arr.len() > max)
                {
                    out.push(SchemaViolation::new(
                        path,
                        format!("array length {} is out of bounds", arr.len()),
                    ));
                }
                for (i, item) in arr.iter().enumerate() {
                    items.check(item, &format!("{}[{}]", path, i), out);
                }
            }
            Schema::Object {
                properties,
                required,
                additional,
            } => {
                let Some(map) = value.as_object() else {
                    out.push(mismatch(path, "object", value));
                    return;
                };
                for name in required {
                    if !map.contains_key(name) {
                        out.push(SchemaViolation::new(
                            path,
                            format!("missing required field '{}'", name),
                        ));
                    }
                }
                for (key, field) in map {
                    let child = format!("{}.{}", path, key);
                    match (properties.get(key), additional) {
                        (Some(schema), _) => schema.check(field, &child, out),
                        (None, Some(schema)) => schema.check(field, &child, out),
                        (None, None) => out.push(SchemaViolation::new(child, "unknown field")),
                    }
                }
            }
            Schema::AnyOf(variants) => {
                if !variants.iter().any(|v| v.validate(value).is_ok()) {
                    out.push(SchemaViolation::new(
                        path,
                        format!(
                            "{} does not match any of the {} allowed shapes",
                            kind_of(value),
                            variants.len()
                        ),
                    ));
                }
            }
            Schema::OneOf(variants) => {
                let matched = variants.iter().filter(|v| v.validate(value).is_ok()).count();
                if matched != 1 {
                    out.push(SchemaViolation::new(
                        path,
                        format!(
                            "{} matches {} of the {} exclusive shapes, expected exactly one",
                            kind_of(value),
                            matched,
                            variants.len()
                        ),
                    ));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Keywords with no bearing on validation.
const ANNOTATIONS: &[&str] = &[
    "$schema",
    "$id",
    "$comment",
    "title",
    "description",
    "default",
    "examples",
    "format",
    "deprecated",
    "readOnly",
    "writeOnly",
];

const TYPE_NAMES: &[&str] = &["null", "boolean", "integer", "number", "string", "array", "object"];

/// Type assumed for an untyped document, by its first keyword.
const INFERRED_TYPES: &[&str] = &["object", "string", "array", "number"];

/// Validation keywords that apply to a type.
fn keywords_for(ty: &str) -> &'static [&'static str] {
    match ty {
        "integer" | "number" => &["minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum"],
        "string" => &["enum", "pattern", "minLength", "maxLength"],
        "array" => &["items", "minItems", "maxItems"],
        "object" => &["properties", "required", "additionalProperties"],
        _ => &[],
    }
}

fn is_known_keyword(keyword: &str) -> bool {
    TYPE_NAMES.iter().any(|ty| keywords_for(ty).contains(&keyword))
}

fn parse(doc: &Value, path: &str) -> Result<Schema, SchemaError> {
    let obj = match doc {
        Value::Bool(true) => return Ok(Schema::Any),
        Value::Object(obj) => obj,
        _ => {
            return Err(SchemaError::NotASchema {
                path: path.to_string(),
            })
        }
    };

    let constraints: Vec<&str> = obj
        .keys()
        .map(String::as_str)
        .filter(|keyword| !ANNOTATIONS.contains(keyword))
        .collect();

    if let Some(&composite) = constraints.iter().find(|k| matches!(**k, "anyOf" | "oneOf")) {
        if let Some(other) = constraints.iter().find(|k| **k != composite) {
            return Err(SchemaError::invalid(
                path,
                other,
                format!("cannot be combined with '{}'", composite),
            ));
        }
        let variants = parse_variants(obj, composite, path)?;
        return Ok(match composite {
            "oneOf" => Schema::OneOf(variants),
            _ => Schema::AnyOf(variants),
        });
    }

    let types: Vec<&str> = match obj.get("type") {
        Some(Value::String(ty)) => vec![ty.as_str()],
        Some(Value::Array(types)) => {
            let names = types
                .iter()
                .map(|t| {
                    t.as_str()
                        .ok_or_else(|| SchemaError::invalid(path, "type", "expected type names"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if names.is_empty() {
                return Err(SchemaError::invalid(path, "type", "empty type list"));
            }
            names
        }
        Some(_) => return Err(SchemaError::invalid(path, "type", "expected a string or array")),
        None => match constraints.first() {
            None => return Ok(Schema::Any),
            Some(first) => match INFERRED_TYPES
                .iter()
                .find(|ty| keywords_for(ty).contains(first))
            {
                Some(ty) => vec![*ty],
                None => return Err(SchemaError::invalid(path, first, "unsupported keyword")),
            },
        },
    };

    if let Some(unknown) = types.iter().find(|ty| !TYPE_NAMES.contains(ty)) {
        return Err(SchemaError::UnsupportedType {
            path: path.to_string(),
            ty: unknown.to_string(),
        });
    }

    for keyword in constraints.iter().filter(|k| **k != "type") {
        if types.iter().any(|ty| keywords_for(ty).contains(keyword)) {
            continue;
        }
        let reason = if is_known_keyword(keyword) {
            format!("does not apply to type '{}'", types.join("|"))
        } else {
            "unsupported keyword".to_string()
        };
        return Err(SchemaError::invalid(path, keyword, reason));
    }

    match types.as_slice() {
        [single] => parse_typed(obj, single, path),
        many => Ok(Schema::AnyOf(
            many.iter()
                .map(|ty| parse_typed(obj, ty, path))
                .collect::<Result<Vec<_>, _>>()?,
        )),
    }
}

fn parse_variants(
    obj: &Map<String, Value>,
    keyword: &str,
    path: &str,
) -> Result<Vec<Schema>, SchemaError> {
    obj.get(keyword)
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| SchemaError::invalid(path, keyword, "expected a non-empty array"))?
        .iter()
        .enumerate()
        .map(|(i, v)| parse(v, &format!("{}.{}[{}]", path, keyword, i)))
        .collect()
}

fn parse_typed(obj: &Map<String, Value>, ty: &str, path: &str) -> Result<Schema, SchemaError> {
    match ty {
        "null" => Ok(Schema::Null),
        "boolean" => Ok(Schema::Boolean),
        "integer" => Ok(Schema::Integer(bounds(obj, path)?)),
        "number" => Ok(Schema::Number(bounds(obj, path)?)),
        "string" => {
            let pattern = match obj.get("pattern") {
                None => None,
                Some(Value::String(p)) => Some(Pattern(
                    Regex::new(p).map_err(|e| SchemaError::invalid(path, "pattern", e.to_string()))?,
                )),
                Some(_) => return Err(SchemaError::invalid(path, "pattern", "expected a string")),
            };
            let allowed = match obj.get("enum") {
                None => None,
                Some(Value::Array(values)) => Some(
                    values
                        .iter()
                        .map(|v| {
                            v.as_str().map(str::to_string).ok_or_else(|| {
                                SchemaError::invalid(path, "enum", "only string enums are supported")
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                Some(_) => return Err(SchemaError::invalid(path, "enum", "expected an array")),
            };
            Ok(Schema::String {
                pattern,
                allowed,
                min_length: size_keyword(obj, "minLength", path)?,
                max_length: size_keyword(obj, "maxLength", path)?,
            })
        }
        "array" => {
            let items = match obj.get("items") {
                Some(items) => parse(items, &format!("{}[]", path))?,
                None => Schema::Any,
            };
            Ok(Schema::Array {
                items: Box::new(items),
                min_items: size_keyword(obj, "minItems", path)?,
                max_items: size_keyword(obj, "maxItems", path)?,
            })
        }
        "object" => {
            let mut properties = BTreeMap::new();
            match obj.get("properties") {
                None => {}
                Some(Value::Object(props)) => {
                    for (name, prop) in props {
                        properties.insert(name.clone(), parse(prop, &format!("{}.{}", path, name))?);
                    }
                }
                Some(_) => return Err(SchemaError::invalid(path, "properties", "expected an object")),
            }

            let required = match obj.get("required") {
                None => BTreeSet::new(),
                Some(Value::Array(names)) => names
                    .iter()
                    .map(|n| {
                        n.as_str().map(str::to_string).ok_or_else(|| {
                            SchemaError::invalid(path, "required", "expected field names")
                        })
                    })
                    .collect::<Result<BTreeSet<_>, _>>()?,
                Some(_) => return Err(SchemaError::invalid(path, "required", "expected an array")),
            };

            let additional = match obj.get("additionalProperties") {
                // A bare `{"type": "object"}` describes any map.
                None if !obj.contains_key("properties") => Some(Box::new(Schema::Any)),
                None | Some(Value::Bool(false)) => None,
                Some(Value::Bool(true)) => Some(Box::new(Schema::Any)),
                Some(doc @ Value::Object(_)) => Some(Box::new(parse(doc, &format!("{}.*", path))?)),
                Some(_) => {
                    return Err(SchemaError::invalid(
                        path,
                        "additionalProperties",
                        "expected a boolean or schema",
                    ))
                }
            };

            // A closed object can never hold an undeclared required field.
            if additional.is_none() {
                if let Some(name) = required.iter().find(|name| !properties.contains_key(*name)) {
                    return Err(SchemaError::invalid(
                        path,
                        "required",
                        format!("'{}' is not a declared property", name),
                    ));
                }
            }

            Ok(Schema::Object {
                properties,
                required,
                additional,
            })
        }
        other => Err(SchemaError::UnsupportedType {
            path: path.to_string(),
            ty: other.to_string(),
        }),
    }
}

fn bounds(obj: &Map<String, Value>, path: &str) -> Result<Bounds, SchemaError> {
    Ok(Bounds {
        minimum: number_keyword(obj, "minimum", path)?,
        maximum: number_keyword(obj, "maximum", path)?,
        exclusive_minimum: number_keyword(obj, "exclusiveMinimum", path)?,
        exclusive_maximum: number_keyword(obj, "exclusiveMaximum", path)?,
    })
}

fn number_keyword(obj: &Map<String, Value>, keyword: &str, path: &str) -> Result<Option<f64>, SchemaError> {
    obj.get(keyword)
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| SchemaError::invalid(path, keyword, "expected a number"))
        })
        .transpose()
}

fn size_keyword(obj: &Map<String, Value>, keyword: &str, path: &str) -> Result<Option<usize>, SchemaError> {
    obj.get(keyword)
        .map(|v| {
            v.as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| SchemaError::invalid(path, keyword, "expected a non-negative integer"))
        })
        .transpose()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn as_integer(value: &Value) -> Option<f64> {
    if value.is_i64() || value.is_u64() {
        return value.as_f64();
    }
    value
        .as_f64()
        .filter(|n| n.is_finite() && n.fract() == 0.0)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(path: &str, expected: &str, found: &Value) -> SchemaViolation {
    SchemaViolation::new(path, format!("expected {}, found {}", expected, kind_of(found)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
