//! Request schemas.
//!
//! A [`Schema`] both validates a request part and describes itself as JSON
//! Schema, so the router and the OpenAPI document are driven by the same
//! object. Two implementations are provided:
//!
//! - [`ObjectSchema`] / [`FieldSchema`]: declarative runtime schemas.
//! - [`Typed<T>`]: bridges a Rust type implementing `serde::Deserialize`,
//!   `garde::Validate` and `schemars::JsonSchema`.

use std::marker::PhantomData;

use garde::rules::email::Email;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::validation::FieldError;

/// The request part a schema applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Body,
    Params,
    Query,
}

impl Location {
    pub fn as_str(self) -> &'static str {
        match self {
            Location::Body => "body",
            Location::Params => "params",
            Location::Query => "query",
        }
    }

    /// Field path for a top-level key, e.g. `body.email`.
    pub fn field(self, name: &str) -> String {
        format!("{}.{name}", self.as_str())
    }

    /// Path and query values arrive as strings and are coerced to the
    /// declared scalar type.
    pub fn coerces_strings(self) -> bool {
        !matches!(self, Location::Body)
    }
}

/// A validator for one request part that can also document itself.
pub trait Schema: Send + Sync + 'static {
    /// Validate `value` in place, pushing one [`FieldError`] per failing field.
    ///
    /// Implementations may rewrite `value` (e.g. coerce `"42"` to `42`); the
    /// rewritten value is what the handler receives.
    fn validate(&self, value: &mut Value, location: Location, errors: &mut Vec<FieldError>);

    /// JSON Schema describing the accepted shape.
    fn json_schema(&self) -> Value;

    /// Component name; named schemas are referenced from
    /// `#/components/schemas/{name}` instead of being inlined.
    fn name(&self) -> Option<String> {
        None
    }
}

// ── Declarative schemas ─────────────────────────────────────────────────────

/// String formats understood by [`FieldSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    Uuid,
    DateTime,
    Uri,
}

impl StringFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Uuid => "uuid",
            StringFormat::DateTime => "date-time",
            StringFormat::Uri => "uri",
        }
    }

    pub fn matches(self, value: &str) -> bool {
        match self {
            StringFormat::Email => value.to_owned().validate_email().is_ok(),
            StringFormat::Uuid => uuid::Uuid::parse_str(value).is_ok(),
            StringFormat::DateTime => chrono::DateTime::parse_from_rfc3339(value).is_ok(),
            StringFormat::Uri => url::Url::parse(value).is_ok(),
        }
    }

    fn message(self) -> &'static str {
        match self {
            StringFormat::Email => "must be a valid email",
            StringFormat::Uuid => "must be a valid UUID",
            StringFormat::DateTime => "must be an RFC 3339 date-time",
            StringFormat::Uri => "must be a valid URI",
        }
    }
}

#[derive(Debug, Clone)]
enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Array(Box<FieldSchema>),
    Object(ObjectSchema),
}

/// Schema of a single field.
///
/// ```ignore
/// FieldSchema::string().email().required()
/// FieldSchema::integer().minimum(1.0)
/// ```
#[derive(Debug, Clone)]
pub struct FieldSchema {
    kind: FieldKind,
    required: bool,
    format: Option<StringFormat>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    one_of: Vec<Value>,
    description: Option<String>,
}

impl FieldSchema {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            format: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            one_of: Vec::new(),
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::of(FieldKind::String)
    }

    pub fn integer() -> Self {
        Self::of(FieldKind::Integer)
    }

    pub fn number() -> Self {
        Self::of(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn array(items: FieldSchema) -> Self {
        Self::of(FieldKind::Array(Box::new(items)))
    }

    pub fn object(schema: ObjectSchema) -> Self {
        Self::of(FieldKind::Object(schema))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn format(mut self, format: StringFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn email(self) -> Self {
        self.format(StringFormat::Email)
    }

    pub fn uuid(self) -> Self {
        self.format(StringFormat::Uuid)
    }

    pub fn date_time(self) -> Self {
        self.format(StringFormat::DateTime)
    }

    pub fn uri(self) -> Self {
        self.format(StringFormat::Uri)
    }

    /// Minimum character count for strings, item count for arrays.
    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    /// Maximum character count for strings, item count for arrays.
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }

    pub fn maximum(mut self, max: f64) -> Self {
        self.maximum = Some(max);
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.one_of = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    fn validate_value(
        &self,
        value: &mut Value,
        path: &str,
        location: Location,
        errors: &mut Vec<FieldError>,
    ) {
        let coerce = location.coerces_strings();
        match &self.kind {
            FieldKind::String => {
                let Some(text) = value.as_str() else {
                    errors.push(FieldError::new(path, "must be a string"));
                    return;
                };
                let chars = text.chars().count();
                if let Some(min) = self.min_length.filter(|min| chars < *min) {
                    errors.push(FieldError::new(
                        path,
                        format!("must be at least {min} characters long"),
                    ));
                }
                if let Some(max) = self.max_length.filter(|max| chars > *max) {
                    errors.push(FieldError::new(
                        path,
                        format!("must be at most {max} characters long"),
                    ));
                }
                if let Some(format) = self.format.filter(|f| !f.matches(text)) {
                    errors.push(FieldError::new(path, format.message()));
                }
            }
            FieldKind::Integer => {
                if coerce {
                    coerce_string(value, |s| s.parse::<i64>().ok().map(Value::from));
                }
                let Some(n) = value.as_i64().map(|n| n as f64).or_else(|| value.as_u64().map(|n| n as f64)) else {
                    errors.push(FieldError::new(path, "must be an integer"));
                    return;
                };
                self.check_range(n, path, errors);
            }
            FieldKind::Number => {
                if coerce {
                    coerce_string(value, |s| {
                        s.parse::<f64>()
                            .ok()
                            .and_then(serde_json::Number::from_f64)
                            .map(Value::Number)
                    });
                }
                let Some(n) = value.as_f64() else {
                    errors.push(FieldError::new(path, "must be a number"));
                    return;
                };
                self.check_range(n, path, errors);
            }
            FieldKind::Boolean => {
                if coerce {
                    coerce_string(value, |s| match s {
                        "true" => Some(Value::Bool(true)),
                        "false" => Some(Value::Bool(false)),
                        _ => None,
                    });
                }
                if !value.is_boolean() {
                    errors.push(FieldError::new(path, "must be a boolean"));
                    return;
                }
            }
            FieldKind::Array(items) => {
                if coerce && !value.is_array() {
                    *value = Value::Array(vec![value.take()]);
                }
                let Some(elements) = value.as_array_mut() else {
                    errors.push(FieldError::new(path, "must be an array"));
                    return;
                };
                let len = elements.len();
                if let Some(min) = self.min_length.filter(|min| len < *min) {
                    errors.push(FieldError::new(path, format!("must contain at least {min} items")));
                }
                if let Some(max) = self.max_length.filter(|max| len > *max) {
                    errors.push(FieldError::new(path, format!("must contain at most {max} items")));
                }
                for (index, element) in elements.iter_mut().enumerate() {
                    items.validate_value(element, &format!("{path}[{index}]"), location, errors);
                }
            }
            FieldKind::Object(schema) => {
                schema.validate_object(value, path, location, errors);
                return;
            }
        }

        if !self.one_of.is_empty() && !self.one_of.contains(value) {
            let allowed: Vec<String> = self.one_of.iter().map(Value::to_string).collect();
            errors.push(FieldError::new(
                path,
                format!("must be one of [{}]", allowed.join(", ")),
            ));
        }
    }

    fn check_range(&self, n: f64, path: &str, errors: &mut Vec<FieldError>) {
        if let Some(min) = self.minimum.filter(|min| n < *min) {
            errors.push(FieldError::new(path, format!("must be greater than or equal to {min}")));
        }
        if let Some(max) = self.maximum.filter(|max| n > *max) {
            errors.push(FieldError::new(path, format!("must be less than or equal to {max}")));
        }
    }

    pub fn json_schema(&self) -> Value {
        let mut schema = match &self.kind {
            FieldKind::String => json!({ "type": "string" }),
            FieldKind::Integer => json!({ "type": "integer" }),
            FieldKind::Number => json!({ "type": "number" }),
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::Array(items) => json!({ "type": "array", "items": items.json_schema() }),
            FieldKind::Object(object) => object.json_schema(),
        };
        let Some(obj) = schema.as_object_mut() else {
            return schema;
        };
        if let Some(format) = self.format {
            obj.insert("format".into(), json!(format.as_str()));
        }
        let (min_key, max_key) = match self.kind {
            FieldKind::Array(_) => ("minItems", "maxItems"),
            _ => ("minLength", "maxLength"),
        };
        if let Some(min) = self.min_length {
            obj.insert(min_key.into(), json!(min));
        }
        if let Some(max) = self.max_length {
            obj.insert(max_key.into(), json!(max));
        }
        if let Some(min) = self.minimum {
            obj.insert("minimum".into(), json!(min));
        }
        if let Some(max) = self.maximum {
            obj.insert("maximum".into(), json!(max));
        }
        if !self.one_of.is_empty() {
            obj.insert("enum".into(), Value::Array(self.one_of.clone()));
        }
        if let Some(ref description) = self.description {
            obj.insert("description".into(), json!(description));
        }
        schema
    }
}

fn coerce_string(value: &mut Value, parse: impl FnOnce(&str) -> Option<Value>) {
    if let Some(parsed) = value.as_str().and_then(parse) {
        *value = parsed;
    }
}

/// An object schema with named fields.
///
/// ```ignore
/// ObjectSchema::named("LoginRequest")
///     .field("email", FieldSchema::string().email().required())
///     .field("password", FieldSchema::string().min_length(8).required())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    name: Option<String>,
    fields: Vec<(String, FieldSchema)>,
    deny_unknown: bool,
    description: Option<String>,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// A schema documented under `#/components/schemas/{name}`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Add a field; re-adding a name replaces the earlier definition.
    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = schema,
            None => self.fields.push((name, schema)),
        }
        self
    }

    /// Reject keys that are not declared fields.
    pub fn deny_unknown(mut self) -> Self {
        self.deny_unknown = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.fields.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    fn validate_object(
        &self,
        value: &mut Value,
        prefix: &str,
        location: Location,
        errors: &mut Vec<FieldError>,
    ) {
        // A missing body is checked as `{}` so each required field is reported.
        if value.is_null() {
            *value = Value::Object(Map::new());
        }
        let Some(object) = value.as_object_mut() else {
            errors.push(FieldError::new(prefix, "must be an object"));
            return;
        };

        for (name, field) in &self.fields {
            let path = format!("{prefix}.{name}");
            match object.get_mut(name) {
                None | Some(Value::Null) => {
                    if field.required {
                        errors.push(FieldError::new(path, "is required"));
                    }
                }
                Some(present) => field.validate_value(present, &path, location, errors),
            }
        }

        if self.deny_unknown {
            for key in object.keys() {
                if !self.fields.iter().any(|(name, _)| name == key) {
                    errors.push(FieldError::new(format!("{prefix}.{key}"), "is not allowed"));
                }
            }
        }
    }
}

impl Schema for ObjectSchema {
    fn validate(&self, value: &mut Value, location: Location, errors: &mut Vec<FieldError>) {
        self.validate_object(value, location.as_str(), location, errors);
    }

    fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, field) in &self.fields {
            properties.insert(name.clone(), field.json_schema());
            if field.required {
                required.push(json!(name));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        if self.deny_unknown {
            schema.insert("additionalProperties".into(), json!(false));
        }
        if let Some(ref description) = self.description {
            schema.insert("description".into(), json!(description));
        }
        Value::Object(schema)
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }
}

// ── Typed schemas (garde + schemars) ────────────────────────────────────────

/// Schema backed by a Rust type.
///
/// The value is deserialized into `T` and checked with `garde`; the
/// documented shape comes from `schemars`. On success the value is replaced
/// by `T` re-serialized, so defaults applied by serde are visible to the
/// handler.
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Validate, JsonSchema)]
/// struct CreateUser {
///     #[garde(email)]
///     email: String,
/// }
///
/// RouteMeta::post("/").body(Typed::<CreateUser>::new())
/// ```
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for Typed<T>
where
    T: DeserializeOwned + Serialize + garde::Validate + schemars::JsonSchema + 'static,
    T::Context: Default,
{
    fn validate(&self, value: &mut Value, location: Location, errors: &mut Vec<FieldError>) {
        let schema = self.json_schema();
        if value.is_null() && is_object_schema(&schema) {
            *value = Value::Object(Map::new());
        }

        // Structural pass first, so missing and mistyped fields are all
        // reported even though serde stops at the first one.
        let failed = check_properties(&schema, value, location, errors);

        let mut candidate = value.clone();
        if let (Some(object), Some(properties)) = (candidate.as_object_mut(), properties(&schema)) {
            for name in &failed {
                if let Some(field) = properties.get(name) {
                    object.insert(name.clone(), placeholder(&schema, field));
                }
            }
        }

        let parsed = match serde_json::from_value::<T>(candidate) {
            Ok(parsed) => parsed,
            Err(err) => {
                if failed.is_empty() {
                    errors.push(deserialize_error(location, &err));
                }
                return;
            }
        };

        let mut rejected = !failed.is_empty();
        if let Err(report) = garde::Validate::validate(&parsed) {
            for (path, error) in report.iter() {
                let path = path.to_string();
                if failed.iter().any(|name| name == top_level(&path)) {
                    continue;
                }
                let field = if path.is_empty() {
                    location.as_str().to_string()
                } else {
                    location.field(&path)
                };
                errors.push(FieldError::new(field, error.message()));
                rejected = true;
            }
        }

        if !rejected {
            if let Ok(normalized) = serde_json::to_value(&parsed) {
                *value = normalized;
            }
        }
    }

    fn json_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({ "type": "object" }))
    }

    fn name(&self) -> Option<String> {
        Some(T::schema_name().into_owned())
    }
}

fn properties(schema: &Value) -> Option<&Map<String, Value>> {
    schema.get("properties").and_then(Value::as_object)
}

fn is_object_schema(schema: &Value) -> bool {
    properties(schema).is_some() || schema_types(schema).contains(&"object")
}

/// Follow a local `#/$defs/` reference against the root schema.
fn deref<'a>(root: &'a Value, schema: &'a Value) -> &'a Value {
    schema
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|r| r.strip_prefix("#/$defs/"))
        .and_then(|name| root.get("$defs")?.get(name))
        .unwrap_or(schema)
}

fn schema_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(ty)) => vec![ty.as_str()],
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn matches_type(ty: &str, value: &Value) -> bool {
    match ty {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn coerce_scalar(types: &[&str], value: &mut Value) {
    if types.contains(&"string") {
        return;
    }
    for ty in types {
        match *ty {
            "integer" => coerce_string(value, |s| s.parse::<i64>().ok().map(Value::from)),
            "number" => coerce_string(value, |s| {
                s.parse::<f64>().ok().and_then(serde_json::Number::from_f64).map(Value::Number)
            }),
            "boolean" => coerce_string(value, |s| s.parse::<bool>().ok().map(Value::Bool)),
            _ => {}
        }
    }
}

/// Check required and top-level typed properties of a schemars object
/// schema. Returns the names of the fields that failed.
fn check_properties(
    schema: &Value,
    value: &mut Value,
    location: Location,
    errors: &mut Vec<FieldError>,
) -> Vec<String> {
    let mut failed = Vec::new();
    let (Some(properties), Some(object)) = (properties(schema), value.as_object_mut()) else {
        return failed;
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    for (name, field) in properties {
        let field = deref(schema, field);
        let types = schema_types(field);
        match object.get_mut(name) {
            None | Some(Value::Null) => {
                if required.contains(&name.as_str()) && !types.contains(&"null") {
                    errors.push(FieldError::new(location.field(name), "is required"));
                    failed.push(name.clone());
                }
            }
            Some(present) => {
                if location.coerces_strings() {
                    if types.contains(&"array") && !present.is_array() {
                        *present = Value::Array(vec![present.take()]);
                    }
                    coerce_scalar(&types, present);
                }
                if !types.is_empty() && !types.iter().any(|ty| matches_type(ty, present)) {
                    let expected = types.iter().find(|ty| **ty != "null").copied().unwrap_or("null");
                    errors.push(FieldError::new(location.field(name), format!("must be of type {expected}")));
                    failed.push(name.clone());
                }
            }
        }
    }
    failed
}

/// A well-typed stand-in for a failed field, so the remaining fields can
/// still be deserialized and checked by garde.
fn placeholder(root: &Value, field: &Value) -> Value {
    let field = deref(root, field);
    match schema_types(field).into_iter().find(|ty| *ty != "null") {
        Some("string") => Value::String(String::new()),
        Some("integer") | Some("number") => json!(0),
        Some("boolean") => Value::Bool(false),
        Some("array") => Value::Array(Vec::new()),
        _ => Value::Object(Map::new()),
    }
}

/// First segment of a garde path: `address.city` and `emails[1]` belong to
/// `address` and `emails`.
fn top_level(path: &str) -> &str {
    path.split(['.', '[']).next().unwrap_or(path)
}

fn deserialize_error(location: Location, err: &serde_json::Error) -> FieldError {
    let message = err.to_string();
    let quoted = |prefix: &str| {
        message
            .strip_prefix(prefix)
            .and_then(|rest| rest.split_once('`'))
            .map(|(field, _)| field.to_string())
    };
    if let Some(field) = quoted("missing field `") {
        return FieldError::new(location.field(&field), "is required");
    }
    if let Some(field) = quoted("unknown field `") {
        return FieldError::new(location.field(&field), "is not allowed");
    }
    FieldError::new(location.as_str(), message)
}
