use crate::http::{IntoResponse, Json, Response, StatusCode};
use crate::meta::Validation;
use crate::request::PathParams;
use crate::schema::Location;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Error types ────────────────────────────────────────────

/// A field-level validation error, e.g. `body.email: must be a valid email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The structured 400 response returned when a request fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub success: bool,
    pub message: String,
    pub errors: Vec<FieldError>,
}

impl ValidationErrorResponse {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self {
            success: false,
            message: "Validation error".to_string(),
            errors,
        }
    }

    /// Whether any error was reported for `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl IntoResponse for ValidationErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

// ── Request validation ─────────────────────────────────────

/// Request parts after validation; values are coerced by their schemas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedParts {
    pub params: Map<String, Value>,
    pub query: Map<String, Value>,
    pub body: Value,
}

/// Validate the three request parts against their schemas.
///
/// Every part is checked even when an earlier one failed, so the error list
/// covers body, params and query together. Parts without a schema pass
/// through unchanged.
pub fn validate_request(
    validation: &Validation,
    params: &PathParams,
    query: Option<&str>,
    body: &[u8],
) -> Result<ValidatedParts, ValidationErrorResponse> {
    let mut errors = Vec::new();

    let mut body_value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => value,
            Err(err) => {
                if validation.body.is_some() {
                    errors.push(FieldError::new(
                        Location::Body.as_str(),
                        format!("must be valid JSON ({err})"),
                    ));
                }
                Value::Null
            }
        }
    };
    let mut params_value = Value::Object(params.to_map());
    let mut query_value = Value::Object(parse_query(query));

    // A body that failed to parse is already reported; its fields are not.
    let body_parsed = errors.is_empty();
    if let (Some(schema), true) = (&validation.body, body_parsed) {
        schema.validate(&mut body_value, Location::Body, &mut errors);
    }
    if let Some(schema) = &validation.params {
        schema.validate(&mut params_value, Location::Params, &mut errors);
    }
    if let Some(schema) = &validation.query {
        schema.validate(&mut query_value, Location::Query, &mut errors);
    }

    if !errors.is_empty() {
        return Err(ValidationErrorResponse::new(errors));
    }

    Ok(ValidatedParts {
        params: into_map(params_value),
        query: into_map(query_value),
        body: body_value,
    })
}

/// Parse a query string into a JSON object of strings.
///
/// Repeated keys collect into an array in order of appearance.
pub fn parse_query(query: Option<&str>) -> Map<String, Value> {
    let mut out = Map::new();
    let Some(query) = query else {
        return out;
    };
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match out.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                out.insert(key.into_owned(), value);
            }
        }
    }
    out
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
