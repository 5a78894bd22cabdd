use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use docket_core::validation::validate_request;
use docket_core::{
    materialize_router, ApiRequest, ControllerDef, ControllerRegistry, FieldError, FieldSchema, Location,
    ObjectSchema, PathParams, RouteMeta, Schema, Typed, Validation, ValidationErrorResponse,
};
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceExt;

fn login_schema() -> ObjectSchema {
    ObjectSchema::named("LoginRequest")
        .field("email", FieldSchema::string().email().required())
        .field("password", FieldSchema::string().min_length(8).required())
}

#[test]
fn every_failing_body_field_is_reported() {
    let validation = Validation {
        body: Some(Arc::new(login_schema())),
        ..Validation::default()
    };
    let err = validate_request(
        &validation,
        &PathParams::default(),
        None,
        br#"{"email": "not-an-email", "password": "short"}"#,
    )
    .unwrap_err();

    assert!(!err.success);
    assert_eq!(err.message, "Validation error");
    assert_eq!(
        err.errors,
        vec![
            FieldError::new("body.email", "must be a valid email"),
            FieldError::new("body.password", "must be at least 8 characters long"),
        ]
    );
}

#[test]
fn malformed_email_and_missing_password_are_both_reported() {
    let validation = Validation {
        body: Some(Arc::new(login_schema())),
        ..Validation::default()
    };
    let err = validate_request(&validation, &PathParams::default(), None, br#"{"email":"not-an-email"}"#)
        .unwrap_err();
    assert_eq!(
        err.errors,
        vec![
            FieldError::new("body.email", "must be a valid email"),
            FieldError::new("body.password", "is required"),
        ]
    );
}

#[test]
fn missing_body_reports_each_required_field() {
    let validation = Validation {
        body: Some(Arc::new(login_schema())),
        ..Validation::default()
    };
    let err = validate_request(&validation, &PathParams::default(), None, b"").unwrap_err();
    assert!(err.has_field("body.email"));
    assert!(err.has_field("body.password"));
    assert_eq!(err.errors.len(), 2);
}

#[test]
fn errors_are_aggregated_across_parts() {
    let validation = Validation {
        body: Some(Arc::new(login_schema())),
        params: Some(Arc::new(ObjectSchema::new().field("id", FieldSchema::string().uuid().required()))),
        query: Some(Arc::new(ObjectSchema::new().field("limit", FieldSchema::integer().maximum(50.0)))),
    };
    let err = validate_request(
        &validation,
        &PathParams::from_pairs([("id", "123")]),
        Some("limit=500"),
        br#"{"email": "jane@example.com"}"#,
    )
    .unwrap_err();

    let fields: Vec<&str> = err.errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["body.password", "params.id", "query.limit"]);
}

#[test]
fn valid_request_returns_coerced_parts() {
    let validation = Validation {
        params: Some(Arc::new(ObjectSchema::new().field("id", FieldSchema::integer().required()))),
        query: Some(Arc::new(ObjectSchema::new().field("verbose", FieldSchema::boolean()))),
        ..Validation::default()
    };
    let parts = validate_request(
        &validation,
        &PathParams::from_pairs([("id", "9")]),
        Some("verbose=false"),
        b"",
    )
    .unwrap();
    assert_eq!(parts.params["id"], json!(9));
    assert_eq!(parts.query["verbose"], json!(false));
    assert_eq!(parts.body, Value::Null);
}

#[test]
fn unknown_keys_are_rejected_when_denied() {
    let schema = ObjectSchema::new()
        .field("name", FieldSchema::string())
        .deny_unknown();
    let mut value = json!({ "name": "x", "admin": true });
    let mut errors = Vec::new();
    schema.validate(&mut value, Location::Body, &mut errors);
    assert_eq!(errors, vec![FieldError::new("body.admin", "is not allowed")]);
}

// ── Typed schemas ───────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, garde::Validate, schemars::JsonSchema)]
struct Signup {
    #[garde(email)]
    email: String,
    #[garde(length(min = 8))]
    password: String,
    #[serde(default)]
    #[garde(skip)]
    newsletter: bool,
}

#[test]
fn typed_schema_reports_garde_errors_per_field() {
    let schema = Typed::<Signup>::new();
    let mut value = json!({ "email": "nope", "password": "short" });
    let mut errors = Vec::new();
    schema.validate(&mut value, Location::Body, &mut errors);

    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert!(fields.contains(&"body.email"), "{errors:?}");
    assert!(fields.contains(&"body.password"), "{errors:?}");
}

#[test]
fn typed_schema_reports_missing_fields_as_required() {
    let schema = Typed::<Signup>::new();
    let mut value = json!({ "password": "long enough" });
    let mut errors = Vec::new();
    schema.validate(&mut value, Location::Body, &mut errors);
    assert_eq!(errors, vec![FieldError::new("body.email", "is required")]);
}

#[test]
fn typed_schema_reports_format_and_missing_fields_together() {
    let schema = Typed::<Signup>::new();
    let mut value = json!({ "email": "not-an-email" });
    let mut errors = Vec::new();
    schema.validate(&mut value, Location::Body, &mut errors);

    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(fields.contains(&"body.email"), "{errors:?}");
    assert!(errors.contains(&FieldError::new("body.password", "is required")), "{errors:?}");
}

#[test]
fn typed_schema_reports_every_required_field_of_an_empty_body() {
    let validation = Validation {
        body: Some(Arc::new(Typed::<Signup>::new())),
        ..Validation::default()
    };
    let err = validate_request(&validation, &PathParams::default(), None, b"").unwrap_err();
    assert_eq!(
        err.errors,
        vec![
            FieldError::new("body.email", "is required"),
            FieldError::new("body.password", "is required"),
        ]
    );
}

#[test]
fn typed_schema_names_the_mistyped_field() {
    let schema = Typed::<Signup>::new();
    let mut value = json!({ "email": "jane@example.com", "password": 12345678 });
    let mut errors = Vec::new();
    schema.validate(&mut value, Location::Body, &mut errors);
    assert_eq!(errors, vec![FieldError::new("body.password", "must be of type string")]);
}

#[derive(Debug, Serialize, Deserialize, garde::Validate, schemars::JsonSchema)]
struct Paging {
    #[garde(range(min = 1))]
    page: u32,
    #[serde(default)]
    #[garde(skip)]
    archived: bool,
}

#[test]
fn typed_query_values_are_coerced() {
    let validation = Validation {
        query: Some(Arc::new(Typed::<Paging>::new())),
        ..Validation::default()
    };
    let parts = validate_request(&validation, &PathParams::default(), Some("page=2&archived=true"), b"").unwrap();
    assert_eq!(parts.query["page"], json!(2));
    assert_eq!(parts.query["archived"], json!(true));

    let err = validate_request(&validation, &PathParams::default(), Some("page=two"), b"").unwrap_err();
    assert_eq!(err.errors, vec![FieldError::new("query.page", "must be of type integer")]);

    let err = validate_request(&validation, &PathParams::default(), Some("page=0"), b"").unwrap_err();
    assert!(err.has_field("query.page"), "{:?}", err.errors);
}

#[test]
fn typed_schema_normalizes_valid_values() {
    let schema = Typed::<Signup>::new();
    let mut value = json!({ "email": "jane@example.com", "password": "long enough" });
    let mut errors = Vec::new();
    schema.validate(&mut value, Location::Body, &mut errors);
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(value["newsletter"], json!(false));
}

#[test]
fn typed_schema_is_named_and_documented() {
    let schema = Typed::<Signup>::new();
    assert_eq!(schema.name().as_deref(), Some("Signup"));
    let doc = schema.json_schema();
    assert_eq!(doc["type"], "object");
    assert!(doc["properties"]["email"].is_object());
}

// ── Over HTTP ───────────────────────────────────────────────────────────

struct Auth;

#[tokio::test]
async fn login_with_bad_credentials_shape_returns_structured_400() {
    let mut registry = ControllerRegistry::new();
    registry.declare(
        ControllerDef::<Auth>::new().route(
            "login",
            |_c: Arc<Auth>, _r: ApiRequest| async { "token" },
            RouteMeta::post("/login").body(login_schema()),
        ),
    );
    let router = materialize_router(&registry, Arc::new(Auth), "").unwrap().into_router();

    let req = Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"email":"not-an-email","password":"short"}"#))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: ValidationErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(!body.success);
    assert_eq!(body.message, "Validation error");
    assert!(body.has_field("body.email"));
    assert!(body.has_field("body.password"));
}
