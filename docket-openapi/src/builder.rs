use std::sync::Arc;

use docket_core::{DocsConfig, RouteDoc, Schema};
use serde_json::{json, Map, Value};
use tracing::warn;

pub const OPENAPI_VERSION: &str = "3.0.3";

/// Recursively rewrite `$ref` paths from schemars format to OpenAPI components format.
///
/// schemars 1.x generates JSON Schema Draft 2020-12 using `$defs` and
/// `$ref: "#/$defs/X"`; OpenAPI expects `#/components/schemas/X`.
fn sanitize_schema(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::String(ref_str)) = obj.get_mut("$ref") {
                if ref_str.starts_with("#/$defs/") {
                    *ref_str = ref_str.replace("#/$defs/", "#/components/schemas/");
                }
            }
            for (_, v) in obj.iter_mut() {
                sanitize_schema(v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                sanitize_schema(v);
            }
        }
        _ => {}
    }
}

/// Prepare a schema for embedding: drop `$schema`, promote `$defs` into
/// `schemas` and rewrite references.
fn absorb_schema(schemas: &mut Map<String, Value>, schema: &dyn Schema) -> Value {
    let mut doc = schema.json_schema();
    if let Some(obj) = doc.as_object_mut() {
        obj.remove("$schema");
        if let Some(Value::Object(defs)) = obj.remove("$defs") {
            for (name, mut def) in defs {
                sanitize_schema(&mut def);
                schemas.entry(name).or_insert(def);
            }
        }
    }
    sanitize_schema(&mut doc);
    doc
}

/// Configuration for the generated OpenAPI document and its endpoints.
#[derive(Debug, Clone)]
pub struct OpenApiConfig {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub spec_path: String,
    pub docs_path: String,
    pub docs_ui: bool,
}

impl OpenApiConfig {
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            title: title.to_string(),
            version: version.to_string(),
            description: None,
            spec_path: "/openapi.json".to_string(),
            docs_path: "/docs".to_string(),
            docs_ui: true,
        }
    }

    /// Build from the `openapi` section of the application config.
    pub fn from_docs_config(docs: &DocsConfig) -> Self {
        Self {
            title: docs.title.clone(),
            version: docs.version.clone(),
            description: docs.description.clone(),
            spec_path: docs.spec_path.clone(),
            docs_path: docs.docs_path.clone(),
            docs_ui: docs.docs_ui,
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_docs_ui(mut self, enabled: bool) -> Self {
        self.docs_ui = enabled;
        self
    }

    pub fn with_spec_path(mut self, path: &str) -> Self {
        self.spec_path = path.to_string();
        self
    }

    pub fn with_docs_path(mut self, path: &str) -> Self {
        self.docs_path = path.to_string();
        self
    }
}

/// An OpenAPI `paths` object plus the component schemas it references.
///
/// Fragments of several controllers merge into one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiFragment {
    pub paths: Map<String, Value>,
    pub schemas: Map<String, Value>,
}

impl ApiFragment {
    pub fn from_routes(routes: &[RouteDoc]) -> Self {
        let mut fragment = Self::default();
        for route in routes {
            let operation = build_operation(route, &mut fragment.schemas);
            fragment.insert_operation(&document_path(&route.path), route.method.as_lower(), operation);
        }
        fragment
    }

    /// Merge `other` into `self`. A repeated `(path, method)` keeps the later
    /// operation; a repeated schema name keeps the first schema.
    pub fn merge(&mut self, other: ApiFragment) {
        for (path, item) in other.paths {
            let Value::Object(operations) = item else { continue };
            for (method, operation) in operations {
                self.insert_operation(&path, &method, operation);
            }
        }
        for (name, schema) in other.schemas {
            self.schemas.entry(name).or_insert(schema);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of operations across all paths.
    pub fn operation_count(&self) -> usize {
        self.paths
            .values()
            .filter_map(Value::as_object)
            .map(Map::len)
            .sum()
    }

    fn insert_operation(&mut self, path: &str, method: &str, operation: Value) {
        let item = self
            .paths
            .entry(path.to_string())
            .or_insert_with(|| json!({}));
        if let Some(obj) = item.as_object_mut() {
            if obj.insert(method.to_string(), operation).is_some() {
                warn!(%path, %method, "operation documented twice, keeping the later one");
            }
        }
    }
}

fn build_operation(route: &RouteDoc, schemas: &mut Map<String, Value>) -> Value {
    let docs = &route.docs;
    let mut operation: Map<String, Value> = Map::new();

    operation.insert("operationId".into(), json!(route.operation_id()));
    operation.insert("summary".into(), json!(docs.summary.as_deref().unwrap_or("")));
    operation.insert("description".into(), json!(docs.description.as_deref().unwrap_or("")));
    operation.insert("tags".into(), json!(route.tags));

    let parameters = build_parameters(route, schemas);
    if !parameters.is_empty() {
        operation.insert("parameters".into(), Value::Array(parameters));
    }

    if let Some(ref body) = route.validation.body {
        let inline = absorb_schema(schemas, body.as_ref());
        let schema = match body.name() {
            Some(name) => {
                schemas.entry(name.clone()).or_insert(inline);
                json!({ "$ref": format!("#/components/schemas/{name}") })
            }
            None => inline,
        };
        operation.insert(
            "requestBody".into(),
            json!({
                "required": true,
                "content": { "application/json": { "schema": schema } }
            }),
        );
    }

    if docs.requires_bearer() {
        operation.insert("security".into(), json!([{ "bearerAuth": [] }]));
    }

    // Only declared codes are documented; `default` keeps an undocumented
    // operation valid.
    let mut responses: Map<String, Value> = Map::new();
    for (status, description) in &docs.responses {
        responses.insert(status.to_string(), json!({ "description": description }));
    }
    if responses.is_empty() {
        responses.insert("default".into(), json!({ "description": "Default response" }));
    }
    operation.insert("responses".into(), Value::Object(responses));

    if docs.is_deprecated() {
        operation.insert("deprecated".into(), json!(true));
    }

    Value::Object(operation)
}

fn build_parameters(route: &RouteDoc, schemas: &mut Map<String, Value>) -> Vec<Value> {
    let mut parameters = Vec::new();

    let params = route
        .validation
        .params
        .as_ref()
        .map(|schema| absorb_schema(schemas, schema.as_ref()));
    for name in path_placeholders(&route.path) {
        let schema = params
            .as_ref()
            .and_then(|p| p.get("properties"))
            .and_then(|props| props.get(name))
            .cloned()
            .unwrap_or_else(|| json!({ "type": "string" }));
        parameters.push(json!({
            "name": name,
            "in": "path",
            "required": true,
            "schema": schema
        }));
    }

    if let Some(ref query) = route.validation.query {
        let doc = absorb_schema(schemas, query.as_ref());
        let required = required_names(&doc);
        if let Some(Value::Object(props)) = doc.get("properties") {
            for (name, schema) in props {
                parameters.push(json!({
                    "name": name,
                    "in": "query",
                    "required": required.contains(&name.as_str()),
                    "schema": schema
                }));
            }
        }
    }

    parameters
}

fn required_names(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// OpenAPI path template of a router path: `{*rest}` becomes `{rest}`.
pub fn document_path(path: &str) -> String {
    path.replace("{*", "{")
}

/// `{name}` and `{*name}` segments of `path`, in order.
fn path_placeholders(path: &str) -> Vec<&str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| name.trim_start_matches('*'))
        .collect()
}

/// Build a complete OpenAPI document from config and resolved routes.
pub fn build_spec(config: &OpenApiConfig, routes: &[RouteDoc]) -> Value {
    spec_from_fragment(config, ApiFragment::from_routes(routes))
}

pub(crate) fn spec_from_fragment(config: &OpenApiConfig, fragment: ApiFragment) -> Value {
    let mut info: Map<String, Value> = Map::new();
    info.insert("title".into(), json!(config.title));
    info.insert("version".into(), json!(config.version));
    if let Some(ref desc) = config.description {
        info.insert("description".into(), json!(desc));
    }

    let mut components: Map<String, Value> = Map::new();
    components.insert(
        "securitySchemes".into(),
        json!({
            "bearerAuth": {
                "type": "http",
                "scheme": "bearer",
                "bearerFormat": "JWT"
            }
        }),
    );
    if !fragment.schemas.is_empty() {
        components.insert("schemas".into(), Value::Object(fragment.schemas));
    }

    json!({
        "openapi": OPENAPI_VERSION,
        "info": info,
        "paths": fragment.paths,
        "components": components
    })
}

/// Shared, pre-rendered document served by [`openapi_routes`](crate::openapi_routes).
pub(crate) fn render_spec(config: &OpenApiConfig, routes: &[RouteDoc]) -> Arc<str> {
    let spec = build_spec(config, routes);
    serde_json::to_string_pretty(&spec)
        .unwrap_or_else(|_| "{}".to_string())
        .into()
}
