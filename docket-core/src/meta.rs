//! Canonical controller and route metadata.
//!
//! Both the router materializer and the OpenAPI materializer read these
//! types, so a route is interpreted the same way whether it is served or
//! documented.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::routing::MethodFilter;
use serde::Serialize;

use crate::middleware::Middleware;
use crate::schema::Schema;

/// HTTP verbs a controller method can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Lower-case form, as used for OpenAPI path-item keys.
    pub fn as_lower(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }

    pub fn filter(self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(method, full path)` pair identifying one registered route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RouteKey {
    pub method: HttpMethod,
    pub path: String,
}

impl RouteKey {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

// ── Controller-level metadata ───────────────────────────────────────────────

/// Metadata attached to a controller type as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerMeta {
    pub base_path: Option<String>,
    pub tags: Vec<String>,
}

impl ControllerMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        push_unique(&mut self.tags, tag.into());
        self
    }

    /// Merge a later fragment into this one.
    ///
    /// `base_path` is last-applied-wins; tags accumulate without duplicates.
    pub fn merge(&mut self, other: ControllerMeta) {
        if other.base_path.is_some() {
            self.base_path = other.base_path;
        }
        for tag in other.tags {
            push_unique(&mut self.tags, tag);
        }
    }

    /// The base path, or `""` when none was attached.
    pub fn base(&self) -> &str {
        self.base_path.as_deref().unwrap_or("")
    }
}

// ── Route-level metadata ────────────────────────────────────────────────────

/// Optional request schemas, one per request part.
#[derive(Clone, Default)]
pub struct Validation {
    pub body: Option<Arc<dyn Schema>>,
    pub params: Option<Arc<dyn Schema>>,
    pub query: Option<Arc<dyn Schema>>,
}

impl Validation {
    pub fn is_empty(&self) -> bool {
        self.body.is_none() && self.params.is_none() && self.query.is_none()
    }

    fn merge(&mut self, other: Validation) {
        if other.body.is_some() {
            self.body = other.body;
        }
        if other.params.is_some() {
            self.params = other.params;
        }
        if other.query.is_some() {
            self.query = other.query;
        }
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let describe = |schema: &Option<Arc<dyn Schema>>| {
            schema
                .as_ref()
                .map(|s| s.name().unwrap_or_else(|| "<inline>".to_string()))
        };
        f.debug_struct("Validation")
            .field("body", &describe(&self.body))
            .field("params", &describe(&self.params))
            .field("query", &describe(&self.query))
            .finish()
    }
}

/// Documentation attributes of a single route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocFields {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub responses: BTreeMap<u16, String>,
    pub bearer_auth: Option<bool>,
    pub operation_id: Option<String>,
    pub deprecated: Option<bool>,
}

impl DocFields {
    fn merge(&mut self, other: DocFields) {
        if other.summary.is_some() {
            self.summary = other.summary;
        }
        if other.description.is_some() {
            self.description = other.description;
        }
        for tag in other.tags {
            push_unique(&mut self.tags, tag);
        }
        self.responses.extend(other.responses);
        if other.bearer_auth.is_some() {
            self.bearer_auth = other.bearer_auth;
        }
        if other.operation_id.is_some() {
            self.operation_id = other.operation_id;
        }
        if other.deprecated.is_some() {
            self.deprecated = other.deprecated;
        }
    }

    pub fn requires_bearer(&self) -> bool {
        self.bearer_auth.unwrap_or(false)
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated.unwrap_or(false)
    }
}

/// Metadata attached to one controller method.
///
/// The same type is used both for the fragments passed to
/// [`ControllerDef::attach`](crate::controller::ControllerDef::attach) and for
/// the merged result, since merging fragments yields another fragment.
///
/// ```ignore
/// RouteMeta::post("/login")
///     .body(login_schema())
///     .summary("Log in")
///     .response(200, "Logged in")
///     .response(400, "Validation error")
/// ```
#[derive(Clone, Default)]
pub struct RouteMeta {
    pub http_method: Option<HttpMethod>,
    pub path: Option<String>,
    pub middlewares: Vec<Arc<dyn Middleware>>,
    pub validation: Validation,
    pub docs: DocFields,
}

impl RouteMeta {
    /// An empty fragment, for attaching docs or middlewares without a verb.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verb(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            http_method: Some(method),
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::verb(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::verb(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::verb(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::verb(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::verb(HttpMethod::Delete, path)
    }

    /// Append a middleware; middlewares run in the order they are attached.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn body(mut self, schema: impl Schema) -> Self {
        self.validation.body = Some(Arc::new(schema));
        self
    }

    pub fn params(mut self, schema: impl Schema) -> Self {
        self.validation.params = Some(Arc::new(schema));
        self
    }

    pub fn query(mut self, schema: impl Schema) -> Self {
        self.validation.query = Some(Arc::new(schema));
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.docs.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.docs.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        push_unique(&mut self.docs.tags, tag.into());
        self
    }

    pub fn response(mut self, status: u16, description: impl Into<String>) -> Self {
        self.docs.responses.insert(status, description.into());
        self
    }

    pub fn bearer_auth(mut self) -> Self {
        self.docs.bearer_auth = Some(true);
        self
    }

    pub fn public(mut self) -> Self {
        self.docs.bearer_auth = Some(false);
        self
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.docs.operation_id = Some(id.into());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.docs.deprecated = Some(true);
        self
    }

    /// Merge a later fragment into this one.
    ///
    /// Scalar fields are last-applied-wins, middlewares accumulate in order,
    /// doc tags accumulate as a set and responses merge per status code.
    pub fn merge(&mut self, other: RouteMeta) {
        if other.http_method.is_some() {
            self.http_method = other.http_method;
        }
        if other.path.is_some() {
            self.path = other.path;
        }
        self.middlewares.extend(other.middlewares);
        self.validation.merge(other.validation);
        self.docs.merge(other.docs);
    }
}

impl fmt::Debug for RouteMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMeta")
            .field("http_method", &self.http_method)
            .field("path", &self.path)
            .field("middlewares", &self.middlewares.len())
            .field("validation", &self.validation)
            .field("docs", &self.docs)
            .finish()
    }
}

/// A resolved route as seen by documentation consumers.
///
/// Produced by [`ControllerDef::describe`](crate::controller::ControllerDef::describe);
/// carries everything except the handler.
#[derive(Debug, Clone)]
pub struct RouteDoc {
    pub controller: &'static str,
    pub operation: &'static str,
    pub method: HttpMethod,
    pub path: String,
    /// Controller tags followed by the route's own tags.
    pub tags: Vec<String>,
    pub validation: Validation,
    pub docs: DocFields,
}

impl RouteDoc {
    pub fn key(&self) -> RouteKey {
        RouteKey::new(self.method, self.path.clone())
    }

    pub fn operation_id(&self) -> String {
        self.docs
            .operation_id
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.controller, self.operation))
    }
}

pub(crate) fn push_unique(tags: &mut Vec<String>, tag: String) {
    if !tags.contains(&tag) {
        tags.push(tag);
    }
}
