//! Router materialization.
//!
//! Turns the declared routes of one controller into an `axum::Router`. Every
//! route runs its middlewares in declaration order, then validates the
//! request against its schemas, then calls the bound handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::RawPathParams;
use axum::routing::on;
use tracing::{debug, info};

use crate::controller::{Handler, ResolvedRoute};
use crate::error::{HttpError, MaterializeError};
use crate::http::{Bytes, IntoResponse, Request, Response, Router};
use crate::meta::{RouteKey, Validation};
use crate::middleware::{BoxFuture, Endpoint, Middleware, Next};
use crate::registry::ControllerRegistry;
use crate::request::{ApiRequest, PathParams};
use crate::validation::validate_request;

/// Largest request body read before answering `413 Payload Too Large`.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    pub body_limit: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// The router of one controller, with the routes it registered.
pub struct MaterializedRouter {
    controller: &'static str,
    routes: Vec<RouteKey>,
    router: Router,
}

impl MaterializedRouter {
    pub fn controller(&self) -> &'static str {
        self.controller
    }

    /// Registered routes, in registration order.
    pub fn routes(&self) -> &[RouteKey] {
        &self.routes
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    pub(crate) fn into_parts(self) -> (Vec<RouteKey>, Router) {
        (self.routes, self.router)
    }
}

impl From<MaterializedRouter> for Router {
    fn from(materialized: MaterializedRouter) -> Self {
        materialized.router
    }
}

impl std::fmt::Debug for MaterializedRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterializedRouter")
            .field("controller", &self.controller)
            .field("routes", &self.routes)
            .finish()
    }
}

/// Build the router of `C` under `mount` with default options.
pub fn materialize_router<C: Send + Sync + 'static>(
    registry: &ControllerRegistry,
    controller: Arc<C>,
    mount: &str,
) -> Result<MaterializedRouter, MaterializeError> {
    materialize_router_with(registry, controller, mount, RouterOptions::default())
}

/// Build the router of `C` under `mount`.
///
/// All routes are checked before any is registered: a duplicate
/// `(method, path)` pair or a path the router cannot match fails the whole
/// controller.
pub fn materialize_router_with<C: Send + Sync + 'static>(
    registry: &ControllerRegistry,
    controller: Arc<C>,
    mount: &str,
    options: RouterOptions,
) -> Result<MaterializedRouter, MaterializeError> {
    let def = registry
        .definition::<C>()
        .ok_or(MaterializeError::NotDeclared(std::any::type_name::<C>()))?;

    let resolved = def.resolve(mount);
    check_routes(&resolved)?;

    let mut router = Router::new();
    let mut routes = Vec::with_capacity(resolved.len());

    for route in resolved {
        let key = RouteKey::new(route.method, route.path.clone());
        let middlewares: Arc<[Arc<dyn Middleware>]> = route.meta.middlewares.clone().into();
        let endpoint: Arc<dyn Endpoint> = Arc::new(ValidatedEndpoint {
            route: Arc::from(route.qualified_name()),
            controller: controller.clone(),
            handler: route.handler.clone(),
            validation: route.meta.validation.clone(),
            body_limit: options.body_limit,
        });

        let entry = move |params: Result<RawPathParams, RawPathParamsRejection>, mut request: Request| {
            let middlewares = middlewares.clone();
            let endpoint = endpoint.clone();
            async move {
                let params = params.map(|raw| PathParams::from_raw(&raw)).unwrap_or_default();
                request.extensions_mut().insert(params);
                Next::new(middlewares, endpoint).run(request).await
            }
        };

        debug!(
            route = %key,
            handler = %route.qualified_name(),
            middlewares = route.meta.middlewares.len(),
            "route registered"
        );
        router = router.route(&route.path, on(route.method.filter(), entry));
        routes.push(key);
    }

    info!(controller = def.name(), routes = routes.len(), "controller materialized");

    Ok(MaterializedRouter {
        controller: def.name(),
        routes,
        router,
    })
}

struct ValidatedEndpoint<C> {
    route: Arc<str>,
    controller: Arc<C>,
    handler: Handler<C>,
    validation: Validation,
    body_limit: usize,
}

impl<C: Send + Sync + 'static> Endpoint for ValidatedEndpoint<C> {
    fn call(&self, request: Request) -> BoxFuture<Response> {
        let route = self.route.clone();
        let controller = self.controller.clone();
        let handler = self.handler.clone();
        let validation = self.validation.clone();
        let body_limit = self.body_limit;

        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let bytes = match read_body(body, body_limit).await {
                Ok(bytes) => bytes,
                Err(err) => return err.into_response(),
            };

            let params = parts.extensions.get::<PathParams>().cloned().unwrap_or_default();
            match validate_request(&validation, &params, parts.uri.query(), &bytes) {
                Ok(validated) => handler(controller, ApiRequest::new(parts, bytes, validated)).await,
                Err(rejected) => {
                    debug!(%route, errors = rejected.errors.len(), "request failed validation");
                    rejected.into_response()
                }
            }
        })
    }
}

async fn read_body(body: axum::body::Body, limit: usize) -> Result<Bytes, HttpError> {
    axum::body::to_bytes(body, limit).await.map_err(|err| {
        let inner = err.into_inner();
        if inner.is::<http_body_util::LengthLimitError>() {
            HttpError::PayloadTooLarge(format!("request body exceeds {limit} bytes"))
        } else {
            HttpError::BadRequest(format!("failed to read request body: {inner}"))
        }
    })
}

// ── Pre-flight checks ───────────────────────────────────────────────────────

fn check_routes<C>(routes: &[ResolvedRoute<'_, C>]) -> Result<(), MaterializeError> {
    let mut table = RouteTable::default();
    for route in routes {
        check_path(&route.path).map_err(|reason| MaterializeError::InvalidPath {
            operation: route.qualified_name(),
            path: route.path.clone(),
            reason,
        })?;
        table.insert(&RouteKey::new(route.method, route.path.clone()), route.qualified_name())?;
    }
    Ok(())
}

/// Routes claimed so far, keyed by method and path shape.
///
/// `/users/{id}` and `/users/{name}` have the same shape: under one method
/// they are duplicates, under two methods the router still cannot hold both
/// spellings.
#[derive(Debug, Default)]
pub(crate) struct RouteTable {
    owners: HashMap<RouteKey, String>,
    spellings: HashMap<String, String>,
}

impl RouteTable {
    pub(crate) fn insert(&mut self, route: &RouteKey, owner: String) -> Result<(), MaterializeError> {
        let shape = route_shape(&route.path);
        let key = RouteKey::new(route.method, shape.clone());
        if let Some(first) = self.owners.get(&key) {
            return Err(MaterializeError::DuplicateRoute {
                route: route.clone(),
                first: first.clone(),
                second: owner,
            });
        }
        match self.spellings.get(&shape) {
            Some(path) if *path != route.path => {
                return Err(MaterializeError::InvalidPath {
                    operation: owner,
                    path: route.path.clone(),
                    reason: "conflicts with a route that names its parameters differently",
                });
            }
            Some(_) => {}
            None => {
                self.spellings.insert(shape, route.path.clone());
            }
        }
        self.owners.insert(key, owner);
        Ok(())
    }
}

/// Check that the router can register `path`.
pub(crate) fn check_path(path: &str) -> Result<(), &'static str> {
    if !path.starts_with('/') {
        return Err("path must start with `/`");
    }
    let segments: Vec<&str> = path.split('/').skip(1).collect();
    let mut names: Vec<&str> = Vec::new();

    for (index, segment) in segments.iter().enumerate() {
        if segment.starts_with(':') {
            return Err("`:name` segments are not supported, use `{name}`");
        }
        if !segment.contains('{') && !segment.contains('}') {
            continue;
        }
        let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
            return Err("a path parameter must span a whole segment");
        };
        let (name, wildcard) = match inner.strip_prefix('*') {
            Some(name) => (name, true),
            None => (inner, false),
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err("path parameter names must be non-empty identifiers");
        }
        if wildcard && index + 1 != segments.len() {
            return Err("a wildcard parameter must be the last segment");
        }
        if names.contains(&name) {
            return Err("path parameter names must be unique");
        }
        names.push(name);
    }
    Ok(())
}

/// `path` with every parameter name erased, e.g. `/users/{}`.
pub(crate) fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix('{') {
            Some(rest) if rest.starts_with('*') => "{*}",
            Some(_) => "{}",
            None => segment,
        })
        .collect::<Vec<_>>()
        .join("/")
}
