use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::http::{IntoResponse, Response};
use crate::meta::{push_unique, ControllerMeta, HttpMethod, RouteDoc, RouteMeta};
use crate::middleware::BoxFuture;
use crate::request::ApiRequest;

/// A bound controller method.
pub type Handler<C> = Arc<dyn Fn(Arc<C>, ApiRequest) -> BoxFuture<Response> + Send + Sync>;

/// A type that declares its routes.
///
/// `declare` runs once, when the controller is registered with
/// [`ControllerRegistry::register`](crate::registry::ControllerRegistry::register).
///
/// ```ignore
/// impl Controller for UserController {
///     fn declare() -> ControllerDef<Self> {
///         ControllerDef::new()
///             .attach_class(ControllerMeta::new().base_path("/users").tag("Users"))
///             .route("profile", Self::profile, RouteMeta::get("/profile").bearer_auth())
///     }
/// }
/// ```
pub trait Controller: Send + Sync + Sized + 'static {
    fn declare() -> ControllerDef<Self>;
}

struct MethodEntry<C> {
    name: &'static str,
    handler: Option<Handler<C>>,
    meta: RouteMeta,
}

/// The accumulated metadata of one controller type.
///
/// Methods keep the order of their first declaration; that order is the
/// registration order of the materialized routes.
pub struct ControllerDef<C> {
    name: &'static str,
    class: ControllerMeta,
    methods: Vec<MethodEntry<C>>,
}

impl<C: Send + Sync + 'static> Default for ControllerDef<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync + 'static> ControllerDef<C> {
    pub fn new() -> Self {
        Self {
            name: short_type_name::<C>(),
            class: ControllerMeta::default(),
            methods: Vec::new(),
        }
    }

    /// Override the controller name used in operation ids and logs.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Merge a controller-level fragment.
    pub fn attach_class(mut self, meta: ControllerMeta) -> Self {
        self.class.merge(meta);
        self
    }

    /// Declare a method and bind its handler.
    ///
    /// Binding a handler to an already declared method replaces the handler
    /// and keeps the method's position and metadata.
    pub fn method<H, Fut, R>(mut self, name: &'static str, handler: H) -> Self
    where
        H: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        let handler: Handler<C> = Arc::new(move |controller: Arc<C>, request: ApiRequest| -> BoxFuture<Response> {
            let fut = handler(controller, request);
            Box::pin(async move { fut.await.into_response() })
        });
        self.entry_mut(name).handler = Some(handler);
        self
    }

    /// Merge a method-level fragment into the named method.
    pub fn attach(mut self, name: &'static str, meta: RouteMeta) -> Self {
        self.entry_mut(name).meta.merge(meta);
        self
    }

    /// [`method`](Self::method) followed by [`attach`](Self::attach).
    pub fn route<H, Fut, R>(self, name: &'static str, handler: H, meta: RouteMeta) -> Self
    where
        H: Fn(Arc<C>, ApiRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.method(name, handler).attach(name, meta)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn class_meta(&self) -> &ControllerMeta {
        &self.class
    }

    pub fn route_meta(&self, method: &str) -> Option<&RouteMeta> {
        self.methods.iter().find(|m| m.name == method).map(|m| &m.meta)
    }

    /// Declared method names, in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.iter().map(|m| m.name)
    }

    /// Resolve the routes of this controller under `mount`.
    ///
    /// Methods without a verb are not routes and are skipped. A method with a
    /// verb but no bound handler is skipped with a warning. Both the router
    /// and the document materializer go through this function.
    pub fn resolve(&self, mount: &str) -> Vec<ResolvedRoute<'_, C>> {
        let prefix = join_path(mount, self.class.base());
        let mut routes = Vec::with_capacity(self.methods.len());

        for entry in &self.methods {
            let Some(method) = entry.meta.http_method else {
                debug!(controller = self.name, method = entry.name, "no verb attached, skipping");
                continue;
            };
            let Some(handler) = entry.handler.as_ref() else {
                warn!(
                    controller = self.name,
                    method = entry.name,
                    "verb attached to a method without a handler, skipping"
                );
                continue;
            };

            let mut tags = self.class.tags.clone();
            for tag in &entry.meta.docs.tags {
                push_unique(&mut tags, tag.clone());
            }

            routes.push(ResolvedRoute {
                controller: self.name,
                operation: entry.name,
                method,
                path: join_path(&prefix, entry.meta.path.as_deref().unwrap_or("")),
                tags,
                meta: &entry.meta,
                handler,
            });
        }
        routes
    }

    /// Handler-free view of [`resolve`](Self::resolve) for documentation.
    pub fn describe(&self, mount: &str) -> Vec<RouteDoc> {
        self.resolve(mount)
            .into_iter()
            .map(ResolvedRoute::into_doc)
            .collect()
    }

    fn entry_mut(&mut self, name: &'static str) -> &mut MethodEntry<C> {
        let index = match self.methods.iter().position(|m| m.name == name) {
            Some(index) => index,
            None => {
                self.methods.push(MethodEntry {
                    name,
                    handler: None,
                    meta: RouteMeta::default(),
                });
                self.methods.len() - 1
            }
        };
        &mut self.methods[index]
    }
}

/// A route ready to be registered: verb, full path, metadata and handler.
pub struct ResolvedRoute<'a, C> {
    pub controller: &'static str,
    pub operation: &'static str,
    pub method: HttpMethod,
    pub path: String,
    pub tags: Vec<String>,
    pub meta: &'a RouteMeta,
    pub handler: &'a Handler<C>,
}

impl<C> ResolvedRoute<'_, C> {
    pub fn into_doc(self) -> RouteDoc {
        RouteDoc {
            controller: self.controller,
            operation: self.operation,
            method: self.method,
            path: self.path,
            tags: self.tags,
            validation: self.meta.validation.clone(),
            docs: self.meta.docs.clone(),
        }
    }

    /// `Controller::method`, for diagnostics.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.controller, self.operation)
    }
}

/// Join two path fragments with exactly one `/` between them.
///
/// An empty or `/` suffix leaves the prefix unchanged; the result is `/` when
/// both sides are empty.
pub fn join_path(prefix: &str, suffix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let suffix = suffix.trim_matches('/');
    let joined = match (prefix.is_empty(), suffix.is_empty()) {
        (true, true) => return "/".to_string(),
        (_, true) => prefix.to_string(),
        (true, false) => format!("/{suffix}"),
        (false, false) => format!("{prefix}/{suffix}"),
    };
    if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}

fn short_type_name<C>() -> &'static str {
    let full = std::any::type_name::<C>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
