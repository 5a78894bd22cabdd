use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::controller::Controller;
use crate::error::MaterializeError;
use crate::http::Router;
use crate::layers::{catch_panic_layer, default_cors, default_trace};
use crate::meta::{RouteDoc, RouteKey};
use crate::plugin::Plugin;
use crate::registry::ControllerRegistry;
use crate::router::{materialize_router_with, MaterializedRouter, RouteTable, RouterOptions};

type LayerFn = Box<dyn FnOnce(Router) -> Router + Send>;

/// Materializes one controller at build time, once the mount prefix and
/// router options are final.
type ControllerMount = Box<
    dyn FnOnce(&ControllerRegistry, &str, RouterOptions) -> Result<(MaterializedRouter, Vec<RouteDoc>), MaterializeError>
        + Send,
>;

/// A consumer of the documentation view of every mounted route, returning a
/// router fragment to be merged into the application.
struct MetaConsumer {
    owner: String,
    claims: Vec<RouteKey>,
    consume: Box<dyn FnOnce(&[RouteDoc]) -> Router + Send>,
}

/// Builder for assembling an application from a [`ControllerRegistry`].
///
/// Collects controller instances, raw routes, metadata consumers and Tower
/// layers, then produces an `axum::Router` (or starts serving directly).
///
/// ```ignore
/// let mut registry = ControllerRegistry::new();
/// registry.register::<UserController>();
///
/// let app = AppBuilder::new(registry)
///     .mount("/api")
///     .controller(Arc::new(UserController::new(pool)))
///     .with(OpenApiPlugin::new(OpenApiConfig::new("Users", "1.0.0")))
///     .with_default_layers()
///     .build()?;
/// ```
pub struct AppBuilder {
    registry: ControllerRegistry,
    config: Option<AppConfig>,
    mount: String,
    options: RouterOptions,
    controllers: Vec<ControllerMount>,
    routes: Vec<Router>,
    meta_consumers: Vec<MetaConsumer>,
    layers: Vec<LayerFn>,
}

impl AppBuilder {
    pub fn new(registry: ControllerRegistry) -> Self {
        Self {
            registry,
            config: None,
            mount: String::new(),
            options: RouterOptions::default(),
            controllers: Vec::new(),
            routes: Vec::new(),
            meta_consumers: Vec::new(),
            layers: Vec::new(),
        }
    }

    /// Apply an [`AppConfig`]: mount prefix, body limit and CORS.
    ///
    /// The config stays available to plugins through [`app_config`](Self::app_config).
    pub fn config(mut self, config: &AppConfig) -> Self {
        self.mount = config.mount_path.clone();
        self.options = config.router_options();
        self.config = Some(config.clone());
        if config.cors {
            self = self.with_cors();
        }
        self
    }

    pub fn app_config(&self) -> Option<&AppConfig> {
        self.config.as_ref()
    }

    /// Prefix every controller is mounted under.
    pub fn mount(mut self, prefix: impl Into<String>) -> Self {
        self.mount = prefix.into();
        self
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.options.body_limit = limit;
        self
    }

    /// Declare `C` in the owned registry.
    pub fn register<C: Controller>(mut self) -> Self {
        self.registry.register::<C>();
        self
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    /// Mount a controller instance. `C` must be declared in the registry by
    /// the time [`build`](Self::build) runs.
    pub fn controller<C: Send + Sync + 'static>(mut self, controller: Arc<C>) -> Self {
        self.controllers.push(Box::new(move |registry, mount, options| {
            let router = materialize_router_with(registry, controller, mount, options)?;
            Ok((router, registry.describe::<C>(mount)))
        }));
        self
    }

    /// Register a raw `axum::Router` fragment to be merged into the application.
    ///
    /// Raw routes are not mounted under the prefix and get no validation.
    pub fn register_routes(mut self, router: Router) -> Self {
        self.routes.push(router);
        self
    }

    /// Register a metadata consumer.
    ///
    /// At `build()` time the consumer receives the documentation view of
    /// every mounted route and returns a `Router` to merge into the app.
    ///
    /// ```ignore
    /// app.with_meta_consumer(|routes| openapi_routes(config, routes))
    /// ```
    pub fn with_meta_consumer<F>(self, f: F) -> Self
    where
        F: FnOnce(&[RouteDoc]) -> Router + Send + 'static,
    {
        self.with_claiming_meta_consumer("meta consumer", Vec::new(), f)
    }

    /// Register a metadata consumer whose router serves `claims`.
    ///
    /// The claimed routes join the duplicate check of `build()`: a claim that
    /// overlaps a controller route or an earlier claim fails the build with
    /// [`MaterializeError::DuplicateRoute`] instead of panicking in the merge.
    pub fn with_claiming_meta_consumer<F>(mut self, owner: impl Into<String>, claims: Vec<RouteKey>, f: F) -> Self
    where
        F: FnOnce(&[RouteDoc]) -> Router + Send + 'static,
    {
        self.meta_consumers.push(MetaConsumer {
            owner: owner.into(),
            claims,
            consume: Box::new(f),
        });
        self
    }

    /// Install a [`Plugin`] into this builder.
    pub fn with<Pl: Plugin>(self, plugin: Pl) -> Self {
        tracing::debug!(plugin = Pl::name(), "installing plugin");
        plugin.install(self)
    }

    /// Apply a custom transformation to the assembled router.
    ///
    /// Transformations run at `build()` in registration order, so the last
    /// one registered is the outermost.
    pub fn with_layer_fn<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.layers.push(Box::new(f));
        self
    }

    /// Panic recovery (JSON 500) wrapped by HTTP tracing.
    pub fn with_default_layers(self) -> Self {
        self.with_layer_fn(|router| router.layer(catch_panic_layer()))
            .with_layer_fn(|router| router.layer(default_trace()))
    }

    /// Permissive CORS, see [`default_cors`].
    pub fn with_cors(self) -> Self {
        self.with_layer_fn(|router| router.layer(default_cors()))
    }

    /// Assemble the final `axum::Router`.
    ///
    /// Fails when a controller is not declared, declares an invalid path, or
    /// claims a route already claimed by another controller or meta consumer.
    pub fn build(self) -> Result<Router, MaterializeError> {
        let mut router = Router::new();
        let mut table = RouteTable::default();
        let mut docs = Vec::new();

        for materialize in self.controllers {
            let (materialized, described) = materialize(&self.registry, &self.mount, self.options)?;
            let controller = materialized.controller();
            let (routes, controller_router) = materialized.into_parts();
            for route in &routes {
                table.insert(route, controller.to_string())?;
            }
            router = router.merge(controller_router);
            docs.extend(described);
        }

        for r in self.routes {
            router = router.merge(r);
        }

        for consumer in &self.meta_consumers {
            for claim in &consumer.claims {
                table.insert(claim, consumer.owner.clone())?;
            }
        }

        // Meta consumers see every mounted route.
        for consumer in self.meta_consumers {
            router = router.merge((consumer.consume)(&docs));
        }

        for layer_fn in self.layers {
            router = layer_fn(router);
        }

        info!(routes = docs.len(), mount = %self.mount, "application assembled");
        Ok(router)
    }

    /// Build the application and start serving on the given address until
    /// Ctrl-C or SIGTERM.
    pub async fn serve(self, addr: &str) -> Result<(), ServeError> {
        let app = self.build()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("server stopped");
        Ok(())
    }
}

/// Errors from [`AppBuilder::serve`].
#[derive(Debug)]
pub enum ServeError {
    Materialize(MaterializeError),
    Io(std::io::Error),
}

impl std::fmt::Display for ServeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeError::Materialize(err) => write!(f, "failed to build application: {err}"),
            ServeError::Io(err) => write!(f, "server error: {err}"),
        }
    }
}

impl std::error::Error for ServeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServeError::Materialize(err) => Some(err),
            ServeError::Io(err) => Some(err),
        }
    }
}

impl From<MaterializeError> for ServeError {
    fn from(err: MaterializeError) -> Self {
        ServeError::Materialize(err)
    }
}

impl From<std::io::Error> for ServeError {
    fn from(err: std::io::Error) -> Self {
        ServeError::Io(err)
    }
}

/// Wait for a shutdown signal (Ctrl-C or SIGTERM on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, starting graceful shutdown");
}
