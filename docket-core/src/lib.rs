pub mod builder;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod layers;
pub mod meta;
pub mod middleware;
pub mod plugin;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod router;
pub mod schema;
pub mod types;
pub mod validation;

pub use builder::{AppBuilder, ServeError};
pub use config::{AppConfig, ConfigError, DocsConfig, LogConfig};
pub use controller::{Controller, ControllerDef, Handler, ResolvedRoute};
pub use error::{HttpError, MaterializeError};
pub use layers::{catch_panic_layer, default_cors, default_trace, init_tracing, init_tracing_with};
pub use meta::{ControllerMeta, DocFields, HttpMethod, RouteDoc, RouteKey, RouteMeta, Validation};
pub use middleware::{BoxFuture, Middleware, Next};
pub use plugin::Plugin;
pub use registry::ControllerRegistry;
pub use request::{ApiRequest, PathParams};
pub use router::{materialize_router, materialize_router_with, MaterializedRouter, RouterOptions, DEFAULT_BODY_LIMIT};
pub use schema::{FieldSchema, Location, ObjectSchema, Schema, StringFormat, Typed};
pub use validation::{FieldError, ValidationErrorResponse};

pub use garde;
pub use schemars;
