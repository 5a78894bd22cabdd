//! Docket prelude: import everything a controller needs with a single `use`.
//!
//! ```ignore
//! use docket_core::prelude::*;
//!
//! pub struct UserController;
//!
//! impl Controller for UserController {
//!     fn declare() -> ControllerDef<Self> {
//!         ControllerDef::new()
//!             .attach_class(ControllerMeta::new().base_path("/users").tag("Users"))
//!             .route("profile", Self::profile, RouteMeta::get("/profile").bearer_auth())
//!     }
//! }
//! ```

// ── Core types ──────────────────────────────────────────────────────────

pub use crate::builder::AppBuilder;
pub use crate::config::AppConfig;
pub use crate::controller::{Controller, ControllerDef};
pub use crate::error::{HttpError, MaterializeError};
pub use crate::meta::{ControllerMeta, HttpMethod, RouteMeta};
pub use crate::middleware::Next;
pub use crate::plugin::Plugin;
pub use crate::registry::ControllerRegistry;
pub use crate::request::{ApiRequest, PathParams};
pub use crate::router::materialize_router;
pub use crate::schema::{FieldSchema, ObjectSchema, Typed};
pub use crate::validation::FieldError;

// ── Type aliases ────────────────────────────────────────────────────────

pub use crate::types::{ApiResult, JsonResult, StatusResult};

// ── HTTP re-exports ─────────────────────────────────────────────────────

pub use crate::http::{
    HeaderMap, IntoResponse, Json, Method, Request, Response, Router, StatusCode, AUTHORIZATION,
    CONTENT_TYPE,
};

pub use std::sync::Arc;
