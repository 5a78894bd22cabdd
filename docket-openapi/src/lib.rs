//! OpenAPI documentation for Docket controllers.
//!
//! Documents are built from the same resolved routes the router registers
//! (`ControllerDef::describe`), so every `(method, path)` the router serves
//! appears as exactly one operation.

mod builder;
mod ext;
mod handlers;

use docket_core::ControllerRegistry;

pub use builder::{build_spec, document_path, ApiFragment, OpenApiConfig, OPENAPI_VERSION};
pub use ext::OpenApiPlugin;
pub use handlers::openapi_routes;

/// The `paths` fragment of controller `C` mounted under `mount`.
///
/// Never fails: an undeclared controller yields an empty fragment.
pub fn generate_paths<C: Send + Sync + 'static>(registry: &ControllerRegistry, mount: &str) -> ApiFragment {
    ApiFragment::from_routes(&registry.describe::<C>(mount))
}
