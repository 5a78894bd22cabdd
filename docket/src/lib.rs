//! Docket: declare controllers once, get a validated Axum router and an
//! OpenAPI document from the same metadata.
//!
//! ```ignore
//! use docket::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature   | Default | Crate            |
//! |-----------|---------|------------------|
//! | `openapi` | **yes** | `docket-openapi` |

pub extern crate docket_core;

pub use docket_core::*;

#[cfg(feature = "openapi")]
pub use docket_openapi;

pub mod prelude {
    pub use docket_core::prelude::*;

    #[cfg(feature = "openapi")]
    pub use docket_openapi::{generate_paths, OpenApiConfig, OpenApiPlugin};
}
