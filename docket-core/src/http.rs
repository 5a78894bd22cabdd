//! Re-exports of the Axum/HTTP types that appear in Docket's public API.
//!
//! Controllers can depend on these paths instead of pinning their own `axum`
//! version.

pub use axum::body::{Body, Bytes};
pub use axum::extract::Request;
pub use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
pub use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
pub use axum::response::{Html, IntoResponse, Response};
pub use axum::{Json, Router};
pub use axum::routing;
