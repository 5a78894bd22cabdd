//! Convenience type aliases for common handler return types.
//!
//! ```ignore
//! use docket_core::prelude::*;
//!
//! async fn list(controller: Arc<UserController>, _req: ApiRequest) -> JsonResult<Vec<User>> {
//!     Ok(Json(controller.store.list().await))
//! }
//! ```

use crate::error::HttpError;
use crate::http::{Json, StatusCode};

/// Any response type with [`HttpError`].
pub type ApiResult<T> = Result<T, HttpError>;

/// The most common handler return type: `Result<Json<T>, HttpError>`.
pub type JsonResult<T> = Result<Json<T>, HttpError>;

/// Shorthand for endpoints that return only a status code (e.g. DELETE).
///
/// ```ignore
/// async fn delete(controller: Arc<UserController>, req: ApiRequest) -> StatusResult {
///     controller.store.delete(req.param_str("id").unwrap_or_default()).await?;
///     Ok(StatusCode::NO_CONTENT)
/// }
/// ```
pub type StatusResult = Result<StatusCode, HttpError>;
