use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::{Request, Response};

/// A boxed, `Send` future with a `'static` lifetime.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A request-processing step that runs before a route's validation and handler.
///
/// A middleware either answers the request itself (short-circuit) or passes it
/// on with [`Next::run`]. Plain async functions and closures with the
/// signature `Fn(Request, Next) -> impl Future<Output = Response>` implement
/// this trait.
///
/// ```ignore
/// async fn require_json(req: Request, next: Next) -> Response {
///     if req.headers().get(CONTENT_TYPE).is_none() {
///         return HttpError::BadRequest("missing content type".into()).into_response();
///     }
///     next.run(req).await
/// }
///
/// RouteMeta::post("/").middleware(require_json)
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as a route middleware",
    label = "expected `Fn(Request, Next) -> impl Future<Output = Response>`",
    note = "annotate closure arguments explicitly: `|req: Request, next: Next| async move {{ .. }}`"
)]
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, request: Request, next: Next) -> BoxFuture<Response>;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request, next: Next) -> BoxFuture<Response> {
        Box::pin(self(request, next))
    }
}

/// The terminal step of a handler chain (validation followed by the handler).
pub(crate) trait Endpoint: Send + Sync + 'static {
    fn call(&self, request: Request) -> BoxFuture<Response>;
}

/// The remainder of a route's handler chain.
pub struct Next {
    middlewares: Arc<[Arc<dyn Middleware>]>,
    position: usize,
    endpoint: Arc<dyn Endpoint>,
}

impl Next {
    pub(crate) fn new(middlewares: Arc<[Arc<dyn Middleware>]>, endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            middlewares,
            position: 0,
            endpoint,
        }
    }

    /// Run the next middleware, or the endpoint once all middlewares ran.
    pub async fn run(mut self, request: Request) -> Response {
        match self.middlewares.get(self.position).cloned() {
            Some(middleware) => {
                self.position += 1;
                middleware.call(request, self).await
            }
            None => self.endpoint.call(request).await,
        }
    }
}
