use std::sync::Arc;

use docket_core::http::routing::get;
use docket_core::http::{Html, IntoResponse, Router, CONTENT_TYPE};
use docket_core::RouteDoc;
use tracing::debug;

use crate::builder::{render_spec, OpenApiConfig};

struct OpenApiState {
    spec_json: Arc<str>,
    docs_html: String,
}

/// Build a router serving the OpenAPI document at `spec_path` and, when
/// enabled, a Swagger UI page at `docs_path`.
///
/// The document is rendered once; every request gets the same bytes.
pub fn openapi_routes(config: OpenApiConfig, routes: &[RouteDoc]) -> Router {
    let state = Arc::new(OpenApiState {
        spec_json: render_spec(&config, routes),
        docs_html: swagger_html(&config.title, &config.spec_path),
    });
    debug!(
        spec_path = %config.spec_path,
        docs_ui = config.docs_ui,
        operations = routes.len(),
        "serving OpenAPI document"
    );

    let spec_state = state.clone();
    let mut router = Router::new().route(
        &config.spec_path,
        get(move || {
            let json = spec_state.spec_json.clone();
            async move { ([(CONTENT_TYPE, "application/json")], json.to_string()).into_response() }
        }),
    );

    if config.docs_ui {
        router = router.route(
            &config.docs_path,
            get(move || {
                let html = state.docs_html.clone();
                async move { Html(html).into_response() }
            }),
        );
    }

    router
}

fn swagger_html(title: &str, spec_url: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = () => {{
            window.ui = SwaggerUIBundle({{ url: "{spec_url}", dom_id: "#swagger-ui" }});
        }};
    </script>
</body>
</html>"##
    )
}
