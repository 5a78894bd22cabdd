use docket_core::{AppBuilder, HttpMethod, Plugin, RouteKey};
use tracing::debug;

use crate::{openapi_routes, OpenApiConfig};

/// Plugin that serves the OpenAPI document of every mounted controller and
/// an optional Swagger UI.
///
/// # Example
///
/// ```ignore
/// use docket_openapi::{OpenApiConfig, OpenApiPlugin};
///
/// AppBuilder::new(registry)
///     .controller(Arc::new(Users))
///     .with(OpenApiPlugin::new(
///         OpenApiConfig::new("My API", "1.0.0").with_docs_ui(true),
///     ))
///     .build()?;
/// ```
pub struct OpenApiPlugin {
    config: Option<OpenApiConfig>,
}

impl OpenApiPlugin {
    pub fn new(config: OpenApiConfig) -> Self {
        Self { config: Some(config) }
    }

    /// Take the configuration from the builder's [`AppConfig`](docket_core::AppConfig)
    /// at install time. Nothing is served when `openapi.enabled` is false.
    pub fn from_app_config() -> Self {
        Self { config: None }
    }
}

impl Plugin for OpenApiPlugin {
    fn install(self, app: AppBuilder) -> AppBuilder {
        let config = match self.config {
            Some(config) => config,
            None => match app.app_config() {
                Some(app_config) if !app_config.openapi.enabled => {
                    debug!("OpenAPI disabled by configuration");
                    return app;
                }
                Some(app_config) => OpenApiConfig::from_docs_config(&app_config.openapi),
                None => OpenApiConfig::from_docs_config(&Default::default()),
            },
        };
        let mut claims = vec![RouteKey::new(HttpMethod::Get, config.spec_path.clone())];
        if config.docs_ui {
            claims.push(RouteKey::new(HttpMethod::Get, config.docs_path.clone()));
        }
        app.with_claiming_meta_consumer("OpenApiPlugin", claims, move |routes| openapi_routes(config, routes))
    }
}
