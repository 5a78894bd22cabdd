use std::collections::BTreeSet;
use std::sync::Arc;

use docket_core::{
    materialize_router, ApiRequest, AppBuilder, AppConfig, Controller, ControllerDef, ControllerMeta,
    ControllerRegistry, DocsConfig, FieldSchema, HttpMethod, MaterializeError, ObjectSchema, RouteKey, RouteMeta,
    Typed,
};
use docket_openapi::{
    build_spec, document_path, generate_paths, openapi_routes, ApiFragment, OpenApiConfig, OpenApiPlugin,
};
use docket_test::TestApp;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

struct Users;

impl Users {
    async fn profile(self: Arc<Self>, _req: ApiRequest) -> &'static str {
        "me"
    }

    async fn show(self: Arc<Self>, req: ApiRequest) -> String {
        req.param_str("id").unwrap_or_default()
    }

    async fn search(self: Arc<Self>, _req: ApiRequest) -> &'static str {
        "[]"
    }

    async fn create(self: Arc<Self>, _req: ApiRequest) -> &'static str {
        "created"
    }
}

impl Controller for Users {
    fn declare() -> ControllerDef<Self> {
        ControllerDef::new()
            .attach_class(ControllerMeta::new().base_path("/users").tag("Users"))
            .route(
                "profile",
                Users::profile,
                RouteMeta::get("/profile")
                    .summary("Current user")
                    .bearer_auth()
                    .response(200, "The user")
                    .response(401, "Not logged in"),
            )
            .route(
                "show",
                Users::show,
                RouteMeta::get("/{id}").params(ObjectSchema::new().field("id", FieldSchema::integer().required())),
            )
            .route(
                "search",
                Users::search,
                RouteMeta::get("/search").query(
                    ObjectSchema::new()
                        .field("q", FieldSchema::string().required())
                        .field("limit", FieldSchema::integer().maximum(100.0)),
                ),
            )
            .route(
                "create",
                Users::create,
                RouteMeta::post("/")
                    .body(
                        ObjectSchema::named("CreateUser")
                            .field("email", FieldSchema::string().email().required())
                            .field("password", FieldSchema::string().min_length(8).required()),
                    )
                    .response(201, "Created")
                    .deprecated(),
            )
    }
}

fn registry() -> ControllerRegistry {
    let mut registry = ControllerRegistry::new();
    registry.register::<Users>();
    registry
}

#[test]
fn profile_route_is_documented_with_bearer_and_declared_responses() {
    let fragment = generate_paths::<Users>(&registry(), "");
    let op = &fragment.paths["/users/profile"]["get"];

    assert_eq!(op["operationId"], "Users_profile");
    assert_eq!(op["summary"], "Current user");
    assert_eq!(op["description"], "");
    assert_eq!(op["tags"], json!(["Users"]));
    assert_eq!(op["security"], json!([{ "bearerAuth": [] }]));

    let responses: BTreeSet<&str> = op["responses"].as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(responses, BTreeSet::from(["200", "401"]));
    assert_eq!(op["responses"]["401"]["description"], "Not logged in");
    assert!(op.get("deprecated").is_none());
}

#[test]
fn documented_operations_match_the_materialized_router() {
    let registry = registry();
    let router = materialize_router(&registry, Arc::new(Users), "/api").unwrap();
    let fragment = generate_paths::<Users>(&registry, "/api");

    let routed: BTreeSet<(String, String)> = router
        .routes()
        .iter()
        .map(|key| (key.method.as_lower().to_string(), document_path(&key.path)))
        .collect();
    let documented: BTreeSet<(String, String)> = fragment
        .paths
        .iter()
        .flat_map(|(path, item)| {
            item.as_object()
                .unwrap()
                .keys()
                .map(move |method| (method.clone(), path.clone()))
        })
        .collect();

    assert_eq!(routed, documented);
    assert_eq!(fragment.operation_count(), 4);
}

#[test]
fn generation_is_idempotent() {
    let registry = registry();
    assert_eq!(generate_paths::<Users>(&registry, ""), generate_paths::<Users>(&registry, ""));
}

#[test]
fn undeclared_controller_yields_empty_paths() {
    let fragment = generate_paths::<Users>(&ControllerRegistry::new(), "");
    assert!(fragment.is_empty());
    assert!(fragment.schemas.is_empty());
}

#[test]
fn route_without_docs_gets_a_default_response() {
    struct Bare;
    let mut registry = ControllerRegistry::new();
    registry.declare(ControllerDef::<Bare>::new().route(
        "ping",
        |_c: Arc<Bare>, _r: ApiRequest| async { "pong" },
        RouteMeta::get("/ping"),
    ));

    let op = generate_paths::<Bare>(&registry, "").paths["/ping"]["get"].clone();
    assert_eq!(op["operationId"], "Bare_ping");
    assert_eq!(op["summary"], "");
    assert_eq!(op["tags"], json!([]));
    assert_eq!(op["responses"], json!({ "default": { "description": "Default response" } }));
    assert!(op.get("parameters").is_none());
    assert!(op.get("security").is_none());
}

#[test]
fn path_and_query_parameters_are_listed() {
    let fragment = generate_paths::<Users>(&registry(), "");

    let show = &fragment.paths["/users/{id}"]["get"];
    assert_eq!(
        show["parameters"],
        json!([{ "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } }])
    );

    let params = fragment.paths["/users/search"]["get"]["parameters"].as_array().unwrap().clone();
    let q = params.iter().find(|p| p["name"] == "q").unwrap();
    let limit = params.iter().find(|p| p["name"] == "limit").unwrap();
    assert_eq!(q["in"], "query");
    assert_eq!(q["required"], true);
    assert_eq!(limit["required"], false);
    assert_eq!(limit["schema"]["maximum"], json!(100.0));
}

struct Files;

fn files_registry() -> ControllerRegistry {
    let mut registry = ControllerRegistry::new();
    registry.declare(ControllerDef::<Files>::new().route(
        "read",
        |_c: Arc<Files>, _r: ApiRequest| async { "" },
        RouteMeta::get("/files/{bucket}/{*key}"),
    ));
    registry
}

#[test]
fn wildcard_routes_use_plain_path_templates() {
    let registry = files_registry();
    let fragment = generate_paths::<Files>(&registry, "");
    assert!(fragment.paths.get("/files/{bucket}/{*key}").is_none());

    let op = &fragment.paths["/files/{bucket}/{key}"]["get"];
    let names: Vec<&str> = op["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["bucket", "key"]);
    assert_eq!(op["parameters"][1]["schema"], json!({ "type": "string" }));

    let router = materialize_router(&registry, Arc::new(Files), "").unwrap();
    assert_eq!(router.routes()[0].path, "/files/{bucket}/{*key}");
    assert!(fragment.paths.contains_key(&document_path(&router.routes()[0].path)));
}

#[test]
fn named_body_is_referenced_from_components() {
    let fragment = generate_paths::<Users>(&registry(), "");
    let op = &fragment.paths["/users"]["post"];

    assert_eq!(
        op["requestBody"],
        json!({
            "required": true,
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/CreateUser" } } }
        })
    );
    assert_eq!(op["deprecated"], true);

    let schema = &fragment.schemas["CreateUser"];
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["required"], json!(["email", "password"]));
    assert_eq!(schema["properties"]["email"]["format"], "email");
    assert_eq!(schema["properties"]["password"]["minLength"], 8);
}

#[test]
fn anonymous_body_is_inlined() {
    struct Notes;
    let mut registry = ControllerRegistry::new();
    registry.declare(ControllerDef::<Notes>::new().route(
        "add",
        |_c: Arc<Notes>, _r: ApiRequest| async { "" },
        RouteMeta::post("/notes").body(ObjectSchema::new().field("text", FieldSchema::string().required())),
    ));

    let fragment = generate_paths::<Notes>(&registry, "");
    let schema = &fragment.paths["/notes"]["post"]["requestBody"]["content"]["application/json"]["schema"];
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["required"], json!(["text"]));
    assert!(fragment.schemas.is_empty());
}

#[derive(Debug, Serialize, Deserialize, garde::Validate, schemars::JsonSchema)]
struct Address {
    #[garde(length(min = 1))]
    city: String,
}

#[derive(Debug, Serialize, Deserialize, garde::Validate, schemars::JsonSchema)]
struct Signup {
    #[garde(email)]
    email: String,
    #[garde(dive)]
    address: Address,
}

#[test]
fn typed_body_and_its_definitions_become_components() {
    struct Accounts;
    let mut registry = ControllerRegistry::new();
    registry.declare(ControllerDef::<Accounts>::new().route(
        "signup",
        |_c: Arc<Accounts>, _r: ApiRequest| async { "" },
        RouteMeta::post("/signup").body(Typed::<Signup>::new()),
    ));

    let fragment = generate_paths::<Accounts>(&registry, "");
    let signup = &fragment.schemas["Signup"];
    assert!(signup.get("$schema").is_none());
    assert!(signup.get("$defs").is_none());
    assert_eq!(signup["properties"]["address"]["$ref"], "#/components/schemas/Address");
    assert!(fragment.schemas.contains_key("Address"));
}

#[test]
fn merged_fragments_keep_every_controller() {
    struct Health;
    let mut registry = registry();
    registry.declare(ControllerDef::<Health>::new().route(
        "check",
        |_c: Arc<Health>, _r: ApiRequest| async { "ok" },
        RouteMeta::get("/health"),
    ));

    let mut fragment = generate_paths::<Users>(&registry, "");
    fragment.merge(generate_paths::<Health>(&registry, ""));
    assert_eq!(fragment.operation_count(), 5);
    assert!(fragment.paths.contains_key("/health"));
    assert!(fragment.schemas.contains_key("CreateUser"));

    // Later fragments win on a repeated operation.
    let mut replacement = ApiFragment::default();
    replacement
        .paths
        .insert("/health".into(), json!({ "get": { "operationId": "replaced" } }));
    fragment.merge(replacement);
    assert_eq!(fragment.paths["/health"]["get"]["operationId"], "replaced");
}

#[test]
fn full_document_carries_info_and_components() {
    let config = OpenApiConfig::new("Users API", "2.1.0").with_description("User management");
    let spec = build_spec(&config, &registry().describe::<Users>("/api"));

    assert_eq!(spec["openapi"], "3.0.3");
    assert_eq!(spec["info"], json!({ "title": "Users API", "version": "2.1.0", "description": "User management" }));
    assert_eq!(
        spec["components"]["securitySchemes"]["bearerAuth"],
        json!({ "type": "http", "scheme": "bearer", "bearerFormat": "JWT" })
    );
    assert!(spec["components"]["schemas"]["CreateUser"].is_object());
    assert!(spec["paths"]["/api/users/profile"]["get"].is_object());
}

#[test]
fn document_without_named_schemas_omits_the_schemas_section() {
    let spec = build_spec(&OpenApiConfig::new("Empty", "0.1.0"), &[]);
    assert_eq!(spec["paths"], json!({}));
    assert!(spec["components"].get("schemas").is_none());
    assert!(spec["info"].get("description").is_none());
}

// ── Serving ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn spec_and_docs_ui_are_served() {
    let config = OpenApiConfig::new("Users API", "1.0.0").with_docs_ui(true);
    let app = TestApp::new(openapi_routes(config, &registry().describe::<Users>("")));

    let resp = app.get("/openapi.json").send().await.assert_ok();
    assert_eq!(resp.header("content-type"), Some("application/json"));
    let spec: Value = resp.json();
    assert_eq!(spec["info"]["title"], "Users API");

    let docs = app.get("/docs").send().await.assert_ok();
    assert!(docs.header("content-type").unwrap().starts_with("text/html"));
    assert!(docs.text().contains("swagger-ui"));
    assert!(docs.text().contains("/openapi.json"));
}

#[test]
fn docs_ui_default_matches_the_application_config() {
    let explicit = OpenApiConfig::new("API", "1.0.0");
    let configured = OpenApiConfig::from_docs_config(&DocsConfig::default());
    assert!(explicit.docs_ui);
    assert_eq!(explicit.docs_ui, configured.docs_ui);
    assert_eq!(explicit.spec_path, configured.spec_path);
    assert_eq!(explicit.docs_path, configured.docs_path);
}

#[tokio::test]
async fn docs_ui_can_be_turned_off() {
    let config = OpenApiConfig::new("Users API", "1.0.0")
        .with_spec_path("/spec.json")
        .with_docs_ui(false);
    let app = TestApp::new(openapi_routes(config, &[]));

    app.get("/spec.json").send().await.assert_ok();
    app.get("/openapi.json").send().await.assert_not_found();
    app.get("/docs").send().await.assert_not_found();
}

#[tokio::test]
async fn plugin_documents_every_mounted_controller() {
    let app = TestApp::from_builder(
        AppBuilder::new(registry())
            .mount("/api")
            .controller(Arc::new(Users))
            .with(OpenApiPlugin::new(OpenApiConfig::new("Users API", "1.0.0"))),
    );

    let resp = app.get("/openapi.json").send().await.assert_ok();
    let spec: Value = resp.json();
    let paths: BTreeSet<&str> = spec["paths"].as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        paths,
        BTreeSet::from(["/api/users", "/api/users/profile", "/api/users/search", "/api/users/{id}"])
    );

    app.get("/api/users/profile").send().await.assert_ok();
}

#[tokio::test]
async fn plugin_reads_the_application_config() {
    let config = AppConfig::from_yaml_str(
        "openapi:\n  title: Configured\n  spec_path: /api-docs.json\n  docs_ui: false\n",
    )
    .unwrap();
    let app = TestApp::from_builder(
        AppBuilder::new(registry())
            .config(&config)
            .controller(Arc::new(Users))
            .with(OpenApiPlugin::from_app_config()),
    );

    app.get("/api-docs.json")
        .send()
        .await
        .assert_ok()
        .assert_json_path("info.title", "Configured");
    app.get("/docs").send().await.assert_not_found();
}

#[tokio::test]
async fn plugin_serves_nothing_when_disabled() {
    let config = AppConfig::from_yaml_str("openapi:\n  enabled: false\n").unwrap();
    let app = TestApp::from_builder(
        AppBuilder::new(registry())
            .config(&config)
            .controller(Arc::new(Users))
            .with(OpenApiPlugin::from_app_config()),
    );

    app.get("/openapi.json").send().await.assert_not_found();
    app.get("/users/profile").send().await.assert_ok();
}

struct Legacy;

fn build_error(builder: AppBuilder) -> MaterializeError {
    match builder.build() {
        Ok(_) => panic!("application was expected to fail building"),
        Err(err) => err,
    }
}

#[test]
fn plugin_path_taken_by_a_controller_fails_the_build() {
    let mut registry = registry();
    registry.declare(ControllerDef::<Legacy>::new().route(
        "spec",
        |_c: Arc<Legacy>, _r: ApiRequest| async { "{}" },
        RouteMeta::get("/openapi.json"),
    ));

    let err = build_error(
        AppBuilder::new(registry)
            .controller(Arc::new(Users))
            .controller(Arc::new(Legacy))
            .with(OpenApiPlugin::new(OpenApiConfig::new("Users API", "1.0.0"))),
    );
    match err {
        MaterializeError::DuplicateRoute { route, first, second } => {
            assert_eq!(route, RouteKey::new(HttpMethod::Get, "/openapi.json"));
            assert_eq!(first, "Legacy");
            assert_eq!(second, "OpenApiPlugin");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn installing_the_plugin_twice_fails_the_build() {
    let err = build_error(
        AppBuilder::new(registry())
            .controller(Arc::new(Users))
            .with(OpenApiPlugin::new(OpenApiConfig::new("One", "1.0.0")))
            .with(OpenApiPlugin::new(OpenApiConfig::new("Two", "1.0.0"))),
    );
    assert!(matches!(err, MaterializeError::DuplicateRoute { .. }), "{err}");
}

#[tokio::test]
async fn plugins_on_distinct_paths_coexist() {
    let app = TestApp::from_builder(
        AppBuilder::new(registry())
            .with(OpenApiPlugin::new(OpenApiConfig::new("Public", "1.0.0").with_docs_ui(false)))
            .with(OpenApiPlugin::new(
                OpenApiConfig::new("Internal", "1.0.0")
                    .with_spec_path("/internal/openapi.json")
                    .with_docs_path("/internal/docs"),
            )),
    );

    app.get("/openapi.json").send().await.assert_ok().assert_json_path("info.title", "Public");
    app.get("/internal/docs").send().await.assert_ok();
}
