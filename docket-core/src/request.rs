use axum::extract::RawPathParams;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::HttpError;
use crate::http::{Bytes, Extensions, HeaderMap, Method, Uri, AUTHORIZATION};
use crate::validation::ValidatedParts;

/// Raw path parameters of the matched route, in pattern order.
///
/// Inserted into the request extensions before the middleware chain runs, so
/// middlewares can read them with `request.extensions().get::<PathParams>()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn from_raw(raw: &RawPathParams) -> Self {
        Self(raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    /// Linear scan; routes rarely carry more than a handful of parameters.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn to_map(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

/// The request a controller handler receives, after middlewares ran and
/// validation passed.
///
/// `params`, `query` and `body` hold the values as rewritten by their
/// schemas (e.g. `"42"` coerced to `42` for an integer query field).
#[derive(Debug)]
pub struct ApiRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
    params: Map<String, Value>,
    query: Map<String, Value>,
    body: Value,
    raw_body: Bytes,
}

impl ApiRequest {
    pub(crate) fn new(parts: axum::http::request::Parts, raw_body: Bytes, validated: ValidatedParts) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            extensions: parts.extensions,
            params: validated.params,
            query: validated.query,
            body: validated.body,
            raw_body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The token of an `Authorization: Bearer <token>` header.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// An extension inserted by a middleware.
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// A path parameter rendered as a string, whatever it was coerced to.
    pub fn param_str(&self, name: &str) -> Option<String> {
        self.param(name).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    pub fn query_value(&self, name: &str) -> Option<&Value> {
        self.query.get(name)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// Deserialize the (validated) body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }

    pub fn params_as<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        Ok(serde_json::from_value(Value::Object(self.params.clone()))?)
    }

    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        Ok(serde_json::from_value(Value::Object(self.query.clone()))?)
    }
}
