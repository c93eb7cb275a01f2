//! Resolved values → HTTP request
//!
//! `ApiRequest` collects path, query and header values for one invocation and
//! turns them into a `reqwest` request once every path placeholder is filled.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::blocking::{Client, Request};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;

use crate::error::DispatchError;
use crate::spec::ParamLocation;

/// Headers applied to every request, on top of per-request headers.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl DefaultHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.write().insert(name.into(), value.into());
    }

    pub fn extend<I, K, V>(&self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = self.inner.write();
        for (k, v) in headers {
            map.insert(k.into(), v.into());
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.read().get(name).cloned()
    }

    /// Copy of the current headers.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner.read().clone()
    }
}

impl ParamLocation {
    /// Assemble a resolved value into the request slot for this location.
    pub fn apply(self, request: &mut ApiRequest, name: &str, value: impl Into<String>) {
        let slot = match self {
            Self::Path => &mut request.path_params,
            Self::Query => &mut request.query,
            Self::Header => &mut request.headers,
        };
        slot.insert(name.to_string(), value.into());
    }
}

/// An HTTP request to be executed.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: String,
    /// Path template with `{name}` placeholders
    pub path: String,
    pub path_params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            path_params: BTreeMap::new(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn set(&mut self, location: ParamLocation, name: &str, value: impl Into<String>) {
        location.apply(self, name, value);
    }

    pub fn path_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(ParamLocation::Path, name, value);
        self
    }

    pub fn query_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(ParamLocation::Query, name, value);
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(ParamLocation::Header, name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Placeholder names without a value, in template order.
    pub fn missing_path_params(&self) -> Vec<String> {
        placeholders(&self.path)
            .into_iter()
            .filter(|name| !self.path_params.contains_key(*name))
            .map(str::to_string)
            .collect()
    }

    /// Template with every placeholder replaced by its percent-encoded value.
    pub fn render_path(&self) -> Result<String, DispatchError> {
        let missing = self.missing_path_params();
        if !missing.is_empty() {
            return Err(DispatchError::MissingPathParams { names: missing });
        }

        let mut out = String::with_capacity(self.path.len());
        let mut rest = self.path.as_str();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let name = &rest[start + 1..start + len];
            out.push_str(&rest[..start]);
            match self.path_params.get(name) {
                Some(value) => out.push_str(&urlencoding::encode(value)),
                None => out.push_str(&rest[start..=start + len]),
            }
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Full URL without the query string.
    pub fn url(&self, base_url: &str) -> Result<String, DispatchError> {
        let base = base_url.strip_suffix('/').unwrap_or(base_url);
        Ok(format!("{base}{}", self.render_path()?))
    }

    /// Build a transport-ready request.
    ///
    /// Per-request headers go first, then `Content-Type` for a body, then
    /// `defaults`, which overwrite anything with the same name.
    pub fn build(
        &self,
        client: &Client,
        base_url: &str,
        defaults: &DefaultHeaders,
    ) -> Result<Request, DispatchError> {
        let url = self.url(base_url)?;
        let method = Method::from_bytes(self.method.to_uppercase().as_bytes()).map_err(|_| {
            DispatchError::UnsupportedMethod {
                method: self.method.clone(),
            }
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            insert_header(&mut headers, name, value)?;
        }
        if self.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in &defaults.snapshot() {
            insert_header(&mut headers, name, value)?;
        }

        let mut req = client.request(method, &url).headers(headers);
        if !self.query.is_empty() {
            req = req.query(&self.query);
        }
        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        tracing::debug!(method = %self.method, %url, "built request");
        req.build().map_err(DispatchError::RequestBuild)
    }
}

fn insert_header(map: &mut HeaderMap, name: &str, value: &str) -> Result<(), DispatchError> {
    let invalid = || DispatchError::InvalidHeader {
        name: name.to_string(),
    };
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    map.insert(name, value);
    Ok(())
}

/// `{name}` placeholders in a path template, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        if !name.is_empty() {
            names.push(name);
        }
        rest = &rest[start + len + 1..];
    }
    names
}
