//! OpenAPI spec → normalized operation list
//!
//! Reads an OpenAPI 3.x document and flattens it into `Operation`s, including
//! the `x-cli` vendor annotations that the plan builder resolves later.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SpecError;

/// Vendor extension key carrying CLI overrides.
pub const CLI_EXTENSION: &str = "x-cli";

const METHODS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options", "trace"];

/// A loaded API description.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct ApiSpec {
    pub title: String,
    pub version: String,
    pub description: String,
    /// First `servers[].url`, if any
    pub server_url: Option<String>,
    pub operations: Vec<Operation>,
}

/// A single API operation.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct Operation {
    /// First tag (empty when untagged)
    pub tag: String,
    /// HTTP method, uppercase
    pub method: String,
    /// URL path template (e.g. "/tasks/{taskId}")
    pub path: String,
    pub operation_id: String,
    pub summary: String,
    pub description: String,
    pub params: Vec<Param>,
    pub request_body: Option<RequestBody>,
    pub responses: Vec<Response>,
    pub cli: Option<OperationOverrides>,
}

impl Operation {
    pub fn new(method: &str, path: &str, operation_id: &str, tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            method: method.to_uppercase(),
            path: path.to_string(),
            operation_id: operation_id.to_string(),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_request_body(mut self, body: RequestBody) -> Self {
        self.request_body = Some(body);
        self
    }

    pub fn with_response(mut self, response: Response) -> Self {
        self.responses.push(response);
        self
    }

    pub fn with_overrides(mut self, cli: OperationOverrides) -> Self {
        self.cli = Some(cli);
        self
    }

    /// True when the request body accepts `application/json`.
    pub fn has_json_body(&self) -> bool {
        self.request_body.as_ref().is_some_and(|body| {
            body.content_types
                .iter()
                .any(|ct| ct.contains("application/json"))
        })
    }

    /// True when any response is declared as `text/event-stream`.
    pub fn has_event_stream(&self) -> bool {
        self.responses.iter().any(|resp| {
            resp.content_types
                .iter()
                .any(|ct| ct.contains("text/event-stream"))
        })
    }
}

/// Where a parameter travels in the HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
}

impl ParamLocation {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive schema type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
}

impl ParamType {
    fn from_schema(schema: &Value) -> Self {
        let ty = match schema.get("type") {
            Some(Value::String(s)) => Some(s.as_str()),
            // OpenAPI 3.1 allows ["integer", "null"]
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null"),
            _ => None,
        };
        match ty {
            Some("integer") => Self::Integer,
            Some("number") => Self::Number,
            Some("boolean") => Self::Boolean,
            Some("array") => Self::Array,
            _ => Self::String,
        }
    }
}

/// A single API parameter.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Param {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub param_type: ParamType,
    pub format: Option<String>,
    pub default: Option<Value>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub description: String,
    pub cli: Option<ParamOverrides>,
}

impl Param {
    pub fn new(name: &str, location: ParamLocation) -> Self {
        Self {
            name: name.to_string(),
            location,
            required: location == ParamLocation::Path,
            param_type: ParamType::String,
            format: None,
            default: None,
            min: None,
            max: None,
            description: String::new(),
            cli: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn param_type(mut self, param_type: ParamType) -> Self {
        self.param_type = param_type;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_overrides(mut self, cli: ParamOverrides) -> Self {
        self.cli = Some(cli);
        self
    }
}

/// Request body descriptor.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct RequestBody {
    pub required: bool,
    /// Sorted content types
    pub content_types: Vec<String>,
    pub description: String,
}

impl RequestBody {
    pub fn new(content_types: &[&str], required: bool) -> Self {
        Self {
            required,
            content_types: content_types.iter().map(|ct| ct.to_string()).collect(),
            description: String::new(),
        }
    }
}

/// One declared response.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct Response {
    pub status_code: String,
    /// Sorted content types
    pub content_types: Vec<String>,
    pub description: String,
}

impl Response {
    pub fn new(status_code: &str, content_types: &[&str]) -> Self {
        Self {
            status_code: status_code.to_string(),
            content_types: content_types.iter().map(|ct| ct.to_string()).collect(),
            description: String::new(),
        }
    }
}

/// `x-cli` overrides on an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationOverrides {
    /// Full command path, space-delimited ("tasks activities")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub hidden: bool,
}

/// `x-cli` overrides on a parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shorthand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(rename = "config", skip_serializing_if = "Option::is_none")]
    pub config_key: Option<String>,
    pub positional: PositionalOverride,
}

/// Explicit positional/flag forcing of a parameter.
///
/// Deserialized from the optional boolean `positional`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum PositionalOverride {
    #[default]
    Unset,
    Positional,
    Flag,
}

impl From<Option<bool>> for PositionalOverride {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Self::Unset,
            Some(true) => Self::Positional,
            Some(false) => Self::Flag,
        }
    }
}

impl From<PositionalOverride> for Option<bool> {
    fn from(value: PositionalOverride) -> Self {
        match value {
            PositionalOverride::Unset => None,
            PositionalOverride::Positional => Some(true),
            PositionalOverride::Flag => Some(false),
        }
    }
}

/// Read an OpenAPI document from a YAML or JSON file.
pub fn load_spec(path: impl AsRef<Path>) -> Result<ApiSpec, SpecError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SpecError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let doc: Value = if is_yaml {
        serde_yaml::from_str(&content).map_err(|source| SpecError::Yaml {
            path: path.display().to_string(),
            source,
        })?
    } else {
        serde_json::from_str(&content).map_err(|source| SpecError::Json {
            path: path.display().to_string(),
            source,
        })?
    };

    parse_spec(&doc)
}

/// Normalize an already parsed OpenAPI document.
pub fn parse_spec(doc: &Value) -> Result<ApiSpec, SpecError> {
    let info = doc.get("info");
    let info_str = |key: &str| {
        info.and_then(|i| i.get(key))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };

    let server_url = doc
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
        .and_then(|s| s.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ApiSpec {
        title: info_str("title"),
        version: info_str("version"),
        description: info_str("description"),
        server_url,
        operations: extract_operations(doc)?,
    })
}

/// Extract all operations, ordered by path then method.
pub fn extract_operations(doc: &Value) -> Result<Vec<Operation>, SpecError> {
    let mut ops = Vec::new();

    let paths = match doc.get("paths").and_then(Value::as_object) {
        Some(p) => p,
        None => return Ok(ops),
    };

    let mut path_keys: Vec<&String> = paths.keys().collect();
    path_keys.sort();

    for path in path_keys {
        let path_item = resolve_ref(doc, &paths[path.as_str()]);
        let path_level_params = path_item.get("parameters");

        for method in METHODS {
            let operation = match path_item.get(*method) {
                Some(op) => op,
                None => continue,
            };

            if let Some(op) =
                extract_single_operation(doc, path, method, operation, path_level_params)?
            {
                ops.push(op);
            }
        }
    }

    Ok(ops)
}

fn extract_single_operation(
    doc: &Value,
    path: &str,
    method: &str,
    operation: &Value,
    path_level_params: Option<&Value>,
) -> Result<Option<Operation>, SpecError> {
    let operation_id = operation
        .get("operationId")
        .and_then(Value::as_str)
        .unwrap_or("");

    if operation_id.is_empty() {
        tracing::warn!(%path, %method, "skipping operation without operationId");
        return Ok(None);
    }

    let text = |key: &str| {
        operation
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };

    let tag = operation
        .get("tags")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let cli = match operation.get(CLI_EXTENSION) {
        Some(ext) => Some(parse_overrides::<OperationOverrides>(ext, || {
            format!("operation {operation_id}")
        })?),
        None => None,
    };

    let params = collect_params(
        doc,
        operation_id,
        path_level_params,
        operation.get("parameters"),
    )?;

    Ok(Some(Operation {
        tag,
        method: method.to_uppercase(),
        path: path.to_string(),
        operation_id: operation_id.to_string(),
        summary: text("summary"),
        description: text("description"),
        params,
        request_body: extract_body(doc, operation),
        responses: extract_responses(doc, operation),
        cli,
    }))
}

/// Merge path-level + operation-level parameters.
///
/// Operation-level entries replace path-level ones with the same name and
/// location, keeping the position of the first occurrence.
fn collect_params(
    doc: &Value,
    operation_id: &str,
    path_level: Option<&Value>,
    operation_level: Option<&Value>,
) -> Result<Vec<Param>, SpecError> {
    let mut params: Vec<Param> = Vec::new();

    for source in [path_level, operation_level].into_iter().flatten() {
        let Some(entries) = source.as_array() else {
            continue;
        };
        for entry in entries {
            let Some(param) = parse_param(doc, operation_id, resolve_ref(doc, entry))? else {
                continue;
            };
            match params
                .iter_mut()
                .find(|p| p.name == param.name && p.location == param.location)
            {
                Some(existing) => *existing = param,
                None => params.push(param),
            }
        }
    }

    Ok(params)
}

fn parse_param(
    doc: &Value,
    operation_id: &str,
    param: &Value,
) -> Result<Option<Param>, SpecError> {
    let Some(name) = param.get("name").and_then(Value::as_str) else {
        return Ok(None);
    };
    let location = match param
        .get("in")
        .and_then(Value::as_str)
        .and_then(ParamLocation::parse)
    {
        Some(loc) => loc,
        None => {
            tracing::debug!(%operation_id, %name, "ignoring parameter with unsupported location");
            return Ok(None);
        }
    };

    let schema = param
        .get("schema")
        .map(|s| resolve_ref(doc, s))
        .cloned()
        .unwrap_or_else(|| serde_json::json!({"type": "string"}));

    let cli = match param.get(CLI_EXTENSION) {
        Some(ext) => Some(parse_overrides::<ParamOverrides>(ext, || {
            format!("parameter {name} of operation {operation_id}")
        })?),
        None => None,
    };

    Ok(Some(Param {
        name: name.to_string(),
        location,
        required: param
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(location == ParamLocation::Path),
        param_type: ParamType::from_schema(&schema),
        format: schema
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_string),
        default: schema.get("default").cloned(),
        min: schema.get("minimum").and_then(Value::as_f64),
        max: schema.get("maximum").and_then(Value::as_f64),
        description: param
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        cli,
    }))
}

fn extract_body(doc: &Value, operation: &Value) -> Option<RequestBody> {
    let body = resolve_ref(doc, operation.get("requestBody")?);
    Some(RequestBody {
        required: body
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        content_types: content_types(body),
        description: body
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
    })
}

fn extract_responses(doc: &Value, operation: &Value) -> Vec<Response> {
    let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut codes: Vec<&String> = responses.keys().collect();
    codes.sort();

    codes
        .into_iter()
        .map(|code| {
            let resp = resolve_ref(doc, &responses[code.as_str()]);
            Response {
                status_code: code.clone(),
                content_types: content_types(resp),
                description: resp
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            }
        })
        .collect()
}

fn content_types(value: &Value) -> Vec<String> {
    let mut types: Vec<String> = value
        .get("content")
        .and_then(Value::as_object)
        .map(|c| c.keys().cloned().collect())
        .unwrap_or_default();
    types.sort();
    types
}

fn parse_overrides<T: serde::de::DeserializeOwned>(
    ext: &Value,
    context: impl FnOnce() -> String,
) -> Result<T, SpecError> {
    serde_json::from_value(ext.clone()).map_err(|source| SpecError::InvalidOverride {
        context: context(),
        source,
    })
}

/// Follow a local `$ref` ("#/components/...") one level; other values pass through.
fn resolve_ref<'a>(doc: &'a Value, value: &'a Value) -> &'a Value {
    value
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|r| r.strip_prefix('#'))
        .and_then(|pointer| doc.pointer(pointer))
        .unwrap_or(value)
}
