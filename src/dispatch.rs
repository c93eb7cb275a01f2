//! ArgMatches → HTTP round trip
//!
//! Resolves every planned parameter from the parsed matches (falling back to
//! environment, config and declared default), executes the request and routes
//! the response to the JSON/raw renderer or the SSE decoder.

use std::io::{BufReader, Read, Write};
use std::time::Duration;

use clap::parser::ValueSource;
use clap::ArgMatches;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::body::load_body;
use crate::config::Config;
use crate::error::DispatchError;
use crate::output::render_response;
use crate::plan::{OpPlan, ParamPlan, BODY_FLAG};
use crate::request::{ApiRequest, DefaultHeaders};
use crate::spec::ParamLocation;
use crate::sse::{is_event_stream, SseDecoder};

/// Everything needed to execute requests against one API.
#[derive(Debug, Clone)]
pub struct Runtime {
    client: Client,
    base_url: String,
    headers: DefaultHeaders,
    sse: SseDecoder,
}

impl Runtime {
    /// Create a runtime with its own HTTP client. `timeout` bounds each request.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, DispatchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(DispatchError::ClientBuild)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            headers: DefaultHeaders::new(),
            sse: SseDecoder::default(),
        }
    }

    pub fn with_sse_decoder(mut self, sse: SseDecoder) -> Self {
        self.sse = sse;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers sent with every request.
    pub fn headers(&self) -> &DefaultHeaders {
        &self.headers
    }

    /// Execute one request and render the response to `out`.
    pub fn execute(&self, request: &ApiRequest, out: &mut impl Write) -> Result<(), DispatchError> {
        let req = request.build(&self.client, &self.base_url, &self.headers)?;
        let mut resp = self.client.execute(req).map_err(DispatchError::RequestFailed)?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        tracing::debug!(status, content_type = %content_type, "received response");

        if resp.status().is_success() && is_event_stream(&content_type) {
            let events = self.sse.decode(BufReader::new(resp), out)?;
            tracing::debug!(events, "event stream ended");
            return Ok(());
        }

        let mut body = Vec::new();
        resp.read_to_end(&mut body)
            .map_err(DispatchError::ResponseRead)?;
        render_response(status, &body, out)
    }
}

/// Execute the operation selected on the command line.
pub fn dispatch(
    runtime: &Runtime,
    op: &OpPlan,
    matches: &ArgMatches,
    config: &Config,
    out: &mut impl Write,
) -> Result<(), DispatchError> {
    let request = request_from_matches(op, matches, config)?;
    runtime.execute(&request, out)
}

/// Assemble the request for `op` from its leaf command matches.
///
/// Each parameter takes the command-line value if one was typed, otherwise
/// its environment variable, config key or declared default. Missing path
/// values are reported together when the request is built.
pub fn request_from_matches(op: &OpPlan, matches: &ArgMatches, config: &Config) -> Result<ApiRequest, DispatchError> {
    let mut request = ApiRequest::new(op.method.clone(), op.path.clone());

    for param in op.params() {
        match resolve_value(param, matches, config) {
            Some(value) => request.set(param.location, &param.name, value),
            None if param.required && param.location != ParamLocation::Path => {
                return Err(DispatchError::MissingRequired {
                    flag: param.flag_name.clone(),
                })
            }
            None => {}
        }
    }

    if op.has_json_body {
        let data = command_line_value(matches, BODY_FLAG);
        match data.as_deref().map(load_body).transpose()?.flatten() {
            Some(body) => request.body = Some(body),
            None if op.body_required => return Err(DispatchError::BodyRequired),
            None => {}
        }
    }

    Ok(request)
}

fn resolve_value(param: &ParamPlan, matches: &ArgMatches, config: &Config) -> Option<String> {
    command_line_value(matches, &param.flag_name).or_else(|| {
        let default = param.default_text();
        config.resolve(
            param.env_var.as_deref(),
            param.config_key.as_deref(),
            default.as_deref(),
        )
    })
}

/// Value typed on the command line; repeated values are joined with commas.
fn command_line_value(matches: &ArgMatches, id: &str) -> Option<String> {
    if matches.value_source(id) != Some(ValueSource::CommandLine) {
        return None;
    }
    let values: Vec<String> = matches
        .try_get_raw(id)
        .ok()
        .flatten()?
        .map(|v| v.to_string_lossy().into_owned())
        .collect();
    Some(values.join(","))
}
