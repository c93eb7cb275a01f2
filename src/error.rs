//! Error types for the openapi-cligen crate.

use thiserror::Error;

/// Errors raised while reading an API description.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpecError {
    #[error("failed to read spec: {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in spec: {path}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON in spec: {path}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid x-cli override on {context}")]
    InvalidOverride {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while resolving a command plan.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanError {
    #[error("shorthand -{shorthand} is used by both --{first} and --{second} in `{command}`")]
    DuplicateShorthand {
        command: String,
        shorthand: char,
        first: String,
        second: String,
    },

    #[error("shorthand {shorthand:?} on --{flag} in `{command}` must be a single character")]
    InvalidShorthand {
        command: String,
        flag: String,
        shorthand: String,
    },

    #[error("argument name {name:?} appears twice in `{command}`")]
    DuplicateArgument { command: String, name: String },

    #[error("flag name {flag:?} in `{command}` must be non-empty without a leading '-', whitespace or '='")]
    InvalidFlagName { command: String, flag: String },

    #[error("alias `{alias}` of `{command}` collides with `{other}`")]
    DuplicateAlias {
        command: String,
        alias: String,
        other: String,
    },

    #[error("operations {first} and {second} both resolve to `{command}` (set x-cli.name on one of them)")]
    DuplicateCommand {
        command: String,
        first: String,
        second: String,
    },
}

/// Errors that can occur while executing a planned command.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("missing required path parameter(s): {}", .names.join(", "))]
    MissingPathParams { names: Vec<String> },

    #[error("missing required value for --{flag}")]
    MissingRequired { flag: String },

    #[error("request body is required (use --data)")]
    BodyRequired,

    #[error("failed to read body from file: {path}")]
    BodyFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read body from stdin")]
    BodyStdinRead(#[source] std::io::Error),

    #[error("unsupported HTTP method: {method}")]
    UnsupportedMethod { method: String },

    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },

    #[error("failed to create HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("failed to build request")]
    RequestBuild(#[source] reqwest::Error),

    #[error("request failed")]
    RequestFailed(#[source] reqwest::Error),

    #[error("failed to read response body")]
    ResponseRead(#[source] std::io::Error),

    /// Non-2xx status. `body` is diagnostic context and stays out of the message.
    #[error("request failed with status {status}")]
    HttpStatus { status: u16, body: String },

    #[error("SSE event data exceeds maximum allowed size of {limit} bytes")]
    SseEventTooLarge { limit: usize },

    #[error("error reading SSE stream")]
    StreamRead(#[source] std::io::Error),

    #[error("failed to write output")]
    Output(#[source] std::io::Error),
}
