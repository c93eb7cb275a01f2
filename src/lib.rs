//! Derive a command-line interface from OpenAPI specs.
//!
//! Reads an OpenAPI document into a normalized operation list, resolves it
//! into a deterministic command [`Plan`], builds a clap `Command` tree from the
//! plan, and executes the selected command as one HTTP round trip.
//!
//! # Usage
//!
//! ```no_run
//! use openapi_cligen::{build_commands, build_plan, dispatch, find_operation, load_config, load_spec, CliConfig, Runtime};
//!
//! let spec = load_spec("petstore.yaml").unwrap();
//! let plan = build_plan(&spec.operations, "petstore", "example.com/petstore").unwrap();
//!
//! let config = load_config("petstore");
//! let cli = CliConfig::new("petstore", "Petstore CLI").default_base_url("https://api.example.com");
//! let matches = build_commands(&cli, &plan).get_matches();
//!
//! let (op, leaf) = find_operation(&plan, &matches).unwrap();
//! let runtime = Runtime::new("https://api.example.com", None).unwrap();
//! dispatch(&runtime, op, leaf, &config, &mut std::io::stdout()).unwrap();
//! ```

pub mod body;
pub mod builder;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod naming;
pub mod output;
pub mod overrides;
pub mod plan;
pub mod request;
pub mod spec;
pub mod sse;

pub use builder::{build_commands, find_operation, CliConfig};
pub use config::{load_config, Config};
pub use dispatch::{dispatch, request_from_matches, Runtime};
pub use error::{DispatchError, PlanError, SpecError};
pub use plan::{build_plan, GroupPlan, OpPlan, ParamPlan, Plan};
pub use request::{ApiRequest, DefaultHeaders};
pub use spec::{extract_operations, load_spec, ApiSpec, Operation, Param, ParamLocation, ParamType};
pub use sse::SseDecoder;

// Re-export dependencies for downstream crates
pub use clap;
pub use reqwest;
