use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use openapi_cligen::{
    build_commands, build_plan, dispatch, find_operation, load_config, load_spec, CliConfig,
    DispatchError, Plan, Runtime,
};

/// Build command-line tools from OpenAPI specifications
#[derive(Parser)]
#[command(name = "openapi-cligen", version)]
#[command(about = "Derive a CLI from an OpenAPI spec and run it", long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved command plan without contacting the API
    Plan {
        /// Path to the OpenAPI specification file (YAML or JSON)
        #[arg(long)]
        spec: PathBuf,

        /// Application name
        #[arg(long)]
        name: String,

        /// Module identifier recorded in the plan (defaults to the app name)
        #[arg(long)]
        module: Option<String>,

        #[arg(long, value_enum, default_value_t = PlanFormat::Text)]
        format: PlanFormat,
    },
    /// Run one generated command against the API
    ///
    /// Everything after `--` is parsed by the generated command tree, e.g.
    /// `openapi-cligen run --spec api.yaml --name tasks -- tasks list --page 2`.
    Run {
        /// Path to the OpenAPI specification file (YAML or JSON)
        #[arg(long)]
        spec: PathBuf,

        /// Application name; selects the config directory and `<NAME>_BASE_URL`
        #[arg(long)]
        name: String,

        /// API base URL (overrides config, environment and the spec's servers)
        #[arg(long)]
        base_url: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Arguments for the generated command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PlanFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(DispatchError::HttpStatus { body, .. }) = err.downcast_ref::<DispatchError>() {
                if !body.is_empty() {
                    eprintln!("{body}");
                }
            }
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Plan {
            spec,
            name,
            module,
            format,
        } => {
            let plan = load_plan(&spec, &name, module.as_deref())?;
            match format {
                PlanFormat::Text => print!("{}", plan.summary()),
                PlanFormat::Json => {
                    let json = serde_json::to_string_pretty(&plan).context("failed to serialize plan")?;
                    println!("{json}");
                }
            }
            Ok(())
        }
        Commands::Run {
            spec,
            name,
            base_url,
            timeout,
            args,
        } => run(&spec, &name, base_url, timeout, args),
    }
}

fn load_plan(spec_path: &Path, name: &str, module: Option<&str>) -> Result<Plan> {
    let spec = load_spec(spec_path).context("failed to load spec")?;
    tracing::info!(
        title = %spec.title,
        version = %spec.version,
        operations = spec.operations.len(),
        "loaded spec"
    );
    build_plan(&spec.operations, name, module.unwrap_or(name)).context("failed to build command plan")
}

fn run(spec_path: &Path, name: &str, base_url: Option<String>, timeout: Option<u64>, args: Vec<String>) -> Result<()> {
    let spec = load_spec(spec_path).context("failed to load spec")?;
    let plan = build_plan(&spec.operations, name, name).context("failed to build command plan")?;
    let config = load_config(name);

    let mut cli = CliConfig::new(name, spec.title.clone());
    if let Some(url) = base_url.or_else(|| config.base_url.clone()).or(spec.server_url) {
        cli = cli.default_base_url(url);
    }

    let argv = std::iter::once(name.to_string()).chain(args);
    let matches = match build_commands(&cli, &plan).try_get_matches_from(argv) {
        Ok(matches) => matches,
        Err(e) => e.exit(),
    };

    let (op, leaf) = find_operation(&plan, &matches).context("no operation matches the given command")?;
    let base_url = leaf
        .get_one::<String>("base-url")
        .cloned()
        .context("no base URL: pass --base-url, set it in the config file or declare servers in the spec")?;
    let timeout = leaf.get_one::<u64>("timeout").copied().or(timeout);

    let runtime = Runtime::new(base_url, timeout.map(Duration::from_secs)).context("failed to create HTTP client")?;
    runtime.headers().extend(config.headers.clone());

    tracing::debug!(command = %op.command_line(), operation = %op.operation_id, "dispatching");
    dispatch(&runtime, op, leaf, &config, &mut std::io::stdout().lock())
        .with_context(|| format!("{} failed", op.command_line()))
}
