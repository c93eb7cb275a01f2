//! Plan → clap Command tree builder
//!
//! Every `OpPlan` contributes one leaf under its command path. Intermediate
//! segments become grouping commands that require a subcommand.

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::plan::{OpPlan, ParamPlan, Plan, BODY_FLAG};
use crate::spec::ParamType;

/// Configuration for building a CLI from a plan.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CliConfig {
    /// Root command name (e.g. "petstore")
    pub name: String,
    /// Root command about/description
    pub about: String,
    /// Value of `--base-url` when the flag is not given
    pub default_base_url: Option<String>,
}

impl CliConfig {
    pub fn new(name: impl Into<String>, about: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: about.into(),
            default_base_url: None,
        }
    }

    pub fn default_base_url(mut self, url: impl Into<String>) -> Self {
        self.default_base_url = Some(url.into());
        self
    }
}

/// Build a clap `Command` tree from a plan.
///
/// Structure: `<name> <group> <command> [positionals] [--flags]`, or deeper
/// when an operation overrides its command path.
pub fn build_commands(config: &CliConfig, plan: &Plan) -> Command {
    let mut base_url = Arg::new("base-url")
        .long("base-url")
        .global(true)
        .value_name("URL")
        .help("API base URL");
    if let Some(url) = &config.default_base_url {
        base_url = base_url.default_value(url.clone());
    }

    let root = Command::new(config.name.clone())
        .about(config.about.clone())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(base_url)
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .global(true)
                .value_name("SECONDS")
                .value_parser(value_parser!(u64))
                .help("Request timeout in seconds"),
        );

    let mut tree = Node::default();
    for op in plan.operations() {
        tree.insert(&op.command_path, op);
    }

    tree.children
        .into_iter()
        .fold(root, |root, (name, node)| {
            let about = plan
                .groups
                .iter()
                .find(|g| g.name == name)
                .map(|g| g.description.clone())
                .unwrap_or_else(|| format!("Manage {name}"));
            root.subcommand(node.into_command(name, about))
        })
}

/// Find the operation selected by `matches`, along with the matches of its leaf command.
pub fn find_operation<'a, 'm>(plan: &'a Plan, matches: &'m ArgMatches) -> Option<(&'a OpPlan, &'m ArgMatches)> {
    let mut path = Vec::new();
    let mut current = matches;
    while let Some((name, sub)) = current.subcommand() {
        path.push(name);
        current = sub;
    }
    plan.find(&path).map(|op| (op, current))
}

/// Intermediate command tree keyed by path segment, in first-seen order.
#[derive(Default)]
struct Node<'a> {
    children: Vec<(String, Node<'a>)>,
    op: Option<&'a OpPlan>,
}

impl<'a> Node<'a> {
    fn insert(&mut self, path: &[String], op: &'a OpPlan) {
        let Some((first, rest)) = path.split_first() else {
            self.op = Some(op);
            return;
        };
        let idx = match self.children.iter().position(|(name, _)| name == first) {
            Some(idx) => idx,
            None => {
                self.children.push((first.clone(), Node::default()));
                self.children.len() - 1
            }
        };
        self.children[idx].1.insert(rest, op);
    }

    fn into_command(self, name: String, about: String) -> Command {
        let mut cmd = match self.op {
            Some(op) => build_operation_command(op, name),
            None => Command::new(name).about(about),
        };

        if !self.children.is_empty() {
            cmd = if self.op.is_some() {
                cmd.args_conflicts_with_subcommands(true)
            } else {
                cmd.subcommand_required(true).arg_required_else_help(true)
            };
        }

        for (child_name, child) in self.children {
            let about = format!("Manage {child_name}");
            cmd = cmd.subcommand(child.into_command(child_name, about));
        }
        cmd
    }
}

fn build_operation_command(op: &OpPlan, name: String) -> Command {
    let about = if op.summary.is_empty() {
        format!("{} {}", op.method, op.path)
    } else {
        op.summary.clone()
    };

    let mut cmd = Command::new(name)
        .about(about)
        .hide(op.hidden)
        .visible_aliases(op.aliases.clone());
    if !op.description.is_empty() {
        cmd = cmd.long_about(op.description.clone());
    }

    // clap rejects a required positional after an optional one
    let mut allow_required = true;
    for param in &op.positionals {
        let required = allow_required && must_be_given(param);
        allow_required = required;
        cmd = cmd.arg(positional_arg(param, required));
    }
    for param in &op.flags {
        cmd = cmd.arg(flag_arg(param));
    }

    if op.has_json_body {
        cmd = cmd.arg(
            Arg::new(BODY_FLAG)
                .long(BODY_FLAG)
                .value_name("JSON|@FILE|@-")
                .help("Request body: inline JSON, @file, or @- for stdin")
                .action(ArgAction::Set),
        );
    }

    cmd
}

fn positional_arg(param: &ParamPlan, required: bool) -> Arg {
    let arg = Arg::new(param.flag_name.clone())
        .value_name(param.name.clone())
        .help(param.description.clone())
        .required(required);
    typed(arg, param)
}

fn flag_arg(param: &ParamPlan) -> Arg {
    let mut arg = Arg::new(param.flag_name.clone())
        .long(param.flag_name.clone())
        .help(param.description.clone())
        .required(must_be_given(param));

    if let Some(c) = param.shorthand.as_deref().and_then(|s| s.chars().next()) {
        arg = arg.short(c);
    }
    if let Some(default) = param.default_text() {
        arg = arg.default_value(default);
    }

    match param.param_type {
        // `--flag` alone means true, `--flag=false` is explicit
        ParamType::Boolean => arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .value_parser(value_parser!(bool)),
        ParamType::Array => arg.action(ArgAction::Append),
        _ => typed(arg.action(ArgAction::Set), param),
    }
}

/// Only enforce presence at parse time when no other source can supply the value.
fn must_be_given(param: &ParamPlan) -> bool {
    param.required && param.env_var.is_none() && param.config_key.is_none() && param.default.is_none()
}

fn typed(arg: Arg, param: &ParamPlan) -> Arg {
    match param.param_type {
        ParamType::Integer => {
            let min = param.min.map(|v| v.ceil() as i64);
            let max = param.max.map(|v| v.floor() as i64);
            match (min, max) {
                (Some(lo), Some(hi)) => arg.value_parser(value_parser!(i64).range(lo..=hi)),
                (Some(lo), None) => arg.value_parser(value_parser!(i64).range(lo..)),
                (None, Some(hi)) => arg.value_parser(value_parser!(i64).range(..=hi)),
                (None, None) => arg.value_parser(value_parser!(i64)),
            }
        }
        ParamType::Number => {
            let (min, max) = (param.min, param.max);
            arg.value_parser(move |s: &str| -> Result<f64, String> {
                let v: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
                if min.is_some_and(|lo| v < lo) || max.is_some_and(|hi| v > hi) {
                    return Err(format!("{v} is outside the allowed range"));
                }
                Ok(v)
            })
        }
        ParamType::Boolean => arg.value_parser(value_parser!(bool)),
        ParamType::String | ParamType::Array => arg,
    }
}
