//! Operations → command plan
//!
//! The plan is the resolved, deterministic shape of the CLI: one group per
//! tag, one command per operation, each parameter assigned to a positional
//! argument or a flag. It is built once and only read afterwards.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

use crate::error::PlanError;
use crate::naming::derive_group_name;
use crate::overrides::{
    is_positional, resolve_aliases, resolve_command_path, resolve_config_key, resolve_env_var,
    resolve_flag_name, resolve_hidden, resolve_shorthand,
};
use crate::spec::{Operation, Param, ParamLocation, ParamType};

/// Flag carrying the request body.
pub const BODY_FLAG: &str = "data";

/// Flags owned by clap itself, unavailable to parameters.
pub const RESERVED_FLAGS: &[&str] = &["help"];

/// Global runtime flags. A parameter resolving to one of these is renamed to
/// `<location>-<name>` (e.g. `query-timeout`).
pub const RUNTIME_FLAGS: &[&str] = &["base-url", "timeout"];

/// Full command plan for a generated CLI.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct Plan {
    pub app_name: String,
    pub module_name: String,
    /// Sorted by name
    pub groups: Vec<GroupPlan>,
}

/// A command group (one per tag).
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct GroupPlan {
    pub name: String,
    pub description: String,
    /// In input order
    pub operations: Vec<OpPlan>,
}

/// A single command.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct OpPlan {
    /// e.g. `["tasks", "create"]`
    pub command_path: Vec<String>,
    pub method: String,
    pub path: String,
    pub operation_id: String,
    pub summary: String,
    pub description: String,
    pub positionals: Vec<ParamPlan>,
    pub flags: Vec<ParamPlan>,
    pub has_json_body: bool,
    pub body_required: bool,
    pub is_event_stream: bool,
    pub hidden: bool,
    pub aliases: Vec<String>,
}

impl OpPlan {
    /// Command path joined with spaces.
    pub fn command_line(&self) -> String {
        self.command_path.join(" ")
    }

    /// Positionals followed by flags.
    pub fn params(&self) -> impl Iterator<Item = &ParamPlan> {
        self.positionals.iter().chain(self.flags.iter())
    }
}

/// A resolved parameter.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct ParamPlan {
    /// Name in the API description
    pub name: String,
    pub flag_name: String,
    pub shorthand: Option<String>,
    pub param_type: ParamType,
    pub format: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub description: String,
    pub env_var: Option<String>,
    pub config_key: Option<String>,
    pub location: ParamLocation,
}

impl ParamPlan {
    /// Default value rendered the way it would be typed on the command line.
    pub fn default_text(&self) -> Option<String> {
        self.default.as_ref().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Build a plan from the normalized operation list.
pub fn build_plan(
    ops: &[Operation],
    app_name: &str,
    module_name: &str,
) -> Result<Plan, PlanError> {
    let mut grouped: BTreeMap<String, Vec<&Operation>> = BTreeMap::new();
    for op in ops {
        grouped.entry(derive_group_name(&op.tag)).or_default().push(op);
    }

    let mut groups = Vec::with_capacity(grouped.len());
    for (name, group_ops) in grouped {
        let operations = group_ops
            .into_iter()
            .map(build_op_plan)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(group = %name, commands = operations.len(), "planned group");
        groups.push(GroupPlan {
            description: format!("Manage {name}"),
            name,
            operations,
        });
    }

    let plan = Plan {
        app_name: app_name.to_string(),
        module_name: module_name.to_string(),
        groups,
    };
    check_unique_commands(&plan)?;
    Ok(plan)
}

fn build_op_plan(op: &Operation) -> Result<OpPlan, PlanError> {
    let (path_params, other_params): (Vec<&Param>, Vec<&Param>) = op
        .params
        .iter()
        .partition(|p| p.location == ParamLocation::Path);

    let mut positionals = Vec::new();
    let mut flags = Vec::new();
    for param in path_params {
        if is_positional(param) {
            positionals.push(param);
        } else {
            flags.push(build_param_plan(op, param));
        }
    }

    // Positionals follow placeholder order in the template
    positionals.sort_by_key(|p| {
        op.path
            .find(&format!("{{{}}}", p.name))
            .unwrap_or(usize::MAX)
    });
    let positionals = positionals
        .into_iter()
        .map(|p| build_param_plan(op, p))
        .collect();
    flags.extend(other_params.into_iter().map(|p| build_param_plan(op, p)));

    let plan = OpPlan {
        command_path: resolve_command_path(op),
        method: op.method.clone(),
        path: op.path.clone(),
        operation_id: op.operation_id.clone(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        positionals,
        flags,
        has_json_body: op.has_json_body(),
        body_required: op.request_body.as_ref().is_some_and(|b| b.required),
        is_event_stream: op.has_event_stream(),
        hidden: resolve_hidden(op),
        aliases: resolve_aliases(op),
    };
    check_arguments(&plan)?;
    Ok(plan)
}

fn build_param_plan(op: &Operation, param: &Param) -> ParamPlan {
    let mut flag_name = resolve_flag_name(param);
    if RUNTIME_FLAGS.contains(&flag_name.as_str()) {
        let renamed = format!("{}-{flag_name}", param.location.as_str());
        tracing::warn!(
            operation = %op.operation_id,
            param = %param.name,
            flag = %renamed,
            "parameter shadows a global flag, renamed"
        );
        flag_name = renamed;
    }

    ParamPlan {
        name: param.name.clone(),
        flag_name,
        shorthand: resolve_shorthand(param),
        param_type: param.param_type,
        format: param.format.clone(),
        required: param.required,
        default: param.default.clone(),
        min: param.min,
        max: param.max,
        description: param.description.clone(),
        env_var: resolve_env_var(param),
        config_key: resolve_config_key(param),
        location: param.location,
    }
}

/// Reject argument collisions inside one command.
fn check_arguments(op: &OpPlan) -> Result<(), PlanError> {
    let mut names: HashSet<&str> = RESERVED_FLAGS.iter().copied().collect();
    if op.has_json_body {
        names.insert(BODY_FLAG);
    }
    let mut shorthands: HashMap<char, &str> = HashMap::from([('h', "help")]);

    for param in op.flags.iter() {
        if !is_valid_flag_name(&param.flag_name) {
            return Err(PlanError::InvalidFlagName {
                command: op.command_line(),
                flag: param.flag_name.clone(),
            });
        }
    }

    for param in op.params() {
        if !names.insert(param.flag_name.as_str()) {
            return Err(PlanError::DuplicateArgument {
                command: op.command_line(),
                name: param.flag_name.clone(),
            });
        }

        let Some(shorthand) = &param.shorthand else {
            continue;
        };
        let mut chars = shorthand.chars();
        let c = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(PlanError::InvalidShorthand {
                    command: op.command_line(),
                    flag: param.flag_name.clone(),
                    shorthand: shorthand.clone(),
                })
            }
        };
        if let Some(first) = shorthands.insert(c, param.flag_name.as_str()) {
            return Err(PlanError::DuplicateShorthand {
                command: op.command_line(),
                shorthand: c,
                first: first.to_string(),
                second: param.flag_name.clone(),
            });
        }
    }

    Ok(())
}

/// A flag name clap accepts as `--<name>`.
fn is_valid_flag_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('-') && !name.contains(|c: char| c.is_whitespace() || c == '=')
}

fn check_unique_commands(plan: &Plan) -> Result<(), PlanError> {
    let mut seen: HashMap<&[String], &str> = HashMap::new();
    // Every subcommand name under a parent path, intermediate nodes included
    let mut names: HashMap<&[String], HashSet<&str>> = HashMap::new();
    for op in plan.operations() {
        if let Some(first) = seen.insert(op.command_path.as_slice(), op.operation_id.as_str()) {
            return Err(PlanError::DuplicateCommand {
                command: op.command_line(),
                first: first.to_string(),
                second: op.operation_id.clone(),
            });
        }
        for (depth, segment) in op.command_path.iter().enumerate() {
            names
                .entry(&op.command_path[..depth])
                .or_default()
                .insert(segment.as_str());
        }
    }

    let mut aliases: HashMap<(&[String], &str), String> = HashMap::new();
    for op in plan.operations() {
        let Some((_, parent)) = op.command_path.split_last() else {
            continue;
        };
        for alias in &op.aliases {
            let sibling = names
                .get(parent)
                .is_some_and(|siblings| siblings.contains(alias.as_str()));
            let other = if sibling {
                Some(join_path(parent, alias))
            } else {
                aliases
                    .insert((parent, alias.as_str()), op.command_line())
                    .map(|owner| format!("an alias of `{owner}`"))
            };
            if let Some(other) = other {
                return Err(PlanError::DuplicateAlias {
                    command: op.command_line(),
                    alias: alias.clone(),
                    other,
                });
            }
        }
    }
    Ok(())
}

fn join_path(parent: &[String], name: &str) -> String {
    parent
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(name))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Plan {
    /// All operations, group by group.
    pub fn operations(&self) -> impl Iterator<Item = &OpPlan> {
        self.groups.iter().flat_map(|g| g.operations.iter())
    }

    /// Look up an operation by its resolved command path.
    pub fn find(&self, command_path: &[&str]) -> Option<&OpPlan> {
        self.operations().find(|op| {
            op.command_path.len() == command_path.len()
                && op
                    .command_path
                    .iter()
                    .zip(command_path)
                    .all(|(a, b)| a == b)
        })
    }

    /// Human-readable listing of the plan (used by `plan --format text`).
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Command Plan for {} ===", self.app_name);
        let _ = writeln!(out);
        let _ = writeln!(out, "Module: {}", self.module_name);
        let _ = writeln!(out);

        for group in &self.groups {
            let _ = writeln!(out, "Group: {}", group.name);
            for op in &group.operations {
                let positionals: String = op
                    .positionals
                    .iter()
                    .map(|p| format!(" <{}>", p.name))
                    .collect();
                let stream = if op.is_event_stream { " [SSE]" } else { "" };
                let hidden = if op.hidden { " (hidden)" } else { "" };
                let _ = writeln!(out, "  {}{positionals}{stream}{hidden}", op.command_line());

                if !op.flags.is_empty() {
                    let flags: Vec<String> = op
                        .flags
                        .iter()
                        .map(|f| {
                            let req = if f.required { "*" } else { "" };
                            format!("--{}{req}", f.flag_name)
                        })
                        .collect();
                    let _ = writeln!(out, "    Flags: {}", flags.join(", "));
                }
                let _ = writeln!(out, "    {} {}", op.method, op.path);
            }
            let _ = writeln!(out);
        }

        out
    }
}
