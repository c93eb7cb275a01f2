//! `x-cli` override resolution
//!
//! Each function starts from the derived default and lets a set override field
//! replace it. Unset fields leave the default untouched.

use crate::naming::{derive_command_name, derive_flag_name, derive_group_name, parse_command_path};
use crate::spec::{Operation, Param, ParamLocation, PositionalOverride};

/// Resolve the full command path of an operation.
///
/// `x-cli.name` replaces the derived `[group, command]` pair; `x-cli.group`
/// then replaces the first segment.
pub fn resolve_command_path(op: &Operation) -> Vec<String> {
    let cli = op.cli.as_ref();

    let mut path = cli
        .and_then(|c| non_empty(c.name.as_deref()))
        .map(parse_command_path)
        .filter(|segments| !segments.is_empty())
        .unwrap_or_else(|| {
            vec![
                derive_group_name(&op.tag),
                derive_command_name(&op.operation_id),
            ]
        });

    if let Some(group) = cli.and_then(|c| non_empty(c.group.as_deref())) {
        path[0] = derive_group_name(group);
    }

    path
}

pub fn resolve_hidden(op: &Operation) -> bool {
    op.cli.as_ref().is_some_and(|c| c.hidden)
}

pub fn resolve_aliases(op: &Operation) -> Vec<String> {
    op.cli
        .as_ref()
        .map(|c| c.aliases.clone())
        .unwrap_or_default()
}

/// Flag name: `x-cli.flag` or the derived name.
pub fn resolve_flag_name(param: &Param) -> String {
    param
        .cli
        .as_ref()
        .and_then(|c| non_empty(c.flag.as_deref()))
        .map(str::to_string)
        .unwrap_or_else(|| derive_flag_name(&param.name, param.location))
}

pub fn resolve_shorthand(param: &Param) -> Option<String> {
    param
        .cli
        .as_ref()
        .and_then(|c| non_empty(c.shorthand.as_deref()))
        .map(str::to_string)
}

pub fn resolve_env_var(param: &Param) -> Option<String> {
    param
        .cli
        .as_ref()
        .and_then(|c| non_empty(c.env.as_deref()))
        .map(str::to_string)
}

pub fn resolve_config_key(param: &Param) -> Option<String> {
    param
        .cli
        .as_ref()
        .and_then(|c| non_empty(c.config_key.as_deref()))
        .map(str::to_string)
}

/// A parameter is positional only when it sits in the path and is not forced to a flag.
pub fn is_positional(param: &Param) -> bool {
    if param.location != ParamLocation::Path {
        return false;
    }
    let forced = param
        .cli
        .as_ref()
        .map(|c| c.positional)
        .unwrap_or_default();
    forced != PositionalOverride::Flag
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{OperationOverrides, ParamOverrides};

    fn op_with(cli: OperationOverrides) -> Operation {
        Operation::new("GET", "/tasks/{taskId}/activities", "listTaskActivities", "Tasks")
            .with_overrides(cli)
    }

    // -- command path --

    #[test]
    fn command_path_defaults_to_group_and_verb() {
        let op = Operation::new("GET", "/tasks", "listTasks", "Tasks");
        assert_eq!(resolve_command_path(&op), ["tasks", "list"]);
    }

    #[test]
    fn command_path_untagged_uses_default_group() {
        let op = Operation::new("GET", "/ping", "pingServer", "");
        assert_eq!(resolve_command_path(&op), ["default", "ping"]);
    }

    #[test]
    fn command_path_name_override_replaces_both_segments() {
        let op = op_with(OperationOverrides {
            name: Some("tasks activities".into()),
            ..Default::default()
        });
        assert_eq!(resolve_command_path(&op), ["tasks", "activities"]);
    }

    #[test]
    fn command_path_name_override_may_be_deeper() {
        let op = op_with(OperationOverrides {
            name: Some("tasks activity list".into()),
            ..Default::default()
        });
        assert_eq!(resolve_command_path(&op), ["tasks", "activity", "list"]);
    }

    #[test]
    fn command_path_group_override_replaces_first_segment() {
        let op = op_with(OperationOverrides {
            group: Some("Audit Log".into()),
            ..Default::default()
        });
        assert_eq!(resolve_command_path(&op), ["audit-log", "list"]);
    }

    #[test]
    fn command_path_group_override_applies_after_name_override() {
        let op = op_with(OperationOverrides {
            name: Some("tasks activities".into()),
            group: Some("history".into()),
            ..Default::default()
        });
        assert_eq!(resolve_command_path(&op), ["history", "activities"]);
    }

    #[test]
    fn command_path_blank_name_override_is_unset() {
        let op = op_with(OperationOverrides {
            name: Some("  ".into()),
            ..Default::default()
        });
        assert_eq!(resolve_command_path(&op), ["tasks", "list"]);
    }

    #[test]
    fn hidden_and_aliases_are_attached_verbatim() {
        let op = op_with(OperationOverrides {
            aliases: vec!["act".into(), "a".into()],
            hidden: true,
            ..Default::default()
        });
        assert!(resolve_hidden(&op));
        assert_eq!(resolve_aliases(&op), ["act", "a"]);

        let plain = Operation::new("GET", "/", "getRoot", "");
        assert!(!resolve_hidden(&plain));
        assert!(resolve_aliases(&plain).is_empty());
    }

    // -- parameters --

    #[test]
    fn flag_name_override_wins_over_derived() {
        let param = Param::new("X-Org-Id", ParamLocation::Header).with_overrides(ParamOverrides {
            flag: Some("org".into()),
            ..Default::default()
        });
        assert_eq!(resolve_flag_name(&param), "org");

        let derived = Param::new("X-Org-Id", ParamLocation::Header);
        assert_eq!(resolve_flag_name(&derived), "org-id");
    }

    #[test]
    fn env_config_and_shorthand_are_attached_verbatim() {
        let param = Param::new("orgId", ParamLocation::Query).with_overrides(ParamOverrides {
            shorthand: Some("o".into()),
            env: Some("ORG_ID".into()),
            config_key: Some("org_id".into()),
            ..Default::default()
        });
        assert_eq!(resolve_shorthand(&param).as_deref(), Some("o"));
        assert_eq!(resolve_env_var(&param).as_deref(), Some("ORG_ID"));
        assert_eq!(resolve_config_key(&param).as_deref(), Some("org_id"));
    }

    #[test]
    fn path_param_is_positional_by_default() {
        assert!(is_positional(&Param::new("taskId", ParamLocation::Path)));
    }

    #[test]
    fn path_param_forced_to_flag_is_not_positional() {
        let param = Param::new("orgId", ParamLocation::Path).with_overrides(ParamOverrides {
            flag: Some("org".into()),
            positional: PositionalOverride::Flag,
            ..Default::default()
        });
        assert!(!is_positional(&param));
    }

    #[test]
    fn query_param_forced_positional_stays_a_flag() {
        let param = Param::new("page", ParamLocation::Query).with_overrides(ParamOverrides {
            positional: PositionalOverride::Positional,
            ..Default::default()
        });
        assert!(!is_positional(&param));
    }
}
